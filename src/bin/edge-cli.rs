use std::collections::BTreeMap;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "edge-cli")]
#[command(about = "Management CLI for the ingress edge admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version and connection counts
    Status,
    /// Show the active sniffer rule set
    Rules,
    /// Replace the sniffer rule set, e.g. `set-rules http=true https=false`
    SetRules {
        #[arg(required = true, value_parser = parse_rule)]
        rules: Vec<(String, bool)>,
    },
    /// Show the overload counter and threshold
    Overload,
    /// Change the 503 threshold and restart the reset window
    SetThreshold { max_service_unavailable_count: u64 },
}

fn parse_rule(raw: &str) -> Result<(String, bool), String> {
    let (name, enabled) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=bool, got {raw:?}"))?;
    let enabled = enabled
        .parse::<bool>()
        .map_err(|_| format!("expected true or false for {name:?}, got {enabled:?}"))?;
    Ok((name.trim().to_ascii_lowercase(), enabled))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", cli.url)),
        Commands::Rules => client.get(format!("{}/admin/rules", cli.url)),
        Commands::SetRules { rules } => {
            let body: BTreeMap<String, bool> = rules.into_iter().collect();
            client.put(format!("{}/admin/rules", cli.url)).json(&body)
        }
        Commands::Overload => client.get(format!("{}/admin/overload", cli.url)),
        Commands::SetThreshold {
            max_service_unavailable_count,
        } => client
            .put(format!("{}/admin/overload", cli.url))
            .json(&json!({ "max_service_unavailable_count": max_service_unavailable_count })),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
