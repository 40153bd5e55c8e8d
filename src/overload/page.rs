//! Fallback page served on degrade responses.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Built-in page used when no custom page is configured or it cannot be read.
pub const DEFAULT_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Site not found</title>
<style>
body { font-family: sans-serif; margin: 0; background: #f4f5f7; color: #222; }
main { max-width: 36rem; margin: 12vh auto; padding: 2rem; background: #fff; border-radius: 6px; }
h1 { font-size: 1.4rem; margin-top: 0; }
li { margin: .3rem 0; }
</style>
</head>
<body>
<main>
<h1>The site you requested could not be found</h1>
<p>This edge server has no running tunnel for the requested host.</p>
<p>Common causes:</p>
<ul>
<li>The tunnel client for this host is not started.</li>
<li>The local port behind the tunnel is wrong or closed.</li>
<li>The host name or protocol of the mapping is misconfigured.</li>
</ul>
</main>
</body>
</html>
"#;

/// Degrade page content source.
///
/// A configured file is re-read on every use so it can be edited live.
#[derive(Debug, Clone, Default)]
pub struct FallbackPage {
    path: Option<PathBuf>,
}

impl FallbackPage {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current page bytes; read failures fall back to [`DEFAULT_PAGE`].
    pub async fn content(&self) -> Cow<'static, [u8]> {
        let Some(path) = &self.path else {
            return Cow::Borrowed(DEFAULT_PAGE.as_bytes());
        };

        match tokio::fs::read(path).await {
            Ok(bytes) => Cow::Owned(bytes),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Read custom 503 page failed, using built-in page");
                Cow::Borrowed(DEFAULT_PAGE.as_bytes())
            }
        }
    }
}
