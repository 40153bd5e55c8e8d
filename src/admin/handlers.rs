use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::overload::OverloadSnapshot;
use crate::sniff::RuleSet;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub active_connections: u64,
    pub total_connections: u64,
}

#[derive(Debug, Deserialize)]
pub struct ThresholdUpdate {
    pub max_service_unavailable_count: u64,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        active_connections: state.tracker.active_count(),
        total_connections: state.tracker.total_count(),
    })
}

pub async fn get_rules(State(state): State<AdminState>) -> Json<RuleSet> {
    Json(state.sniffer.rules().as_ref().clone())
}

pub async fn put_rules(
    State(state): State<AdminState>,
    Json(rules): Json<RuleSet>,
) -> Json<RuleSet> {
    state.sniffer.update_rules(rules);
    Json(state.sniffer.rules().as_ref().clone())
}

pub async fn get_overload(State(state): State<AdminState>) -> Json<OverloadSnapshot> {
    Json(state.guard.snapshot())
}

pub async fn put_overload(
    State(state): State<AdminState>,
    Json(update): Json<ThresholdUpdate>,
) -> Json<OverloadSnapshot> {
    state.guard.set_threshold(update.max_service_unavailable_count);
    Json(state.guard.snapshot())
}
