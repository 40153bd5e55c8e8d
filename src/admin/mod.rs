//! Operator control surface.
//!
//! # Endpoints
//! ```text
//! GET  /admin/status     version and live connection counts
//! GET  /admin/rules      active sniffer rule set
//! PUT  /admin/rules      replace the rule set wholesale
//! GET  /admin/overload   window counter and threshold
//! PUT  /admin/overload   set the threshold (restarts the reset window)
//! ```
//! All endpoints require `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use crate::net::ConnectionTracker;
use crate::overload::OverloadGuard;
use crate::sniff::Sniffer;

use self::auth::admin_auth_middleware;
use self::handlers::*;

/// Shared handles the admin API operates on.
#[derive(Clone)]
pub struct AdminState {
    pub sniffer: Arc<Sniffer>,
    pub guard: Arc<OverloadGuard>,
    pub tracker: ConnectionTracker,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/rules", get(get_rules).put(put_rules))
        .route("/admin/overload", get(get_overload).put(put_overload))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
