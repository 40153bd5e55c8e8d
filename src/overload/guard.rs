//! Route-not-found response generation under a fixed-window budget.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use serde::Serialize;

use crate::config::OverloadConfig;
use crate::observability::metrics;
use crate::overload::page::FallbackPage;
use crate::overload::schedule::ResetSchedule;

/// Realm advertised on 401 responses.
pub const BASIC_REALM: &str = r#"Basic realm="Restricted""#;

/// Point-in-time view of the guard for the admin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverloadSnapshot {
    pub count: u64,
    pub threshold: u64,
    pub window_secs: u64,
}

/// Decides between a degrade page and a bare rejection for unroutable requests.
#[derive(Debug)]
pub struct OverloadGuard {
    counter: Arc<AtomicU64>,
    threshold: AtomicU64,
    window: Duration,
    page: FallbackPage,
    server: HeaderValue,
    /// Serializes threshold changes against the reset task restart.
    schedule: Mutex<ResetSchedule>,
}

impl OverloadGuard {
    /// Build a guard and start its reset schedule.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: &OverloadConfig) -> Self {
        let server = HeaderValue::from_str(&config.server_header()).unwrap_or_else(|_| {
            tracing::warn!(server = %config.server_header(), "Invalid Server header value, using crate name");
            HeaderValue::from_static(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        });

        let guard = Self {
            counter: Arc::new(AtomicU64::new(0)),
            threshold: AtomicU64::new(config.max_service_unavailable_count),
            window: Duration::from_secs(config.window_secs),
            page: FallbackPage::new(config.page_path.clone()),
            server,
            schedule: Mutex::new(ResetSchedule::Stopped),
        };
        guard.set_threshold(config.max_service_unavailable_count);
        guard
    }

    /// Set the threshold and restart the reset window.
    ///
    /// Any previously running reset task is cancelled first, so repeated
    /// calls never leave more than one task behind.
    pub fn set_threshold(&self, threshold: u64) {
        let mut schedule = self.schedule.lock().unwrap_or_else(PoisonError::into_inner);
        self.threshold.store(threshold, Ordering::SeqCst);
        schedule.restart(Arc::clone(&self.counter), self.window);

        tracing::info!(
            threshold,
            window_secs = self.window.as_secs(),
            "Overload threshold configured"
        );
    }

    /// Response for a request whose host has no route.
    pub async fn on_route_not_found(&self) -> Response<Body> {
        let count = self.counter.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        metrics::record_overload_count(count);

        if count > self.threshold.load(Ordering::SeqCst) {
            metrics::record_route_not_found(StatusCode::FORBIDDEN);
            return status_only(StatusCode::FORBIDDEN);
        }

        let content = self.page.content().await;
        let mut response = Response::new(Body::from(content));
        *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
        let headers = response.headers_mut();
        headers.insert(header::SERVER, self.server.clone());
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));

        metrics::record_route_not_found(StatusCode::SERVICE_UNAVAILABLE);
        response
    }

    /// Fixed 401 challenge. Does not touch the overload counter.
    pub fn on_unauthorized(&self) -> Response<Body> {
        let mut response = status_only(StatusCode::UNAUTHORIZED);
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(BASIC_REALM));
        response
    }

    pub fn snapshot(&self) -> OverloadSnapshot {
        OverloadSnapshot {
            count: self.counter.load(Ordering::SeqCst),
            threshold: self.threshold.load(Ordering::SeqCst),
            window_secs: self.window.as_secs(),
        }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold.load(Ordering::SeqCst)
    }

    pub fn page(&self) -> &FallbackPage {
        &self.page
    }

    pub fn is_resetting(&self) -> bool {
        self.schedule
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_running()
    }
}

impl Drop for OverloadGuard {
    fn drop(&mut self) {
        self.schedule
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .stop();
    }
}

fn status_only(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overload::page::DEFAULT_PAGE;
    use std::io::Write;

    fn config(threshold: u64) -> OverloadConfig {
        OverloadConfig {
            max_service_unavailable_count: threshold,
            ..OverloadConfig::default()
        }
    }

    async fn body_of(response: Response<Body>) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test(start_paused = true)]
    async fn sheds_after_threshold_until_window_resets() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<h1>offline</h1>").unwrap();
        let guard = OverloadGuard::new(&OverloadConfig {
            page_path: Some(file.path().to_path_buf()),
            ..config(2)
        });

        let mut statuses = Vec::new();
        for _ in 0..3 {
            let response = guard.on_route_not_found().await;
            let status = response.status();
            if status == StatusCode::SERVICE_UNAVAILABLE {
                assert_eq!(body_of(response).await, b"<h1>offline</h1>");
            } else {
                assert!(response.headers().is_empty());
                assert!(body_of(response).await.is_empty());
            }
            statuses.push(status.as_u16());
        }
        assert_eq!(statuses, [503, 503, 403]);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(guard.on_route_not_found().await.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn degrade_response_headers() {
        let guard = OverloadGuard::new(&config(10));
        let response = guard.on_route_not_found().await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
        assert_eq!(
            response.headers()[header::SERVER],
            format!("ingress-edge/{}", env!("CARGO_PKG_VERSION")).as_str()
        );
        assert_eq!(body_of(response).await, DEFAULT_PAGE.as_bytes());
    }

    #[tokio::test]
    async fn zero_threshold_rejects_everything() {
        let guard = OverloadGuard::new(&config(0));
        assert_eq!(guard.on_route_not_found().await.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unauthorized_leaves_counter_alone() {
        let guard = OverloadGuard::new(&config(1));
        let response = guard.on_unauthorized();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], r#"Basic realm="Restricted""#);
        assert_eq!(guard.snapshot().count, 0);
        assert_eq!(guard.on_route_not_found().await.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test(start_paused = true)]
    async fn reconfiguring_replaces_the_reset_task() {
        let guard = OverloadGuard::new(&config(2));

        // Restart the window halfway through: the first task is due at t=60,
        // the replacement at t=90.
        tokio::time::sleep(Duration::from_secs(30)).await;
        guard.set_threshold(2);
        guard.set_threshold(2);
        assert!(guard.is_resetting());

        for _ in 0..3 {
            guard.on_route_not_found().await;
        }
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(guard.on_route_not_found().await.status(), StatusCode::FORBIDDEN);
        assert_eq!(guard.snapshot().count, 4);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(guard.snapshot().count, 0);
        assert_eq!(guard.on_route_not_found().await.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn snapshot_reports_configuration() {
        let guard = OverloadGuard::new(&config(7));
        guard.set_threshold(9);
        assert_eq!(
            guard.snapshot(),
            OverloadSnapshot { count: 0, threshold: 9, window_secs: 60 }
        );
    }
}
