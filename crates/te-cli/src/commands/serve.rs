//! Long-running exporter: the scrape loop plus the `/metrics` endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use te_api::TogglApi;
use te_metrics::{CONTENT_TYPE, Metrics};
use tokio::net::TcpListener;
use tokio::time::MissedTickBehavior;

use crate::collector::Collector;

const INDEX_PAGE: &str = "<html>\
<head><title>Toggl Track Exporter</title></head>\
<body><h1>Toggl Track Exporter</h1><p><a href=\"/metrics\">Metrics</a></p></body>\
</html>";

/// Routes served alongside the scrape loop.
pub fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    match metrics.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}

/// Binds `listen_addr`, then scrapes every `interval` until Ctrl-C.
///
/// Shutdown and server failure are observed while a cycle is in flight; the
/// pending cycle is dropped along with its outstanding requests.
pub async fn run<A: TogglApi>(
    collector: Collector<A>,
    metrics: Arc<Metrics>,
    listen_addr: SocketAddr,
    interval: Duration,
) -> Result<()> {
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        interval_secs = interval.as_secs(),
        "serving metrics"
    );

    let mut server = tokio::spawn(async move { axum::serve(listener, router(metrics)).await });

    tokio::select! {
        () = scrape_forever(&collector, interval) => {}
        joined = &mut server => {
            joined
                .context("metrics server task failed")?
                .context("metrics server stopped")?;
            anyhow::bail!("metrics server exited unexpectedly");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            tracing::info!("shutting down");
        }
    }

    server.abort();
    Ok(())
}

/// Runs a cycle immediately, then one per tick. Never returns.
///
/// Cycles that overrun the interval skip the missed ticks rather than
/// bunching up.
async fn scrape_forever<A: TogglApi>(collector: &Collector<A>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        collector.run_one_cycle().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::to_bytes;
    use serde_json::{Value, json};
    use te_api::{ApiError, Method};
    use te_core::LookbackWindow;

    use super::*;

    #[tokio::test]
    async fn test_metrics_handler_serves_text_format() {
        let metrics = Arc::new(Metrics::new().unwrap());
        metrics.record_api_error("me");

        let response = metrics_handler(State(metrics)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("toggl_api_errors_total{endpoint=\"me\"} 1"));
    }

    /// Counts `/me` requests; optionally never answers.
    struct CountingApi {
        me_calls: Arc<AtomicUsize>,
        hang: bool,
    }

    impl TogglApi for CountingApi {
        async fn request(
            &self,
            _method: Method,
            path: &str,
            _query: &[(&str, String)],
        ) -> Result<Value, ApiError> {
            if path == "/me" {
                self.me_calls.fetch_add(1, Ordering::SeqCst);
            }
            if self.hang {
                return std::future::pending().await;
            }
            Ok(json!({"id": 1}))
        }
    }

    fn collector(hang: bool) -> (Collector<CountingApi>, Arc<AtomicUsize>) {
        let me_calls = Arc::new(AtomicUsize::new(0));
        let api = CountingApi {
            me_calls: Arc::clone(&me_calls),
            hang,
        };
        let collector = Collector::new(
            api,
            Arc::new(Metrics::new().unwrap()),
            vec![LookbackWindow::new(1).unwrap()],
        );
        (collector, me_calls)
    }

    #[tokio::test]
    async fn test_first_cycle_runs_immediately() {
        let (collector, me_calls) = collector(false);
        let result = tokio::time::timeout(
            Duration::from_millis(200),
            scrape_forever(&collector, Duration::from_secs(3600)),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(me_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_in_flight_cycle_can_be_cancelled() {
        let (collector, me_calls) = collector(true);
        let result = tokio::time::timeout(
            Duration::from_millis(200),
            scrape_forever(&collector, Duration::from_secs(3600)),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(me_calls.load(Ordering::SeqCst), 1);
        assert!(collector.metrics().scrape_duration.get().abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_index_links_to_metrics() {
        let Html(page) = index().await;
        assert!(page.contains("href=\"/metrics\""));
    }
}
