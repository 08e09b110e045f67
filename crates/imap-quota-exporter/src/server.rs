//! HTTP scrape endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::Result;
use crate::metrics::{CONTENT_TYPE, Metrics};

const INDEX: &str = "<html>\n\
<head><title>IMAP Quota Exporter</title></head>\n\
<body>\n\
<h1>IMAP Quota Exporter</h1>\n\
<p><a href=\"/metrics\">Metrics</a></p>\n\
</body>\n\
</html>\n";

/// Builds the router serving `/metrics` and the index page.
pub fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(scrape))
        .with_state(metrics)
}

/// Serves the router on an already bound listener until the task is
/// dropped.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve(listener: TcpListener, metrics: Arc<Metrics>) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Metrics available at http://{addr}/metrics");
    }
    axum::serve(listener, router(metrics)).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX)
}

async fn scrape(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], metrics.render())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::quota::QuotaSample;

    async fn get_path(metrics: Arc<Metrics>, path: &str) -> (StatusCode, String, String) {
        let response = router(metrics)
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let metrics = Arc::new(Metrics::new().unwrap());
        metrics.record_quota(
            "a",
            QuotaSample {
                used_kb: 3,
                limit_kb: 4,
            },
        );
        metrics.set_up("a", true);

        let (status, content_type, body) = get_path(metrics, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "text/plain; version=0.0.4");
        assert!(body.contains("imap_quota_used_kb{account=\"a\"} 3"));
        assert!(body.contains("imap_up{account=\"a\"} 1"));
    }

    #[tokio::test]
    async fn test_index_links_metrics() {
        let metrics = Arc::new(Metrics::new().unwrap());

        let (status, content_type, body) = get_path(metrics, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/html"));
        assert!(body.contains("href=\"/metrics\""));
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let (status, _, _) = get_path(metrics, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
