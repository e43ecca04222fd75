use crate::exporter::Exporter;
use crate::metrics::encode;
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

pub fn router(exporter: Arc<Exporter>, telemetry_path: &str) -> Router {
    let page = landing_page(telemetry_path);
    Router::new()
        .route("/", get(move || async move { Html(page) }))
        .route(telemetry_path, get(metrics))
        .with_state(exporter)
}

/// Serve until Ctrl-C.

pub async fn serve(exporter: Arc<Exporter>, listen: SocketAddr, telemetry_path: &str) -> Result<()> {
    let app = router(exporter, telemetry_path);
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Binding {listen}"))?;
    info!(address = %listen, path = telemetry_path, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await?;
    Ok(())
}

async fn metrics(State(exporter): State<Arc<Exporter>>) -> Response {
    let families = exporter.gather().await;
    match encode(&families) {
        Ok((content_type, body)) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            error!(error = %e, "encoding metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

fn landing_page(telemetry_path: &str) -> String {
    format!(
        "<html>
<head><title>Slurm Exporter</title></head>
<body>
<h1>Slurm Exporter</h1>
<p><a href=\"{telemetry_path}\">Metrics</a></p>
</body>
</html>
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::testing::FakeRunner;
    use crate::collectors::CollectorName;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_metrics_handler() {
        let runner = FakeRunner::new().with("sinfo -h -o %C", "3/13/0/16\n");
        let exporter = Exporter::new(Arc::new(runner), vec![CollectorName::Cpus.build()]).unwrap();
        let response = metrics(State(Arc::new(exporter))).await;
        assert!(response.status() == StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/plain"));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("slurm_cpus_total 16"));
        assert!(text.contains("slurm_exporter_collector_success{collector=\"cpus\"} 1"));
    }

    #[test]
    fn test_landing_page() {
        assert!(landing_page("/metrics").contains("<a href=\"/metrics\">"));
    }
}
