use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use tryon_overlay::{
    app_state::AppState, config::AppConfig, routes, services::pipeline::TryOnPipeline,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing try-on relay");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");

    metrics::describe_counter!("tryon_jobs_submitted_total", "Try-on jobs submitted");
    metrics::describe_counter!("tryon_jobs_completed_total", "Try-on jobs that produced an image");
    metrics::describe_counter!("tryon_jobs_failed_total", "Try-on jobs that ended in FAILED");
    metrics::describe_counter!("tryon_polls_total", "Status and result polls sent");
    metrics::describe_histogram!(
        "tryon_job_duration_seconds",
        "Time from submission to a usable output image"
    );
    metrics::describe_counter!("overlays_attached_total", "Overlay controls attached to images");

    tracing::info!(api_url = %config.tryon_api_url, "Initializing try-on pipeline");
    let pipeline =
        TryOnPipeline::new(config.tryon_config()).expect("Failed to initialize try-on pipeline");

    let state = AppState::new(pipeline, prometheus_handle);

    let app = routes::router(state);

    tracing::info!("Starting try-on relay on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app).await.expect("Server error");
}
