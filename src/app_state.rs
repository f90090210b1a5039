use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::services::pipeline::TryOnPipeline;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TryOnPipeline>,
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn new(pipeline: TryOnPipeline, metrics: PrometheusHandle) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            metrics,
        }
    }
}
