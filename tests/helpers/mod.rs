//! Mock try-on service and recording targets for integration tests

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tryon_overlay::discovery::document::NodeId;
use tryon_overlay::discovery::memory::MemoryDocument;
use tryon_overlay::discovery::policy::SizePolicy;
use tryon_overlay::discovery::AttachmentEngine;
use tryon_overlay::services::pipeline::{ResultTarget, TryOnPipeline};
use tryon_overlay::services::tryon::TryOnConfig;

use crate::fixtures::{API_KEY, API_PATH, REQUEST_ID};

pub const POLL_INTERVAL: Duration = Duration::from_millis(20);
pub const POLL_TIMEOUT: Duration = Duration::from_millis(200);

/// Stand-in for the remote try-on queue.
pub struct MockTryOnService {
    pub server: MockServer,
}

impl MockTryOnService {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn config(&self) -> TryOnConfig {
        let mut config = TryOnConfig::new(format!("{}{}", self.server.uri(), API_PATH), API_KEY);
        config.poll_interval = POLL_INTERVAL;
        config.poll_timeout = POLL_TIMEOUT;
        config.request_timeout = Duration::from_secs(5);
        config
    }

    pub fn pipeline(&self) -> TryOnPipeline {
        TryOnPipeline::new(self.config()).expect("pipeline builds")
    }

    pub fn status_path() -> String {
        format!("{}/requests/{}/status", API_PATH, REQUEST_ID)
    }

    pub fn result_path() -> String {
        format!("{}/requests/{}", API_PATH, REQUEST_ID)
    }

    pub async fn mount_submit(&self, status: u16, body: Value) {
        Mock::given(method("POST"))
            .and(path(API_PATH))
            .and(header("authorization", format!("Key {}", API_KEY).as_str()))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_accepting_submit(&self) {
        self.mount_submit(200, json!({ "request_id": REQUEST_ID })).await;
    }

    /// Answer `times` status polls with `status` (all remaining polls when `None`).
    pub async fn mount_status(&self, status: &str, times: Option<u64>) {
        let mock = Mock::given(method("GET"))
            .and(path(Self::status_path()))
            .and(header("authorization", format!("Key {}", API_KEY).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": status })));
        match times {
            Some(n) => mock.up_to_n_times(n).expect(n).mount(&self.server).await,
            None => mock.mount(&self.server).await,
        }
    }

    pub async fn mount_result(&self, body: Value, times: Option<u64>) {
        let mock = Mock::given(method("GET"))
            .and(path(Self::result_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body));
        match times {
            Some(n) => mock.up_to_n_times(n).expect(n).mount(&self.server).await,
            None => mock.mount(&self.server).await,
        }
    }

    /// Submission accepted, status complete and result ready on first poll.
    pub async fn mount_happy_path(&self, result_url: &str) {
        self.mount_accepting_submit().await;
        self.mount_status("COMPLETED", None).await;
        self.mount_result(json!({ "images": [{ "url": result_url }] }), None)
            .await;
    }

    pub async fn requests_to(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .count()
    }
}

/// Records every result URL it receives.
#[derive(Default)]
pub struct RecordingTarget {
    pub applied: Mutex<Vec<String>>,
}

impl ResultTarget for RecordingTarget {
    fn apply(&self, asset_url: &str) {
        self.applied.lock().push(asset_url.to_string());
    }
}

/// Engine over an empty in-memory document.
pub fn engine_with(pipeline: TryOnPipeline) -> AttachmentEngine<MemoryDocument> {
    AttachmentEngine::new(
        Arc::new(Mutex::new(MemoryDocument::new())),
        Arc::new(pipeline),
        SizePolicy::default(),
    )
}

/// Engine whose pipeline points at a port nothing listens on.
pub fn offline_engine() -> AttachmentEngine<MemoryDocument> {
    let pipeline = TryOnPipeline::new(TryOnConfig::new("http://127.0.0.1:9/fashn/tryon", API_KEY))
        .expect("pipeline builds");
    engine_with(pipeline)
}

/// Append a not-yet-loaded image under the root and return it.
pub fn insert_image(engine: &AttachmentEngine<MemoryDocument>, src: &str) -> NodeId {
    let mut doc = engine.document().lock();
    let img = doc.create_image(src);
    let root = doc.root();
    doc.append_child(root, img);
    img
}
