//! Wire types of the remote try-on queue API.

use serde::{Deserialize, Serialize};

/// Status value the service reports once a request has finished processing.
pub const COMPLETED_STATUS: &str = "COMPLETED";

/// Body of the job-submission request.
#[derive(Debug, Serialize)]
pub struct SubmitRequest<'a> {
    pub model_image: &'a str,
    pub garment_image: &'a str,
    pub category: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
}

impl StatusResponse {
    pub fn is_completed(&self) -> bool {
        self.status.as_deref() == Some(COMPLETED_STATUS)
    }
}

#[derive(Debug, Deserialize)]
pub struct ResultResponse {
    #[serde(default)]
    pub images: Option<Vec<OutputImage>>,
}

/// One output asset of a finished request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_request_shape() {
        let body = serde_json::to_value(SubmitRequest {
            model_image: "https://model/1.jpg",
            garment_image: "data:image/jpeg;base64,AAAA",
            category: "tops",
        })
        .unwrap();
        assert_eq!(body["model_image"], "https://model/1.jpg");
        assert_eq!(body["garment_image"], "data:image/jpeg;base64,AAAA");
        assert_eq!(body["category"], "tops");
    }

    #[test]
    fn test_status_sentinel() {
        let done: StatusResponse = serde_json::from_str(r#"{"status":"COMPLETED"}"#).unwrap();
        let queued: StatusResponse =
            serde_json::from_str(r#"{"status":"IN_QUEUE","queue_position":3}"#).unwrap();
        let empty: StatusResponse = serde_json::from_str("{}").unwrap();
        assert!(done.is_completed());
        assert!(!queued.is_completed());
        assert!(!empty.is_completed());
    }

    #[test]
    fn test_result_without_images() {
        let pending: ResultResponse = serde_json::from_str(r#"{"detail":"not ready"}"#).unwrap();
        assert!(pending.images.is_none());

        let ready: ResultResponse =
            serde_json::from_str(r#"{"images":[{"url":"https://out/1.jpg","width":768}]}"#)
                .unwrap();
        let images = ready.images.unwrap();
        assert_eq!(images[0].url, "https://out/1.jpg");
        assert_eq!(images[0].width, Some(768));
    }
}
