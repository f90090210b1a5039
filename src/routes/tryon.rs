use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app_state::AppState;
use crate::models::api::{ErrorResponse, TryOnResponse};
use crate::services::encode::{EncodeError, GarmentImage};
use crate::services::tryon::JobError;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// POST /api/v1/tryon — Run a try-on job for an uploaded garment image.
///
/// Headless counterpart of the overlay control: there is no page element to update,
/// so the output URL is returned to the caller.
pub async fn submit_tryon(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TryOnResponse>, ApiError> {
    let mut garment_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() == Some("garment") {
            let data = field
                .bytes()
                .await
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
            garment_bytes = Some(data.to_vec());
        }
    }

    let garment_bytes = garment_bytes
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "missing multipart field 'garment'"))?;

    let garment = GarmentImage::from_bytes(&garment_bytes).map_err(|e| match e {
        EncodeError::UnsupportedFormat => api_error(StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string()),
        EncodeError::Decode(_) => api_error(StatusCode::BAD_REQUEST, e.to_string()),
        EncodeError::Encode(_) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    })?;

    let job = state.pipeline.run(&garment, None).await.map_err(|e| {
        tracing::warn!(error = %e, phase = ?e.phase(), "Relayed try-on job failed");
        api_error(status_for(&e), e.to_string())
    })?;

    Ok(Json(TryOnResponse::from(job)))
}

fn status_for(error: &JobError) -> StatusCode {
    match error {
        JobError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        JobError::Client(_)
        | JobError::NotFresh { .. }
        | JobError::Transition(_)
        | JobError::RequestId(_) => StatusCode::INTERNAL_SERVER_ERROR,
        JobError::Submission { .. }
        | JobError::MalformedResponse { .. }
        | JobError::Poll { .. }
        | JobError::Transport { .. } => StatusCode::BAD_GATEWAY,
    }
}
