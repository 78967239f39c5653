use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use tokio_util::io::ReaderStream;

use crate::{
    adapters::inbound::http::{
        dto::{ErrorResponseDto, HealthResponseDto},
        router::AppState,
    },
    domain::value_objects::DerivedLocator,
    services::DeliveryOutcome,
};

type HandlerError = (StatusCode, Json<ErrorResponseDto>);

/// Serve `/<bucket>/styles/<style>/<key...>`
pub async fn deliver_derivative(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, HandlerError> {
    let request_path = format!("/{}", path);
    let coordinator = &app_state.coordinator;

    let outcome = coordinator.deliver_path(&request_path).await.map_err(|e| {
        let status = StatusCode::from(&e);
        tracing::error!(path = %request_path, error = %e, %status, "Derivative delivery failed");
        (status, Json(ErrorResponseDto::from_derivative_error(&e)))
    })?;

    match outcome {
        DeliveryOutcome::NotFound => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponseDto::not_found(&format!(
                "No derivative at {}",
                request_path
            ))),
        )),
        DeliveryOutcome::Redirect(url) => Ok((
            StatusCode::MOVED_PERMANENTLY,
            [(header::LOCATION, url)],
        )
            .into_response()),
        DeliveryOutcome::Generated { data, content_type } => Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type),
                (header::CONTENT_LENGTH, data.len().to_string()),
            ],
            data,
        )
            .into_response()),
        DeliveryOutcome::Staged { path, content_type } => {
            let file = tokio::fs::File::open(&path).await;
            let metadata = match &file {
                Ok(file) => file.metadata().await.ok(),
                Err(_) => None,
            };
            match (file, metadata) {
                (Ok(file), Some(metadata)) => Ok((
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, content_type),
                        (header::CONTENT_LENGTH, metadata.len().to_string()),
                    ],
                    Body::from_stream(ReaderStream::new(file)),
                )
                    .into_response()),
                // The peer's upload finished and removed the staged file
                _ => {
                    let location = DerivedLocator::from_request_path(&request_path)
                        .map(|derivative| derivative.request_path())
                        .map_err(|e| {
                            (
                                StatusCode::INTERNAL_SERVER_ERROR,
                                Json(ErrorResponseDto::internal_error(&e.to_string())),
                            )
                        })?;
                    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
                }
            }
        }
    }
}

pub async fn health(State(app_state): State<AppState>) -> Json<HealthResponseDto> {
    let coordinator = &app_state.coordinator;
    Json(HealthResponseDto {
        status: "ok".to_string(),
        styles: coordinator.styles().len(),
        pending_uploads: coordinator.pending_uploads(),
        timestamp: Utc::now(),
    })
}
