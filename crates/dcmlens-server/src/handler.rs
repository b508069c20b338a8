use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use dcmlens_service::{RawUpload, UploadOutcome, UploadService};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::AppError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<UploadService>,
}

impl AppState {
    pub fn new(service: UploadService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// `?tag=GGGG,EEEE`
#[derive(Debug, Deserialize)]
pub struct TagQuery {
    pub tag: String,
}

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

/// Info handler.
pub async fn info_handler() -> Json<Value> {
    Json(json!({
        "name": "dcmlens",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /dicom/upload`: store the `file` field, answer for the tag.
pub async fn upload_handler(
    State(state): State<AppState>,
    query: Result<Query<TagQuery>, QueryRejection>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let Query(TagQuery { tag }) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        let mut raw = RawUpload::new(bytes.to_vec());
        raw.filename = filename;
        upload = Some(raw);
        break;
    }
    let upload = upload.ok_or(AppError::MissingFile)?;
    debug!(size = upload.bytes.len(), filename = ?upload.filename, tag = %tag, "upload received");

    let service = state.service.clone();
    let outcome = tokio::task::spawn_blocking(move || service.process_upload(upload, &tag))
        .await
        .map_err(|e| AppError::Task(e.to_string()))??;
    Ok(outcome_response(outcome))
}

/// `POST /random_file`: answer for the tag from a random stored file.
pub async fn random_file_handler(
    State(state): State<AppState>,
    query: Result<Query<TagQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(TagQuery { tag }) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let service = state.service.clone();
    let outcome = tokio::task::spawn_blocking(move || service.process_random(&tag))
        .await
        .map_err(|e| AppError::Task(e.to_string()))??;
    Ok(outcome_response(outcome))
}

fn outcome_response(outcome: UploadOutcome) -> Response {
    match outcome {
        UploadOutcome::Image { png, headers } => {
            let mut map = HeaderMap::with_capacity(headers.len() + 1);
            map.insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
            for (name, value) in headers {
                match (
                    HeaderName::from_bytes(name.as_bytes()),
                    HeaderValue::from_str(&value),
                ) {
                    (Ok(name), Ok(value)) => {
                        map.insert(name, value);
                    }
                    _ => debug!(header = %name, "dropping header that is not valid HTTP"),
                }
            }
            (StatusCode::OK, map, png).into_response()
        }
        UploadOutcome::Metadata(response) => Json(response).into_response(),
    }
}
