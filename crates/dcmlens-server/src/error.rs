use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use dcmlens_service::{ErrorKind, ServiceError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Startup and serving failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] dcmlens_store::StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// A failed request, rendered as `{"error": <kind>, "detail": <message>}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("missing multipart field `file`")]
    MissingFile,

    #[error("{0}")]
    BadRequest(String),

    #[error("invalid multipart body: {detail}")]
    Multipart { status: StatusCode, detail: String },

    #[error("upload task failed: {0}")]
    Task(String),
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        Self::Multipart {
            status: e.status(),
            detail: e.body_text(),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Service(e) => match e.kind() {
                ErrorKind::InvalidTagFormat | ErrorKind::InvalidFormat => StatusCode::BAD_REQUEST,
                ErrorKind::TagNotFound | ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::StorageFailure | ErrorKind::Internal => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::MissingFile | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Multipart { status, .. } => *status,
            Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Service(e) => e.kind().as_str(),
            Self::MissingFile | Self::BadRequest(_) => "bad_request",
            Self::Multipart { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                "payload_too_large"
            }
            Self::Multipart { .. } => "bad_request",
            Self::Task(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = json!({
            "error": self.kind(),
            "detail": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_status() {
        let cases = [
            (ServiceError::InvalidFormat, StatusCode::BAD_REQUEST),
            (ServiceError::TagNotFound("0011,0011".into()), StatusCode::NOT_FOUND),
            (ServiceError::NoStoredFiles, StatusCode::NOT_FOUND),
            (ServiceError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn request_errors() {
        assert_eq!(AppError::MissingFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::MissingFile.kind(), "bad_request");
        let too_large = AppError::Multipart {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            detail: "length limit exceeded".into(),
        };
        assert_eq!(too_large.kind(), "payload_too_large");
        assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn service_kind_passes_through() {
        let err = AppError::from(ServiceError::TagNotFound("0011,0011".into()));
        assert_eq!(err.kind(), "tag_not_found");
        assert_eq!(err.to_string(), "Tag 0011,0011 not found in DICOM file");
    }
}
