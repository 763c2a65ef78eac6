use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use basket_ocr::PipelineError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("OCR failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Pipeline(PipelineError::Preprocess(e)) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid image", "details": e.to_string() }),
            ),
            AppError::Pipeline(e) => {
                tracing::error!(error = %e, "receipt OCR failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "OCR failed", "details": e.to_string() }),
                )
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Server error" }))
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Server error" }))
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basket_ocr::{OcrError, PreprocessError};

    #[test]
    fn status_codes() {
        assert_eq!(
            AppError::BadRequest("Missing data").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("Receipt not found").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Pipeline(PipelineError::Ocr(OcrError::NotAvailable)).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Pipeline(PipelineError::Preprocess(PreprocessError::Empty)).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
