use std::io;

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub const GENERIC_ERROR: &str = "Server error processing request";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unexpected field: {0}")]
    UnexpectedFile(String),

    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Storage error: {0}")]
    Storage(#[from] io::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UnexpectedFile { .. } => StatusCode::BAD_REQUEST,
            AppError::Multipart { .. } | AppError::Storage { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            error!("Error processing request: {self}");
            GENERIC_ERROR.to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
