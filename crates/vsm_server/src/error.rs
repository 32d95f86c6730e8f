//! HTTP-facing errors. Bodies are plain text.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::intake::IntakeError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Intake(#[from] IntakeError),

    /// The request's upload directory could not be created.
    #[error("Failed to prepare upload storage: {0}")]
    UploadDir(#[source] std::io::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Intake(e) => e.status(),
            AppError::UploadDir(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("Rejected upload: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}
