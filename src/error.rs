use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid date range: {0}")]
    InvalidRange(String),

    #[error("invalid vote status: {0:?}")]
    InvalidStatus(String),

    #[error("event {0} not found")]
    NotFound(String),

    #[error("incorrect pin for event {0}")]
    Forbidden(String),

    #[error("no pin provided for event {0}")]
    Unauthorized(String),

    #[error("could not generate event: {0}")]
    Generation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("snapshot failed: {0}")]
    Snapshot(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_)
            | AppError::Serialization(_)
            | AppError::Io(_)
            | AppError::Snapshot(_)
            | AppError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidRange(_) | AppError::InvalidStatus(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "internal server error".to_string()
            }
            AppError::Serialization(e) => {
                tracing::error!(error = %e, "stored event could not be (de)serialized");
                "internal server error".to_string()
            }
            AppError::Io(e) => {
                tracing::error!(error = %e, "i/o error");
                "internal server error".to_string()
            }
            AppError::Generation(msg) => {
                tracing::error!(reason = %msg, "event generation failed");
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}
