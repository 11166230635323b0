use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::service::ServiceError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("model not ready")]
    ModelUnready,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("rerank failed: {0}")]
    RerankFailed(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<ServiceError> for GatewayError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::ModelUnready => GatewayError::ModelUnready,
            ServiceError::Validation { reason } => GatewayError::InvalidRequest(reason),
            ServiceError::Embedding(e) => GatewayError::EmbeddingFailed(e.to_string()),
            ServiceError::Reranker(e) => GatewayError::RerankFailed(e.to_string()),
        }
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        GatewayError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::ModelUnready => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::EmbeddingFailed(_)
            | GatewayError::RerankFailed(_)
            | GatewayError::InternalError(_) => {
                error!(error = %self, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}
