use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("failed to encode metrics")]
    MetricsEncoding(#[from] std::fmt::Error),
    #[error("failed to build response")]
    ResponseBuild(#[from] axum::http::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl EndpointError {
    fn code(&self) -> &'static str {
        match self {
            Self::MetricsEncoding(_) => "metrics_encoding",
            Self::ResponseBuild(_) => "response_build",
        }
    }
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed with internal error");

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                code: self.code().to_string(),
                message: self.to_string(),
                details: json!({}),
            }),
        )
            .into_response()
    }
}
