use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Gateway-wide error taxonomy. Auth failures map to three distinct HTTP
/// statuses; everything else is an internal fault.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("unauthenticated: no credential presented")]
    Unauthenticated,

    #[error("permission denied: credential did not match")]
    PermissionDenied,

    #[error("issuer mismatch")]
    IssuerMismatch,

    #[error("retention store error: {0}")]
    Retention(String),

    #[error("serialization error: {0}")]
    Model(#[from] flarego_model::ModelError),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match self {
            GatewayError::Unauthenticated => StatusCode::UNAUTHORIZED,
            GatewayError::PermissionDenied | GatewayError::IssuerMismatch => StatusCode::FORBIDDEN,
            GatewayError::Retention(_) | GatewayError::Model(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}
