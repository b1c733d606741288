//! RPC status codes and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::auth::AuthError;
use crate::signer::SignerError;

/// Status code of a failed RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcCode {
    InvalidArgument,
    Unauthenticated,
    NotFound,
    AlreadyExists,
    Internal,
    Unimplemented,
    Unavailable,
}

impl RpcCode {
    pub fn http_status(self) -> StatusCode {
        match self {
            RpcCode::InvalidArgument => StatusCode::BAD_REQUEST,
            RpcCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            RpcCode::NotFound => StatusCode::NOT_FOUND,
            RpcCode::AlreadyExists => StatusCode::CONFLICT,
            RpcCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            RpcCode::Unimplemented => StatusCode::NOT_IMPLEMENTED,
            RpcCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Best-effort code for an HTTP status without a status body.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => RpcCode::InvalidArgument,
            401 => RpcCode::Unauthenticated,
            404 => RpcCode::NotFound,
            409 => RpcCode::AlreadyExists,
            501 => RpcCode::Unimplemented,
            503 => RpcCode::Unavailable,
            _ => RpcCode::Internal,
        }
    }
}

impl fmt::Display for RpcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RpcCode::InvalidArgument => "InvalidArgument",
            RpcCode::Unauthenticated => "Unauthenticated",
            RpcCode::NotFound => "NotFound",
            RpcCode::AlreadyExists => "AlreadyExists",
            RpcCode::Internal => "Internal",
            RpcCode::Unimplemented => "Unimplemented",
            RpcCode::Unavailable => "Unavailable",
        };
        f.write_str(name)
    }
}

/// Error returned by every RPC, on the server and the client side.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct RpcStatus {
    pub code: RpcCode,
    pub message: String,
}

impl RpcStatus {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(RpcCode::InvalidArgument, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Unauthenticated, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RpcCode::NotFound, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(RpcCode::AlreadyExists, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Internal, message)
    }

    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Unimplemented, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Unavailable, message)
    }
}

impl IntoResponse for RpcStatus {
    fn into_response(self) -> Response {
        (self.code.http_status(), Json(self)).into_response()
    }
}

/// Failures of a verified call: local faults are `Internal`, everything
/// else is a rejected credential.
impl From<AuthError> for RpcStatus {
    fn from(err: AuthError) -> Self {
        if err.is_internal() {
            RpcStatus::internal(format!("failed to verify authentication: {}", err))
        } else {
            RpcStatus::unauthenticated(format!("invalid authentication: {}", err))
        }
    }
}

impl From<SignerError> for RpcStatus {
    fn from(err: SignerError) -> Self {
        RpcStatus::internal(format!("signer failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_http_mapping() {
        let cases = [
            (RpcStatus::invalid_argument("x"), StatusCode::BAD_REQUEST),
            (RpcStatus::unauthenticated("x"), StatusCode::UNAUTHORIZED),
            (RpcStatus::not_found("x"), StatusCode::NOT_FOUND),
            (RpcStatus::already_exists("x"), StatusCode::CONFLICT),
            (RpcStatus::internal("x"), StatusCode::INTERNAL_SERVER_ERROR),
            (RpcStatus::unimplemented("x"), StatusCode::NOT_IMPLEMENTED),
            (RpcStatus::unavailable("x"), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (status, expected) in cases {
            let code = status.code;
            assert_eq!(status.into_response().status(), expected);
            assert_eq!(RpcCode::from_http_status(expected.as_u16()), code);
        }
    }

    #[test]
    fn test_auth_error_mapping() {
        let rejected: RpcStatus = AuthError::TokenAlreadyUsed.into();
        assert_eq!(rejected.code, RpcCode::Unauthenticated);
        assert!(rejected.message.contains("already used"));

        let fault: RpcStatus = AuthError::Signer(SignerError::SigningFailed("down".into())).into();
        assert_eq!(fault.code, RpcCode::Internal);
    }

    #[test]
    fn test_status_json() {
        let status = RpcStatus::unimplemented("authentication is not enabled");
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(
            json,
            r#"{"code":"unimplemented","message":"authentication is not enabled"}"#
        );
        assert_eq!(serde_json::from_str::<RpcStatus>(&json).unwrap(), status);
        assert_eq!(
            status.to_string(),
            "Unimplemented: authentication is not enabled"
        );
    }
}
