use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::disclosure::router::error_response;
use crate::workflows::disclosure::{DisclosureServiceError, FailureKind, SessionError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Disclosure(DisclosureServiceError),
    Client(SessionError),
}

impl AppError {
    /// Failure category when the error came out of the disclosure workflow.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            AppError::Disclosure(err) => Some(err.failure_kind()),
            AppError::Client(err) => Some(err.failure_kind()),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Disclosure(err) => write!(f, "disclosure error: {}", err),
            AppError::Client(err) => write!(f, "disclosure client error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Disclosure(err) => Some(err),
            AppError::Client(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Disclosure(err) => return error_response(err),
            AppError::Client(ref err) => match err.failure_kind() {
                FailureKind::NotFound => StatusCode::NOT_FOUND,
                FailureKind::IllegalTransition => StatusCode::CONFLICT,
                FailureKind::Unauthorized => StatusCode::FORBIDDEN,
                FailureKind::NetworkFailure => StatusCode::BAD_GATEWAY,
            },
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<DisclosureServiceError> for AppError {
    fn from(value: DisclosureServiceError) -> Self {
        Self::Disclosure(value)
    }
}

impl From<SessionError> for AppError {
    fn from(value: SessionError) -> Self {
        Self::Client(value)
    }
}
