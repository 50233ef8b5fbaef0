use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::shortlist::{
    ExportError, RemoteCallError, SessionError, ShortlistServiceError,
};
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
    Remote(RemoteCallError),
    Session(SessionError),
    Export(ExportError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Remote(err) => write!(f, "remote error: {}", err),
            AppError::Session(err) => write!(f, "session error: {}", err),
            AppError::Export(err) => write!(f, "export error: {}", err),
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
            AppError::Remote(err) => Some(err),
            AppError::Session(err) => Some(err),
            AppError::Export(err) => Some(err),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Session(SessionError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Session(SessionError::Precondition(_) | SessionError::Stale(_)) => {
                StatusCode::CONFLICT
            }
            AppError::Remote(_) | AppError::Session(SessionError::Remote(_)) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable tag carried next to the message in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Session(SessionError::Validation(_)) => "validation",
            AppError::Session(SessionError::Precondition(_)) => "precondition",
            AppError::Session(SessionError::Stale(_)) => "stale",
            AppError::Remote(_) | AppError::Session(SessionError::Remote(_)) => "remote",
            AppError::Export(_) => "export",
            AppError::Config(_) | AppError::Telemetry(_) | AppError::Io(_) | AppError::Server(_) => {
                "internal"
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (self.status(), body).into_response()
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

impl From<RemoteCallError> for AppError {
    fn from(value: RemoteCallError) -> Self {
        Self::Remote(value)
    }
}

impl From<SessionError> for AppError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

impl From<ExportError> for AppError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<ShortlistServiceError> for AppError {
    fn from(value: ShortlistServiceError) -> Self {
        match value {
            ShortlistServiceError::Session(err) => Self::Session(err),
            ShortlistServiceError::Export(err) => Self::Export(err),
        }
    }
}
