use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::booking::router::error_status;
use crate::workflows::booking::BookingServiceError;
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
    Booking(BookingServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {err}"),
            AppError::Telemetry(err) => write!(f, "telemetry error: {err}"),
            AppError::Io(err) => write!(f, "io error: {err}"),
            AppError::Server(err) => write!(f, "server error: {err}"),
            AppError::Booking(err) => write!(f, "booking error: {err}"),
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
            AppError::Booking(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Booking(err) => error_status(err),
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

impl From<BookingServiceError> for AppError {
    fn from(value: BookingServiceError) -> Self {
        Self::Booking(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::booking::{BookingId, MarinaId};

    #[test]
    fn booking_errors_keep_their_status() {
        let missing = AppError::from(BookingServiceError::BookingNotFound(BookingId(4)));
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let forbidden = AppError::from(BookingServiceError::Forbidden {
            user_id: "op-2".to_string(),
            marina_id: MarinaId(2),
        });
        assert_eq!(forbidden.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn infrastructure_errors_are_internal() {
        let io = AppError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.to_string(), "io error: disk");
        assert_eq!(
            io.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
