use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    BoxError, Json,
};
use domain::error::CheckInError;
use thiserror::Error;

use crate::response::Envelope;

/// Message shown for any persistence failure. Details stay in the server log.
pub const RETRY_MESSAGE: &str = "Something went wrong on our side. Please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Wrong event: {0}")]
    WrongEvent(String),

    #[error("Malformed request: {0}")]
    Malformed(String),

    /// Coupon already consumed, or a redemption that consumed nothing.
    #[error("Already redeemed: {0}")]
    AlreadyRedeemed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limited")]
    RateLimited { retry_after_secs: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::WrongEvent(_) | ApiError::AlreadyRedeemed(_) => StatusCode::CONFLICT,
            ApiError::Malformed(_) => StatusCode::BAD_REQUEST,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code carried in the envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::WrongEvent(_) => "wrong_event",
            ApiError::Malformed(_) => "malformed",
            ApiError::AlreadyRedeemed(_) => "already_redeemed",
            ApiError::Timeout => "timeout",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::Internal(_) => "persistence_failure",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = match &self {
            ApiError::NotFound(msg)
            | ApiError::WrongEvent(msg)
            | ApiError::Malformed(msg)
            | ApiError::AlreadyRedeemed(msg) => msg.clone(),
            ApiError::Timeout => "The request took too long. Please try again.".into(),
            ApiError::RateLimited { .. } => "Too many attempts. Please wait and try again.".into(),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                RETRY_MESSAGE.into()
            }
        };

        let mut response = (status, Json(Envelope::failure(code, message))).into_response();

        if let ApiError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Turns failures of the fallible tower layers into envelope responses.
pub async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::Timeout
    } else {
        ApiError::Internal(format!("Unhandled middleware error: {}", err))
    }
}

impl From<CheckInError> for ApiError {
    fn from(err: CheckInError) -> Self {
        match err {
            CheckInError::EventNotFound(_) => ApiError::NotFound("Event not found".into()),
            CheckInError::NotFound(msg) => ApiError::NotFound(msg),
            CheckInError::WrongEvent => {
                ApiError::WrongEvent(CheckInError::WrongEvent.to_string())
            }
            CheckInError::Malformed(msg) => ApiError::Malformed(msg),
            CheckInError::Persistence(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {}", field))
                })
            })
            .collect();

        let message = if messages.len() == 1 {
            messages[0].clone()
        } else {
            format!("{} validation errors", messages.len())
        };

        ApiError::Malformed(message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}
