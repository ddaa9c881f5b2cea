use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed - {0}")]
    Validation(String),

    #[error("User with this email already exist")]
    EmailTaken,

    #[error("Wrong email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("User must log in again")]
    MustReauthenticate,

    #[error("Admin privileges required")]
    Forbidden,

    #[error("User not found")]
    UserNotFound,

    #[error("Ticket not found")]
    TicketNotFound,

    #[error("Ticket already purchased")]
    AlreadyPurchased,

    #[error("Not enough money in balance")]
    InsufficientBalance,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InsufficientBalance => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthorized(_) | Self::MustReauthenticate => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::UserNotFound | Self::TicketNotFound => StatusCode::NOT_FOUND,
            Self::EmailTaken | Self::AlreadyPurchased => StatusCode::CONFLICT,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::EmailTaken => "EMAIL_TAKEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::MustReauthenticate => "MUST_REAUTHENTICATE",
            Self::Forbidden => "FORBIDDEN",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::TicketNotFound => "TICKET_NOT_FOUND",
            Self::AlreadyPurchased => "ALREADY_PURCHASED",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::Store(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            // Internal detail stays in the log.
            tracing::error!(error = %self, "Responding with internal error");
            "Something went wrong".to_string()
        } else {
            tracing::debug!(error = %self, %status, "Request rejected");
            self.to_string()
        };

        let body = ErrorBody {
            code: self.code(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
