use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Application error kinds. Every core operation resolves to one of these;
/// the HTTP layer maps them to status codes and the response envelope.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input or constraint violation (400).
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired credential, or wrong password (401).
    #[error("{0}")]
    Authentication(String),

    /// Authenticated but the role is not allowed (403).
    #[error("{0}")]
    Authorization(String),

    /// Referenced resource or account does not exist (404).
    #[error("{0}")]
    NotFound(String),

    /// An external notification could not be delivered (500).
    #[error("{0}")]
    Dispatch(String),

    /// Anything unclassified (500). Client gets a generic message,
    /// full detail goes to the operator log.
    #[error("{0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch(msg.into())
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Message safe to show to a client.
    pub fn public_message(&self) -> &str {
        match self {
            Self::Unexpected(_) => "Something went very wrong!",
            Self::Validation(m)
            | Self::Authentication(m)
            | Self::Authorization(m)
            | Self::NotFound(m)
            | Self::Dispatch(m) => m,
        }
    }

    /// "fail" for client errors, "error" for server errors.
    fn status_label(&self) -> &'static str {
        if self.status_code().is_client_error() {
            "fail"
        } else {
            "error"
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Dispatch(_) | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let Self::Unexpected(detail) = self {
            log::error!("unexpected error: {}", detail);
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "status": self.status_label(),
            "message": self.public_message(),
        }))
    }
}

impl From<deadpool_postgres::PoolError> for AppError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Unexpected(format!("database pool error: {}", err))
    }
}

impl From<tokio_postgres::Error> for AppError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::Unexpected(format!("database error: {}", err))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::Unexpected(format!("password hashing error: {}", err))
    }
}
