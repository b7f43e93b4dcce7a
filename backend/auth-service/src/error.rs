use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tonic::{metadata::MetadataValue, Code, Status};

/// gRPC metadata key carrying [`AuthError::code`]
pub const ERROR_CODE_METADATA_KEY: &str = "x-error-code";

pub type Result<T> = std::result::Result<T, AuthError>;

/// Every failure the core can report, shared by both transports
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user account is inactive")]
    AccountInactive,

    #[error("user with this email already exists")]
    DuplicateEmail,

    // The three token variants belong to access-guarded calls. VerifyToken
    // reports its reason in the response body and renewal collapses to
    // InvalidRefreshToken, so no current operation returns them.
    #[error("invalid token")]
    TokenInvalid,

    #[error("token has expired")]
    TokenExpired,

    #[error("token type mismatch")]
    TokenKindMismatch,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("invalid verification token")]
    VerificationNotFound,

    #[error("verification token already used")]
    AlreadyUsed,

    #[error("verification token expired")]
    VerificationExpired,

    #[error("invalid OTP code")]
    OtpMismatch,

    #[error("service temporarily unavailable")]
    Unavailable(String),

    #[error("internal server error")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable reason, identical on every transport
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "validation_error",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::AccountInactive => "account_inactive",
            AuthError::DuplicateEmail => "duplicate_email",
            AuthError::TokenInvalid => "token_invalid",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenKindMismatch => "token_kind_mismatch",
            AuthError::InvalidRefreshToken => "invalid_refresh_token",
            AuthError::VerificationNotFound => "verification_not_found",
            AuthError::AlreadyUsed => "already_used",
            AuthError::VerificationExpired => "verification_expired",
            AuthError::OtpMismatch => "otp_mismatch",
            AuthError::Unavailable(_) => "unavailable",
            AuthError::Internal(_) => "internal",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::OtpMismatch => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::TokenInvalid
            | AuthError::TokenExpired
            | AuthError::TokenKindMismatch
            | AuthError::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
            AuthError::AccountInactive => StatusCode::FORBIDDEN,
            AuthError::DuplicateEmail | AuthError::AlreadyUsed => StatusCode::CONFLICT,
            AuthError::VerificationNotFound => StatusCode::NOT_FOUND,
            AuthError::VerificationExpired => StatusCode::GONE,
            AuthError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn grpc_code(&self) -> Code {
        match self {
            AuthError::Validation(_) | AuthError::OtpMismatch => Code::InvalidArgument,
            AuthError::InvalidCredentials
            | AuthError::TokenInvalid
            | AuthError::TokenExpired
            | AuthError::TokenKindMismatch
            | AuthError::InvalidRefreshToken => Code::Unauthenticated,
            AuthError::AccountInactive => Code::PermissionDenied,
            AuthError::DuplicateEmail => Code::AlreadyExists,
            AuthError::VerificationNotFound => Code::NotFound,
            AuthError::AlreadyUsed | AuthError::VerificationExpired => Code::FailedPrecondition,
            AuthError::Unavailable(_) => Code::Unavailable,
            AuthError::Internal(_) => Code::Internal,
        }
    }

    /// Convert to gRPC Status for wire protocol
    ///
    /// Internal details carried by `Unavailable` and `Internal` stay in logs.
    pub fn to_status(&self) -> Status {
        let mut status = Status::new(self.grpc_code(), self.to_string());
        status.metadata_mut().insert(
            ERROR_CODE_METADATA_KEY,
            MetadataValue::from_static(self.code()),
        );
        status
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<AuthError> for Status {
    fn from(err: AuthError) -> Self {
        err.to_status()
    }
}

const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
                && db_err
                    .constraint()
                    .map_or(false, |c| c.contains("email"))
            {
                return AuthError::DuplicateEmail;
            }
        }
        tracing::error!(error = %err, "Database error");
        AuthError::Unavailable(err.to_string())
    }
}
