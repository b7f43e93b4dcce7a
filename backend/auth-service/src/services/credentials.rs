/// Credential Issuer: sign-in, renewal and advisory access checks
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::UserStore;
use crate::error::{AuthError, Result};
use crate::security::{
    CredentialCodec, SecretHasher, TokenError, TokenKind, ACCESS_TOKEN_TTL_SECS,
};
use crate::validators::{mask_email, normalize_email, require_fields};

/// Plaintext run against the dummy hash when the identifier is unknown
const DUMMY_PASSWORD: &str = "dummy-password-for-timing";

/// Result of a successful sign-in
#[derive(Debug, Clone)]
pub struct IssuedCredentials {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user_id: Uuid,
    pub identifier: String,
}

/// Result of a successful renewal; `refresh_token` is the one presented
#[derive(Debug, Clone)]
pub struct RenewedCredentials {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCheck {
    pub valid: bool,
    pub message: String,
}

pub struct CredentialIssuer {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn SecretHasher>,
    codec: CredentialCodec,
    clock: Arc<dyn Clock>,
    /// Verified against on unknown identifiers so both failure paths cost one hash
    dummy_hash: String,
}

impl CredentialIssuer {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn SecretHasher>,
        codec: CredentialCodec,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;
        Ok(Self {
            users,
            hasher,
            codec,
            clock,
            dummy_hash,
        })
    }

    /// Exchange an email and password for an access/refresh pair
    ///
    /// Unknown identifiers and wrong passwords both fail with
    /// `InvalidCredentials`.
    pub async fn sign_in(&self, identifier: &str, password: &str) -> Result<IssuedCredentials> {
        require_fields(&[("identifier", identifier), ("password", password)])?;

        let email = normalize_email(identifier);
        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                let _ = self.hasher.verify(password, &self.dummy_hash);
                warn!(event = "login_failed_user_not_found", email = %mask_email(&email));
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !user.active {
            warn!(event = "login_failed_inactive", user_id = %user.id);
            return Err(AuthError::AccountInactive);
        }

        match self.hasher.verify(password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                warn!(event = "login_failed_wrong_password", user_id = %user.id);
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                warn!(
                    event = "login_failed_bad_hash",
                    user_id = %user.id,
                    error = %e,
                    "Stored password material could not be parsed"
                );
                return Err(AuthError::InvalidCredentials);
            }
        }

        let now = self.clock.now();
        let access_token = self
            .codec
            .issue(user.id, &user.email, TokenKind::Access, now)
            .map_err(signing_failed)?;
        let refresh_token = self
            .codec
            .issue(user.id, &user.email, TokenKind::Refresh, now)
            .map_err(signing_failed)?;

        info!(event = "login_success", user_id = %user.id);

        Ok(IssuedCredentials {
            access_token,
            refresh_token,
            expires_in: ACCESS_TOKEN_TTL_SECS,
            user_id: user.id,
            identifier: user.email,
        })
    }

    /// Mint a new access token from a refresh token
    ///
    /// Refresh tokens carry no email, so the new access token's email claim
    /// is empty. The presented refresh token is returned as-is.
    pub fn renew(&self, refresh_token: &str) -> Result<RenewedCredentials> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidRefreshToken);
        }

        let now = self.clock.now();
        let verified = self
            .codec
            .verify(refresh_token, TokenKind::Refresh, now)
            .map_err(|e| {
                debug!(error = %e, "Refresh token rejected");
                AuthError::InvalidRefreshToken
            })?;

        let access_token = self
            .codec
            .issue(
                verified.subject,
                verified.claims.email.as_deref().unwrap_or_default(),
                TokenKind::Access,
                now,
            )
            .map_err(signing_failed)?;

        debug!(event = "access_token_renewed", user_id = %verified.subject);

        Ok(RenewedCredentials {
            access_token,
            refresh_token: refresh_token.to_string(),
            expires_in: ACCESS_TOKEN_TTL_SECS,
        })
    }

    /// Advisory validity check; never fails
    pub fn check_access(&self, token: &str) -> AccessCheck {
        if token.trim().is_empty() {
            return AccessCheck {
                valid: false,
                message: "Token is required".to_string(),
            };
        }

        match self.codec.verify(token, TokenKind::Access, self.clock.now()) {
            Ok(_) => AccessCheck {
                valid: true,
                message: "Token is valid".to_string(),
            },
            Err(e) => AccessCheck {
                valid: false,
                message: format!("Invalid token: {}", e),
            },
        }
    }
}

/// Minting only fails on a broken key or serializer
fn signing_failed(err: TokenError) -> AuthError {
    AuthError::Internal(err.to_string())
}
