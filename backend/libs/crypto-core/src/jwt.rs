/// Credential codec for access and refresh tokens
///
/// Tokens are HS256 JWTs carrying a subject, issue/expiry timestamps and an
/// explicit `type` claim. Access tokens also carry the subject's email.
///
/// ## Security Design
///
/// - **HS256 ONLY**: any other `alg` header is rejected as a signature failure,
///   including `none` and other HMAC variants
/// - **Kind binding**: a refresh token is never accepted where an access token
///   is expected and vice versa, even with a valid signature
/// - **Injected key**: the codec owns its key material; it never reads the
///   environment, so callers construct it once at startup and share it
///
/// ## Usage
///
/// ```rust
/// use chrono::Utc;
/// use crypto_core::jwt::{CredentialCodec, TokenKind};
/// use uuid::Uuid;
///
/// let codec = CredentialCodec::new(b"0123456789abcdef0123456789abcdef");
/// let now = Utc::now();
/// let user_id = Uuid::new_v4();
///
/// let token = codec.issue(user_id, "a@x.com", TokenKind::Access, now).unwrap();
/// let verified = codec.verify(&token, TokenKind::Access, now).unwrap();
/// assert_eq!(verified.subject, user_id);
/// ```
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Access token lifetime (1 hour)
pub const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

/// Refresh token lifetime (7 days)
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;

/// Shortest signing secret accepted by configuration loaders
pub const MIN_SECRET_LEN: usize = 32;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;
const JWT_ALGORITHM_NAME: &str = "HS256";

// ============================================================================
// Data Structures
// ============================================================================

/// Kind discriminator embedded in every token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }

    /// Lifetime of a token of this kind
    pub fn ttl(&self) -> Duration {
        match self {
            TokenKind::Access => Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            TokenKind::Refresh => Duration::seconds(REFRESH_TOKEN_TTL_SECS),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token kind: "access" or "refresh"
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Email address, present on access tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A token that passed signature, kind, shape and expiry checks
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub subject: Uuid,
    pub claims: Claims,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    Expired,

    #[error("token kind mismatch: expected {expected}, found {found}")]
    KindMismatch { expected: TokenKind, found: TokenKind },

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("failed to encode token: {0}")]
    Encoding(String),
}

// ============================================================================
// Codec
// ============================================================================

/// Signs and verifies credentials with a single process-wide secret
#[derive(Clone)]
pub struct CredentialCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCodec")
            .field("algorithm", &JWT_ALGORITHM_NAME)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl CredentialCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a signed token of `kind` for `subject`, valid from `now` for the kind's TTL
    ///
    /// `email` is embedded for access tokens and dropped for refresh tokens.
    pub fn issue(
        &self,
        subject: Uuid,
        email: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + kind.ttl()).timestamp(),
            kind,
            email: match kind {
                TokenKind::Access => Some(email.to_string()),
                TokenKind::Refresh => None,
            },
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify `token` as a credential of kind `expected` at instant `now`
    ///
    /// Checks run in a fixed order: algorithm and signature, kind, claim
    /// shape (email for access tokens, then subject id), and expiry last. A
    /// wrong-kind or malformed token is therefore reported as such whether or
    /// not it has also expired.
    pub fn verify(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<VerifiedToken, TokenError> {
        ensure_expected_algorithm(token)?;

        let mut validation = Validation::new(JWT_ALGORITHM);
        // Expiry is checked against the caller's clock below
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = ["exp", "sub"].iter().map(|c| c.to_string()).collect();

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(classify_decode_error)?
            .claims;

        if claims.kind != expected {
            return Err(TokenError::KindMismatch {
                expected,
                found: claims.kind,
            });
        }

        if expected == TokenKind::Access && claims.email.is_none() {
            return Err(TokenError::Malformed(
                "access token is missing the email claim".to_string(),
            ));
        }

        let subject = Uuid::parse_str(&claims.sub)
            .map_err(|_| TokenError::Malformed("subject is not a valid id".to_string()))?;

        if now.timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(VerifiedToken { subject, claims })
    }
}

/// Reject tokens whose header names any algorithm other than HS256
///
/// `jsonwebtoken` cannot parse headers with unknown algorithms such as `none`,
/// which would otherwise surface as a generic parse error.
fn ensure_expected_algorithm(token: &str) -> Result<(), TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Malformed(
            "token must have three segments".to_string(),
        ));
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(segments[0])
        .map_err(|_| TokenError::Malformed("header is not valid base64url".to_string()))?;
    let header: serde_json::Value = serde_json::from_slice(&header_bytes)
        .map_err(|_| TokenError::Malformed("header is not valid JSON".to_string()))?;

    match header.get("alg").and_then(|alg| alg.as_str()) {
        Some(JWT_ALGORITHM_NAME) => Ok(()),
        Some(_) => Err(TokenError::SignatureInvalid),
        None => Err(TokenError::Malformed(
            "header has no algorithm".to_string(),
        )),
    }
}

fn classify_decode_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::InvalidKeyFormat => TokenError::SignatureInvalid,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed(err.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================
