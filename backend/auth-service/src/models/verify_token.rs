/// Verification ledger entries
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// What a verification entry proves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationPurpose {
    EmailVerification,
}

impl VerificationPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationPurpose::EmailVerification => "email_verification",
        }
    }
}

impl fmt::Display for VerificationPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationPurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email_verification" => Ok(VerificationPurpose::EmailVerification),
            other => Err(format!("unknown verification type: {}", other)),
        }
    }
}

/// One-time proof of email ownership
///
/// `is_used` only ever moves from false to true. Entries are never deleted.
#[derive(Debug, Clone)]
pub struct VerifyToken {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Opaque handle given to the client
    pub token: String,
    /// Six-digit code delivered out of band
    pub otp_code: String,
    pub purpose: VerificationPurpose,
    pub is_used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl VerifyToken {
    /// Expired once `now` is strictly past `expires_at`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct NewVerifyToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub otp_code: String,
    pub purpose: VerificationPurpose,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
