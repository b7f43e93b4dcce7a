//! Verification Ledger
//!
//! Entry lifecycle:
//!
//! ```text
//! Unused --consume (OTP matches, live)--> Used
//! Unused --TTL elapses or resend--------> dead (checked at read time, never stored)
//! ```
//!
//! An entry is live only while it is unused, unexpired and the newest entry
//! for its `(user, purpose)`. Resend inserts a new entry instead of touching
//! the old one, so every entry ever issued stays in storage.

use chrono::Duration;
use crypto_core::otp::{codes_match, generate_handle, generate_otp};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::VerifyTokenStore;
use crate::error::{AuthError, Result};
use crate::models::{NewVerifyToken, VerificationPurpose, VerifyToken};
use crate::validators::require_fields;

pub const VERIFICATION_TTL_MINUTES: i64 = 15;

pub struct VerificationLedger {
    store: Arc<dyn VerifyTokenStore>,
    clock: Arc<dyn Clock>,
}

impl VerificationLedger {
    pub fn new(store: Arc<dyn VerifyTokenStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Build an unsaved entry valid for 15 minutes from now
    ///
    /// Lets a caller persist the entry in the same write as other records.
    pub fn draft(&self, user_id: Uuid, purpose: VerificationPurpose) -> NewVerifyToken {
        let now = self.clock.now();
        NewVerifyToken {
            id: Uuid::new_v4(),
            user_id,
            token: generate_handle(),
            otp_code: generate_otp(),
            purpose,
            expires_at: now + Duration::minutes(VERIFICATION_TTL_MINUTES),
            created_at: now,
        }
    }

    /// Create a fresh unused entry valid for 15 minutes
    pub async fn issue(&self, user_id: Uuid, purpose: VerificationPurpose) -> Result<VerifyToken> {
        let entry = self.store.create_entry(self.draft(user_id, purpose)).await?;

        info!(
            event = "verification_issued",
            user_id = %user_id,
            purpose = %purpose,
            expires_at = %entry.expires_at
        );
        Ok(entry)
    }

    /// Exchange a handle and OTP for the bound user id
    ///
    /// Of any number of concurrent calls with the same handle and correct OTP,
    /// exactly one succeeds; the rest fail with `AlreadyUsed`.
    pub async fn consume(&self, handle: &str, otp: &str) -> Result<Uuid> {
        require_fields(&[("verificationToken", handle), ("otp", otp)])?;

        let entry = self.live_entry(handle).await?;

        if !codes_match(&entry.otp_code, otp) {
            warn!(event = "verification_otp_mismatch", user_id = %entry.user_id);
            return Err(AuthError::OtpMismatch);
        }

        if !self.store.mark_used(entry.id, self.clock.now()).await? {
            warn!(event = "verification_lost_race", user_id = %entry.user_id);
            return Err(AuthError::AlreadyUsed);
        }

        info!(event = "verification_consumed", user_id = %entry.user_id);
        Ok(entry.user_id)
    }

    /// Replace a live entry with a new one for the same user and purpose
    ///
    /// Used, expired and superseded handles cannot be resent and create
    /// nothing.
    pub async fn resend(&self, handle: &str) -> Result<VerifyToken> {
        require_fields(&[("verificationToken", handle)])?;

        let entry = self.live_entry(handle).await?;
        self.issue(entry.user_id, entry.purpose).await
    }

    /// Look up an entry and fail unless it is live
    ///
    /// Check order: unknown, used, expired, superseded.
    pub async fn live_entry(&self, handle: &str) -> Result<VerifyToken> {
        let entry = self
            .store
            .find_by_token(handle)
            .await?
            .ok_or(AuthError::VerificationNotFound)?;

        if entry.is_used {
            return Err(AuthError::AlreadyUsed);
        }

        if entry.is_expired(self.clock.now()) {
            return Err(AuthError::VerificationExpired);
        }

        let latest = self.store.find_latest(entry.user_id, entry.purpose).await?;
        if latest.map_or(false, |latest| latest.id != entry.id) {
            return Err(AuthError::VerificationExpired);
        }

        Ok(entry)
    }
}
