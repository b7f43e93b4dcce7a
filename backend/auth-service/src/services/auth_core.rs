/// Transport-agnostic entry point for every auth operation
///
/// The HTTP and gRPC adapters hold an `Arc<AuthCore>` and do nothing but
/// marshal requests into these calls and results back out.
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::{ReferenceStore, UserStore, VerifyTokenStore};
use crate::error::{AuthError, Result};
use crate::models::{City, RegisterInput, User, VerificationPurpose};
use crate::security::{CredentialCodec, SecretHasher};
use crate::services::credentials::{
    AccessCheck, CredentialIssuer, IssuedCredentials, RenewedCredentials,
};
use crate::services::email::VerificationNotifier;
use crate::services::registration::RegistrationService;
use crate::services::verification::VerificationLedger;
use crate::validators::mask_email;

pub const MSG_REGISTERED: &str = "User registered successfully";
pub const MSG_EMAIL_VERIFIED: &str = "Email verified successfully";
pub const MSG_OTP_SENT: &str = "OTP sent successfully";

/// Result of a successful sign-up
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: User,
    /// Handle of the first verification entry
    pub verification_token: String,
}

pub struct AuthCore {
    registration: RegistrationService,
    credentials: CredentialIssuer,
    ledger: VerificationLedger,
    users: Arc<dyn UserStore>,
    reference: Arc<dyn ReferenceStore>,
    notifier: Arc<dyn VerificationNotifier>,
}

impl AuthCore {
    /// Wire the core over a single store implementing every storage seam
    pub fn new<S>(
        store: Arc<S>,
        codec: CredentialCodec,
        hasher: Arc<dyn SecretHasher>,
        notifier: Arc<dyn VerificationNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self>
    where
        S: UserStore + VerifyTokenStore + ReferenceStore + 'static,
    {
        let users: Arc<dyn UserStore> = store.clone();
        let entries: Arc<dyn VerifyTokenStore> = store.clone();
        let reference: Arc<dyn ReferenceStore> = store;

        Ok(Self {
            registration: RegistrationService::new(
                users.clone(),
                reference.clone(),
                hasher.clone(),
                clock.clone(),
            ),
            credentials: CredentialIssuer::new(users.clone(), hasher, codec, clock.clone())?,
            ledger: VerificationLedger::new(entries, clock),
            users,
            reference,
            notifier,
        })
    }

    /// Register, issue the first verification entry and send its code
    ///
    /// A delivery failure is logged only; the account exists and the client
    /// can ask for a resend with the returned handle.
    pub async fn sign_up(&self, input: RegisterInput) -> Result<SignUpOutcome> {
        // Account and first entry land together or not at all
        let (user, entry) = self
            .registration
            .register(input, |user_id| {
                self.ledger
                    .draft(user_id, VerificationPurpose::EmailVerification)
            })
            .await?;
        info!(
            event = "verification_issued",
            user_id = %user.id,
            purpose = %entry.purpose,
            expires_at = %entry.expires_at
        );

        self.deliver(&user.email, &entry.otp_code).await;

        Ok(SignUpOutcome {
            user,
            verification_token: entry.token,
        })
    }

    pub async fn sign_in(&self, identifier: &str, password: &str) -> Result<IssuedCredentials> {
        self.credentials.sign_in(identifier, password).await
    }

    pub fn verify_access_token(&self, token: &str) -> AccessCheck {
        self.credentials.check_access(token)
    }

    pub fn renew_access_token(&self, refresh_token: &str) -> Result<RenewedCredentials> {
        self.credentials.renew(refresh_token)
    }

    pub async fn verify_email(&self, handle: &str, otp: &str) -> Result<Uuid> {
        self.ledger.consume(handle, otp).await
    }

    /// Replace a live handle and send the new code; returns the new handle
    pub async fn resend_otp(&self, handle: &str) -> Result<String> {
        let entry = self.ledger.resend(handle).await?;

        match self.users.find_by_id(entry.user_id).await? {
            Some(user) => self.deliver(&user.email, &entry.otp_code).await,
            None => error!(user_id = %entry.user_id, "Verification entry has no owning user"),
        }

        Ok(entry.token)
    }

    pub async fn provinces(&self) -> Result<Vec<City>> {
        self.reference.list_provinces().await
    }

    pub async fn wards(&self, province_code: &str) -> Result<Vec<City>> {
        if province_code.trim().is_empty() {
            return Err(AuthError::Validation("provinceCode is required".to_string()));
        }
        self.reference.list_wards(province_code.trim()).await
    }

    async fn deliver(&self, email: &str, otp: &str) {
        if let Err(e) = self.notifier.send_verification_code(email, otp).await {
            warn!(
                event = "verification_delivery_failed",
                email = %mask_email(email),
                error = %e,
                "Verification code could not be delivered"
            );
        }
    }
}
