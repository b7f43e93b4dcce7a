/// Registration Orchestrator: validates and persists new accounts
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::{ReferenceStore, UserStore};
use crate::error::{AuthError, Result};
use crate::models::{NewUser, NewVerifyToken, RegisterInput, User, VerifyToken};
use crate::security::SecretHasher;
use crate::validators::{
    mask_email, non_empty, normalize_email, parse_date_of_birth, require_fields, validate_password,
};

pub struct RegistrationService {
    users: Arc<dyn UserStore>,
    reference: Arc<dyn ReferenceStore>,
    hasher: Arc<dyn SecretHasher>,
    clock: Arc<dyn Clock>,
}

impl RegistrationService {
    pub fn new(
        users: Arc<dyn UserStore>,
        reference: Arc<dyn ReferenceStore>,
        hasher: Arc<dyn SecretHasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            reference,
            hasher,
            clock,
        }
    }

    /// Validate input and create the account together with its first
    /// verification entry in one storage write
    ///
    /// `entry_for` receives the new user's id. On any failure neither record
    /// exists, so the client can simply retry.
    pub async fn register<F>(
        &self,
        input: RegisterInput,
        entry_for: F,
    ) -> Result<(User, VerifyToken)>
    where
        F: FnOnce(Uuid) -> NewVerifyToken,
    {
        let new_user = self.prepare(input).await?;
        let entry = entry_for(new_user.id);

        let (user, entry) = self
            .users
            .create_user_with_entry(new_user, entry)
            .await
            .map_err(log_race)?;

        info!(event = "user_registered", user_id = %user.id, email = %mask_email(&user.email));
        Ok((user, entry))
    }

    /// Run every check and build the row to insert
    async fn prepare(&self, input: RegisterInput) -> Result<NewUser> {
        require_fields(&[
            ("firstName", input.first_name.as_str()),
            ("lastName", input.last_name.as_str()),
            ("email", input.email.as_str()),
            ("password", input.password.as_str()),
        ])?;
        validate_password(&input.password)?;

        let email = normalize_email(&input.email);

        let city_id = self.resolve_city(input.city_id).await;
        let gender_id = self.resolve_gender(input.gender_id).await;

        let date_of_birth = non_empty(input.date_of_birth)
            .map(|raw| parse_date_of_birth(&raw))
            .transpose()?;

        if self.users.email_exists(&email).await? {
            warn!(event = "duplicate_email_registration", email = %mask_email(&email));
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.hasher.hash(&input.password)?;

        Ok(NewUser {
            id: Uuid::new_v4(),
            email,
            first_name: input.first_name.trim().to_string(),
            middle_name: non_empty(input.middle_name),
            last_name: input.last_name.trim().to_string(),
            password_hash,
            date_of_birth,
            gender_id,
            city_id,
            invitation_token: non_empty(input.invitation_token),
            created_at: self.clock.now(),
        })
    }

    /// Keep a city id only if it parses and exists; otherwise drop it
    async fn resolve_city(&self, raw: Option<String>) -> Option<i32> {
        let id = parse_reference_id(raw)?;
        match self.reference.find_city(id).await {
            Ok(found) => found.map(|city| city.id),
            Err(e) => {
                warn!(city_id = id, error = %e, "City lookup failed; dropping field");
                None
            }
        }
    }

    async fn resolve_gender(&self, raw: Option<String>) -> Option<i32> {
        let id = parse_reference_id(raw)?;
        match self.reference.find_gender(id).await {
            Ok(found) => found.map(|gender| gender.id),
            Err(e) => {
                warn!(gender_id = id, error = %e, "Gender lookup failed; dropping field");
                None
            }
        }
    }
}

fn log_race(e: AuthError) -> AuthError {
    if matches!(e, AuthError::DuplicateEmail) {
        warn!(event = "duplicate_email_race", "Concurrent registration lost the insert");
    }
    e
}

fn parse_reference_id(raw: Option<String>) -> Option<i32> {
    non_empty(raw)?.parse().ok()
}
