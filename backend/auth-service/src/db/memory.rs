/// In-process implementation of the storage traits
///
/// Holds the same guarantees the PostgreSQL schema enforces: case-insensitive
/// email uniqueness checked atomically with the insert, unique handles, and a
/// compare-and-swap `mark_used`.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{ReferenceStore, UserStore, VerifyTokenStore};
use crate::error::{AuthError, Result};
use crate::models::reference::CITY_TYPE_PROVINCE;
use crate::models::{City, Gender, NewUser, NewVerifyToken, User, VerificationPurpose, VerifyToken};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    /// Insertion order doubles as the tie-breaker for equal `created_at`
    entries: Mutex<Vec<VerifyToken>>,
    cities: RwLock<Vec<City>>,
    genders: RwLock<Vec<Gender>>,
    /// When set, every verification entry write fails as `Unavailable`
    reject_entries: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_city(&self, city: City) {
        self.cities.write().await.push(city);
    }

    pub async fn add_gender(&self, gender: Gender) {
        self.genders.write().await.push(gender);
    }

    /// Toggle the active flag, as an administrator would
    pub async fn set_active(&self, user_id: Uuid, active: bool) -> bool {
        match self.users.write().await.get_mut(&user_id) {
            Some(user) => {
                user.active = active;
                true
            }
            None => false,
        }
    }

    /// Make verification entry writes fail, as a lost database would
    pub fn reject_entry_writes(&self, reject: bool) {
        self.reject_entries.store(reject, Ordering::SeqCst);
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Every entry ever issued for a user, oldest first
    pub async fn entries_for(&self, user_id: Uuid) -> Vec<VerifyToken> {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;
        ensure_email_free(&users, &user.email)?;

        let created = user_record(user);
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn create_user_with_entry(
        &self,
        user: NewUser,
        entry: NewVerifyToken,
    ) -> Result<(User, VerifyToken)> {
        // Lock order: users, then entries
        let mut users = self.users.write().await;
        let mut entries = self.entries.lock().await;

        ensure_email_free(&users, &user.email)?;
        self.ensure_entry_insertable(&entries, &entry)?;

        let created = user_record(user);
        let entry = entry_record(entry);
        users.insert(created.id, created.clone());
        entries.push(entry.clone());
        Ok((created, entry))
    }
}

#[async_trait]
impl VerifyTokenStore for MemoryStore {
    async fn create_entry(&self, entry: NewVerifyToken) -> Result<VerifyToken> {
        let mut entries = self.entries.lock().await;
        self.ensure_entry_insertable(&entries, &entry)?;

        let created = entry_record(entry);
        entries.push(created.clone());
        Ok(created)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<VerifyToken>> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .find(|e| e.token == token)
            .cloned())
    }

    async fn find_latest(
        &self,
        user_id: Uuid,
        purpose: VerificationPurpose,
    ) -> Result<Option<VerifyToken>> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .enumerate()
            .filter(|(_, e)| e.user_id == user_id && e.purpose == purpose)
            .max_by_key(|(seq, e)| (e.created_at, *seq))
            .map(|(_, e)| e.clone()))
    }

    async fn mark_used(&self, id: Uuid, used_at: DateTime<Utc>) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        match entries.iter_mut().find(|e| e.id == id && !e.is_used) {
            Some(entry) => {
                entry.is_used = true;
                entry.used_at = Some(used_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn find_city(&self, id: i32) -> Result<Option<City>> {
        Ok(self.cities.read().await.iter().find(|c| c.id == id).cloned())
    }

    async fn find_gender(&self, id: i32) -> Result<Option<Gender>> {
        Ok(self.genders.read().await.iter().find(|g| g.id == id).cloned())
    }

    async fn list_provinces(&self) -> Result<Vec<City>> {
        let mut provinces: Vec<City> = self
            .cities
            .read()
            .await
            .iter()
            .filter(|c| c.kind == CITY_TYPE_PROVINCE)
            .cloned()
            .collect();
        provinces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(provinces)
    }

    async fn list_wards(&self, province_code: &str) -> Result<Vec<City>> {
        let mut wards: Vec<City> = self
            .cities
            .read()
            .await
            .iter()
            .filter(|c| c.kind != CITY_TYPE_PROVINCE)
            .filter(|c| c.province_code.as_deref() == Some(province_code))
            .cloned()
            .collect();
        wards.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(wards)
    }
}

impl MemoryStore {
    fn ensure_entry_insertable(
        &self,
        entries: &[VerifyToken],
        entry: &NewVerifyToken,
    ) -> Result<()> {
        if self.reject_entries.load(Ordering::SeqCst) {
            return Err(AuthError::Unavailable(
                "verification entry writes rejected".to_string(),
            ));
        }
        if entries.iter().any(|e| e.token == entry.token) {
            return Err(AuthError::Internal(
                "verification token collision".to_string(),
            ));
        }
        Ok(())
    }
}

fn ensure_email_free(users: &HashMap<Uuid, User>, email: &str) -> Result<()> {
    let email = email.to_lowercase();
    if users.values().any(|u| u.email.to_lowercase() == email) {
        return Err(AuthError::DuplicateEmail);
    }
    Ok(())
}

fn user_record(user: NewUser) -> User {
    User {
        id: user.id,
        email: user.email,
        first_name: user.first_name,
        middle_name: user.middle_name,
        last_name: user.last_name,
        password_hash: user.password_hash,
        active: true,
        date_of_birth: user.date_of_birth,
        gender_id: user.gender_id,
        city_id: user.city_id,
        invitation_token: user.invitation_token,
        created_at: user.created_at,
        updated_at: user.created_at,
    }
}

fn entry_record(entry: NewVerifyToken) -> VerifyToken {
    VerifyToken {
        id: entry.id,
        user_id: entry.user_id,
        token: entry.token,
        otp_code: entry.otp_code,
        purpose: entry.purpose,
        is_used: false,
        expires_at: entry.expires_at,
        created_at: entry.created_at,
        used_at: None,
    }
}
