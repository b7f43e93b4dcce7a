//! Storage seams for the auth core
//!
//! The core only talks to these traits. [`PgStore`] backs them with
//! PostgreSQL; [`MemoryStore`] keeps everything in process for tests.

pub mod memory;
pub mod postgres;
pub mod reference;
pub mod users;
pub mod verify_tokens;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{City, Gender, NewUser, NewVerifyToken, User, VerificationPurpose, VerifyToken};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Case-insensitive lookup
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn email_exists(&self, email: &str) -> Result<bool>;

    /// Insert a user; fails with `DuplicateEmail` when the email is taken,
    /// even if a concurrent insert won the race after the caller's pre-check
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Insert a user and its first verification entry atomically
    ///
    /// Either both rows are written or neither is.
    async fn create_user_with_entry(
        &self,
        user: NewUser,
        entry: NewVerifyToken,
    ) -> Result<(User, VerifyToken)>;
}

#[async_trait]
pub trait VerifyTokenStore: Send + Sync {
    async fn create_entry(&self, entry: NewVerifyToken) -> Result<VerifyToken>;

    async fn find_by_token(&self, token: &str) -> Result<Option<VerifyToken>>;

    /// Most recently issued entry for a user and purpose, used or not
    async fn find_latest(
        &self,
        user_id: Uuid,
        purpose: VerificationPurpose,
    ) -> Result<Option<VerifyToken>>;

    /// Mark an entry used only if it is currently unused
    ///
    /// Returns `true` for exactly one caller per entry.
    async fn mark_used(&self, id: Uuid, used_at: DateTime<Utc>) -> Result<bool>;
}

#[async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn find_city(&self, id: i32) -> Result<Option<City>>;

    async fn find_gender(&self, id: i32) -> Result<Option<Gender>>;

    async fn list_provinces(&self) -> Result<Vec<City>>;

    async fn list_wards(&self, province_code: &str) -> Result<Vec<City>>;
}
