/// PostgreSQL-backed implementation of the storage traits
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::{reference, users, verify_tokens, ReferenceStore, UserStore, VerifyTokenStore};
use crate::error::Result;
use crate::models::{City, Gender, NewUser, NewVerifyToken, User, VerificationPurpose, VerifyToken};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded migrations
    pub async fn migrate(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        users::find_by_email(&self.pool, email).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        users::find_by_id(&self.pool, id).await
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        users::email_exists(&self.pool, email).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        users::create_user(&self.pool, &user).await
    }

    async fn create_user_with_entry(
        &self,
        user: NewUser,
        entry: NewVerifyToken,
    ) -> Result<(User, VerifyToken)> {
        let mut tx = self.pool.begin().await?;

        let created = users::create_user(&mut *tx, &user).await?;
        let entry = verify_tokens::create_entry(&mut *tx, &entry).await?;

        tx.commit().await?;
        Ok((created, entry))
    }
}

#[async_trait]
impl VerifyTokenStore for PgStore {
    async fn create_entry(&self, entry: NewVerifyToken) -> Result<VerifyToken> {
        verify_tokens::create_entry(&self.pool, &entry).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<VerifyToken>> {
        verify_tokens::find_by_token(&self.pool, token).await
    }

    async fn find_latest(
        &self,
        user_id: Uuid,
        purpose: VerificationPurpose,
    ) -> Result<Option<VerifyToken>> {
        verify_tokens::find_latest(&self.pool, user_id, purpose).await
    }

    async fn mark_used(&self, id: Uuid, used_at: DateTime<Utc>) -> Result<bool> {
        verify_tokens::mark_used(&self.pool, id, used_at).await
    }
}

#[async_trait]
impl ReferenceStore for PgStore {
    async fn find_city(&self, id: i32) -> Result<Option<City>> {
        reference::find_city(&self.pool, id).await
    }

    async fn find_gender(&self, id: i32) -> Result<Option<Gender>> {
        reference::find_gender(&self.pool, id).await
    }

    async fn list_provinces(&self) -> Result<Vec<City>> {
        reference::list_provinces(&self.pool).await
    }

    async fn list_wards(&self, province_code: &str) -> Result<Vec<City>> {
        reference::list_wards(&self.pool, province_code).await
    }
}
