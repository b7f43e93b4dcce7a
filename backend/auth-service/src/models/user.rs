use chrono::{DateTime, NaiveDate, Utc};
/// User model
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    /// Stored lowercased
    pub email: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub active: bool,
    pub date_of_birth: Option<NaiveDate>,
    pub gender_id: Option<i32>,
    pub city_id: Option<i32>,
    pub invitation_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated account ready to be persisted
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub password_hash: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender_id: Option<i32>,
    pub city_id: Option<i32>,
    pub invitation_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw registration fields as received from a transport
///
/// City and gender ids arrive as text; ids that are not numeric or do not
/// resolve against reference data are dropped during registration.
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub city_id: Option<String>,
    pub gender_id: Option<String>,
    pub date_of_birth: Option<String>,
    pub invitation_token: Option<String>,
}
