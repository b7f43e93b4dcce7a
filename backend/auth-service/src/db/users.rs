/// User database operations
use crate::error::Result;
use crate::models::{NewUser, User};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, first_name, middle_name, last_name, password_hash, active, \
     date_of_birth, gender_id, city_id, invitation_token, created_at, updated_at";

/// Find user by email, ignoring case
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn find_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
    )
    .bind(email)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Create a new user
///
/// A concurrent insert of the same email trips `idx_users_email_lower` and
/// surfaces as `AuthError::DuplicateEmail`.
pub async fn create_user<'e, E>(executor: E, user: &NewUser) -> Result<User>
where
    E: PgExecutor<'e>,
{
    let created = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (
            id, email, first_name, middle_name, last_name, password_hash, active,
            date_of_birth, gender_id, city_id, invitation_token, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $8, $9, $10, $11, $11)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.middle_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.date_of_birth)
    .bind(user.gender_id)
    .bind(user.city_id)
    .bind(&user.invitation_token)
    .bind(user.created_at)
    .fetch_one(executor)
    .await?;

    Ok(created)
}
