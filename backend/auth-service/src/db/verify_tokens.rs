/// Verification ledger database operations
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::models::{NewVerifyToken, VerificationPurpose, VerifyToken};

const ENTRY_COLUMNS: &str =
    "id, user_id, token, otp_code, verification_type, is_used, expires_at, created_at, used_at";

#[derive(FromRow)]
struct VerifyTokenRow {
    id: Uuid,
    user_id: Uuid,
    token: String,
    otp_code: String,
    verification_type: String,
    is_used: bool,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
}

impl TryFrom<VerifyTokenRow> for VerifyToken {
    type Error = AuthError;

    fn try_from(row: VerifyTokenRow) -> Result<Self> {
        let purpose = row
            .verification_type
            .parse::<VerificationPurpose>()
            .map_err(AuthError::Internal)?;

        Ok(VerifyToken {
            id: row.id,
            user_id: row.user_id,
            token: row.token,
            otp_code: row.otp_code,
            purpose,
            is_used: row.is_used,
            expires_at: row.expires_at,
            created_at: row.created_at,
            used_at: row.used_at,
        })
    }
}

pub async fn create_entry<'e, E>(executor: E, entry: &NewVerifyToken) -> Result<VerifyToken>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, VerifyTokenRow>(&format!(
        r#"
        INSERT INTO verify_tokens (id, user_id, token, otp_code, verification_type, is_used, expires_at, created_at)
        VALUES ($1, $2, $3, $4, $5, FALSE, $6, $7)
        RETURNING {ENTRY_COLUMNS}
        "#
    ))
    .bind(entry.id)
    .bind(entry.user_id)
    .bind(&entry.token)
    .bind(&entry.otp_code)
    .bind(entry.purpose.as_str())
    .bind(entry.expires_at)
    .bind(entry.created_at)
    .fetch_one(executor)
    .await?;

    row.try_into()
}

pub async fn find_by_token(pool: &PgPool, token: &str) -> Result<Option<VerifyToken>> {
    sqlx::query_as::<_, VerifyTokenRow>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM verify_tokens WHERE token = $1"
    ))
    .bind(token)
    .fetch_optional(pool)
    .await?
    .map(VerifyToken::try_from)
    .transpose()
}

/// Newest entry for a user and purpose; `seq` breaks ties on `created_at`
pub async fn find_latest(
    pool: &PgPool,
    user_id: Uuid,
    purpose: VerificationPurpose,
) -> Result<Option<VerifyToken>> {
    sqlx::query_as::<_, VerifyTokenRow>(&format!(
        r#"
        SELECT {ENTRY_COLUMNS} FROM verify_tokens
        WHERE user_id = $1 AND verification_type = $2
        ORDER BY created_at DESC, seq DESC
        LIMIT 1
        "#
    ))
    .bind(user_id)
    .bind(purpose.as_str())
    .fetch_optional(pool)
    .await?
    .map(VerifyToken::try_from)
    .transpose()
}

/// Mark an entry used if and only if it is still unused
///
/// The conditional UPDATE is the compare-and-swap: of any number of
/// concurrent callers, exactly one sees a row affected.
pub async fn mark_used(pool: &PgPool, id: Uuid, used_at: DateTime<Utc>) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE verify_tokens
        SET is_used = TRUE, used_at = $2
        WHERE id = $1 AND is_used = FALSE
        "#,
    )
    .bind(id)
    .bind(used_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
