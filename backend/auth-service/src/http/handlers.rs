/// HTTP handlers: JSON in, `AuthCore` call, JSON out
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::models::{City, RegisterInput};
use crate::services::auth_core::{MSG_EMAIL_VERIFIED, MSG_OTP_SENT, MSG_REGISTERED};
use crate::services::AuthCore;

type CoreState = State<Arc<AuthCore>>;

/// Unwrap a JSON body, reporting malformed input as a validation error
fn body<T: DeserializeOwned>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| AuthError::Validation(rejection.body_text()))
}

/// Reference ids may be sent as JSON numbers or strings
fn id_as_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdField {
        Number(i64),
        Text(String),
    }

    Ok(Option::<IdField>::deserialize(deserializer)?.map(|field| match field {
        IdField::Number(n) => n.to_string(),
        IdField::Text(s) => s,
    }))
}

// ============================================================================
// Sign-up
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignUpBody {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(deserialize_with = "id_as_text")]
    pub city_id: Option<String>,
    #[serde(deserialize_with = "id_as_text")]
    pub gender_id: Option<String>,
    #[serde(alias = "dateOfBirth")]
    pub dob: Option<String>,
    pub invitation_token: Option<String>,
}

impl From<SignUpBody> for RegisterInput {
    fn from(body: SignUpBody) -> Self {
        RegisterInput {
            first_name: body.first_name,
            middle_name: body.middle_name,
            last_name: body.last_name,
            email: body.email,
            password: body.password,
            city_id: body.city_id,
            gender_id: body.gender_id,
            date_of_birth: body.dob,
            invitation_token: body.invitation_token,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub message: String,
    pub verification_token: String,
}

pub async fn sign_up(
    State(core): CoreState,
    payload: std::result::Result<Json<SignUpBody>, JsonRejection>,
) -> Result<(StatusCode, Json<SignUpResponse>)> {
    let outcome = core.sign_up(body(payload)?.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            user_id: outcome.user.id,
            email: outcome.user.email,
            first_name: outcome.user.first_name,
            last_name: outcome.user.last_name,
            message: MSG_REGISTERED.to_string(),
            verification_token: outcome.verification_token,
        }),
    ))
}

// ============================================================================
// Credentials
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignInBody {
    #[serde(alias = "userName", alias = "email")]
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user_id: Uuid,
    pub identifier: String,
}

pub async fn sign_in(
    State(core): CoreState,
    payload: std::result::Result<Json<SignInBody>, JsonRejection>,
) -> Result<Json<SignInResponse>> {
    let req = body(payload)?;
    let issued = core.sign_in(&req.identifier, &req.password).await?;

    Ok(Json(SignInResponse {
        access_token: issued.access_token,
        refresh_token: issued.refresh_token,
        expires_in: issued.expires_in,
        user_id: issued.user_id,
        identifier: issued.identifier,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyAccessTokenQuery {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyAccessTokenResponse {
    pub valid: bool,
    pub message: String,
}

/// Always 200; validity is reported in the body
pub async fn verify_access_token(
    State(core): CoreState,
    Query(query): Query<VerifyAccessTokenQuery>,
) -> Json<VerifyAccessTokenResponse> {
    let check = core.verify_access_token(&query.token);
    Json(VerifyAccessTokenResponse {
        valid: check.valid,
        message: check.message,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenewAccessTokenBody {
    #[serde(alias = "vrto")]
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewAccessTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

pub async fn renew_access_token(
    State(core): CoreState,
    payload: std::result::Result<Json<RenewAccessTokenBody>, JsonRejection>,
) -> Result<Json<RenewAccessTokenResponse>> {
    let req = body(payload)?;
    let renewed = core.renew_access_token(&req.refresh_token)?;

    Ok(Json(RenewAccessTokenResponse {
        access_token: renewed.access_token,
        refresh_token: renewed.refresh_token,
        expires_in: renewed.expires_in,
    }))
}

// ============================================================================
// Email verification
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyMailBody {
    #[serde(alias = "token")]
    pub verification_token: String,
    #[serde(alias = "verificationOTPCode")]
    pub otp: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyMailResponse {
    pub message: String,
    pub user_id: Uuid,
}

pub async fn verify_mail(
    State(core): CoreState,
    payload: std::result::Result<Json<VerifyMailBody>, JsonRejection>,
) -> Result<Json<VerifyMailResponse>> {
    let req = body(payload)?;
    let user_id = core.verify_email(&req.verification_token, &req.otp).await?;

    Ok(Json(VerifyMailResponse {
        message: MSG_EMAIL_VERIFIED.to_string(),
        user_id,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResendOtpBody {
    #[serde(alias = "token")]
    pub verification_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendOtpResponse {
    pub message: String,
    pub verification_token: String,
}

pub async fn resend_otp(
    State(core): CoreState,
    payload: std::result::Result<Json<ResendOtpBody>, JsonRejection>,
) -> Result<Json<ResendOtpResponse>> {
    let req = body(payload)?;
    let verification_token = core.resend_otp(&req.verification_token).await?;

    Ok(Json(ResendOtpResponse {
        message: MSG_OTP_SENT.to_string(),
        verification_token,
    }))
}

// ============================================================================
// Reference data
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CitiesResponse {
    pub cities: Vec<City>,
}

pub async fn provinces(State(core): CoreState) -> Result<Json<CitiesResponse>> {
    Ok(Json(CitiesResponse {
        cities: core.provinces().await?,
    }))
}

pub async fn wards(
    State(core): CoreState,
    Path(province_code): Path<String>,
) -> Result<Json<CitiesResponse>> {
    Ok(Json(CitiesResponse {
        cities: core.wards(&province_code).await?,
    }))
}
