/// gRPC service implementation for Auth Service
///
/// Every RPC marshals into an [`AuthCore`] call; failures become a
/// `tonic::Status` through `AuthError::to_status`.
use std::sync::Arc;
use tonic::{Request, Response, Status};

use crate::models::{City as CityRecord, RegisterInput};
use crate::services::auth_core::{MSG_EMAIL_VERIFIED, MSG_OTP_SENT, MSG_REGISTERED};
use crate::services::AuthCore;

// Import generated protobuf types
pub mod auth {
    pub mod v1 {
        tonic::include_proto!("auth.v1");
    }
}

use auth::v1::auth_service_server::AuthService;
pub use auth::v1::auth_service_server::AuthServiceServer;
use auth::v1::*;

/// gRPC AuthService implementation
#[derive(Clone)]
pub struct AuthGrpcServer {
    core: Arc<AuthCore>,
}

impl AuthGrpcServer {
    pub fn new(core: Arc<AuthCore>) -> Self {
        Self { core }
    }

    pub fn into_service(self) -> AuthServiceServer<Self> {
        AuthServiceServer::new(self)
    }
}

fn optional(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn to_proto_city(city: CityRecord) -> City {
    City {
        id: city.id,
        code: city.code,
        name: city.name,
        r#type: city.kind,
        province_code: city.province_code.unwrap_or_default(),
        parent_code: city.parent_code.unwrap_or_default(),
    }
}

#[tonic::async_trait]
impl AuthService for AuthGrpcServer {
    async fn sign_up(
        &self,
        request: Request<SignUpRequest>,
    ) -> Result<Response<SignUpResponse>, Status> {
        let req = request.into_inner();

        let outcome = self
            .core
            .sign_up(RegisterInput {
                first_name: req.first_name,
                middle_name: optional(req.middle_name),
                last_name: req.last_name,
                email: req.email,
                password: req.password,
                city_id: optional(req.city_id),
                gender_id: optional(req.gender_id),
                date_of_birth: optional(req.dob),
                invitation_token: optional(req.invitation_token),
            })
            .await
            .map_err(Status::from)?;

        Ok(Response::new(SignUpResponse {
            user_id: outcome.user.id.to_string(),
            email: outcome.user.email,
            first_name: outcome.user.first_name,
            last_name: outcome.user.last_name,
            message: MSG_REGISTERED.to_string(),
            verification_token: outcome.verification_token,
        }))
    }

    async fn sign_in(
        &self,
        request: Request<SignInRequest>,
    ) -> Result<Response<SignInResponse>, Status> {
        let req = request.into_inner();

        let issued = self
            .core
            .sign_in(&req.identifier, &req.password)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(SignInResponse {
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            expires_in: issued.expires_in,
            user_id: issued.user_id.to_string(),
            identifier: issued.identifier,
        }))
    }

    async fn verify_access_token(
        &self,
        request: Request<VerifyAccessTokenRequest>,
    ) -> Result<Response<VerifyAccessTokenResponse>, Status> {
        let check = self.core.verify_access_token(&request.into_inner().token);

        Ok(Response::new(VerifyAccessTokenResponse {
            valid: check.valid,
            message: check.message,
        }))
    }

    async fn renew_access_token(
        &self,
        request: Request<RenewAccessTokenRequest>,
    ) -> Result<Response<RenewAccessTokenResponse>, Status> {
        let renewed = self
            .core
            .renew_access_token(&request.into_inner().refresh_token)
            .map_err(Status::from)?;

        Ok(Response::new(RenewAccessTokenResponse {
            access_token: renewed.access_token,
            refresh_token: renewed.refresh_token,
            expires_in: renewed.expires_in,
        }))
    }

    async fn verify_mail(
        &self,
        request: Request<VerifyMailRequest>,
    ) -> Result<Response<VerifyMailResponse>, Status> {
        let req = request.into_inner();

        let user_id = self
            .core
            .verify_email(&req.verification_token, &req.otp)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(VerifyMailResponse {
            message: MSG_EMAIL_VERIFIED.to_string(),
            user_id: user_id.to_string(),
        }))
    }

    async fn resend_otp(
        &self,
        request: Request<ResendOtpRequest>,
    ) -> Result<Response<ResendOtpResponse>, Status> {
        let verification_token = self
            .core
            .resend_otp(&request.into_inner().verification_token)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(ResendOtpResponse {
            message: MSG_OTP_SENT.to_string(),
            verification_token,
        }))
    }

    async fn get_provinces(
        &self,
        _request: Request<GetProvincesRequest>,
    ) -> Result<Response<GetProvincesResponse>, Status> {
        let cities = self
            .core
            .provinces()
            .await
            .map_err(Status::from)?;

        Ok(Response::new(GetProvincesResponse {
            cities: cities.into_iter().map(to_proto_city).collect(),
        }))
    }

    async fn get_wards(
        &self,
        request: Request<GetWardsRequest>,
    ) -> Result<Response<GetWardsResponse>, Status> {
        let cities = self
            .core
            .wards(&request.into_inner().province_code)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(GetWardsResponse {
            cities: cities.into_iter().map(to_proto_city).collect(),
        }))
    }
}
