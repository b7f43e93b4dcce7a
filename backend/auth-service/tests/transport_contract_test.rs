//! Behavioural contract shared by the HTTP and gRPC transports
//!
//! Each scenario runs once per transport against a fresh in-memory world and
//! must observe the same outcomes and the same machine error codes.

mod common;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tonic::Request as GrpcRequest;
use tower::ServiceExt;

use auth_service::error::ERROR_CODE_METADATA_KEY;
use auth_service::grpc::auth::v1::auth_service_server::AuthService;
use auth_service::grpc::auth::v1 as pb;
use auth_service::grpc::AuthGrpcServer;
use auth_service::http::build_router;
use auth_service::services::AuthCore;
use common::{world, World};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Failure {
    code: String,
    message: String,
}

#[derive(Debug, Clone)]
struct Tokens {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone, Default)]
struct SignUp {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
    city_id: Option<String>,
    gender_id: Option<String>,
    dob: Option<String>,
}

fn sign_up(email: &str) -> SignUp {
    SignUp {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: email.to_string(),
        password: "correct-horse".to_string(),
        ..SignUp::default()
    }
}

type Outcome<T> = std::result::Result<T, Failure>;

#[async_trait]
trait Transport: Send + Sync {
    fn name(&self) -> &'static str;
    /// Returns `(user_id, verification_token)`
    async fn sign_up(&self, input: SignUp) -> Outcome<(String, String)>;
    async fn sign_in(&self, identifier: &str, password: &str) -> Outcome<Tokens>;
    async fn verify_access_token(&self, token: &str) -> (bool, String);
    async fn renew_access_token(&self, refresh_token: &str) -> Outcome<Tokens>;
    /// Returns the verified user id
    async fn verify_mail(&self, handle: &str, otp: &str) -> Outcome<String>;
    /// Returns the new handle
    async fn resend_otp(&self, handle: &str) -> Outcome<String>;
    /// City codes in response order
    async fn provinces(&self) -> Outcome<Vec<String>>;
    async fn wards(&self, province_code: &str) -> Outcome<Vec<String>>;
}

// ============================================================================
// HTTP adapter
// ============================================================================

struct HttpTransport {
    router: Router,
}

impl HttpTransport {
    fn new(core: Arc<AuthCore>) -> Self {
        Self {
            router: build_router(core),
        }
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn expect(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        success: StatusCode,
    ) -> Outcome<Value> {
        let (status, value) = self.call(method, uri, body).await;
        if status == success {
            return Ok(value);
        }
        assert!(
            status.is_client_error() || status.is_server_error(),
            "unexpected status {}",
            status
        );
        assert_eq!(value["status"], status.as_u16(), "status echoed in body");
        Err(Failure {
            code: value["error"].as_str().unwrap_or_default().to_string(),
            message: value["message"].as_str().unwrap_or_default().to_string(),
        })
    }
}

fn text(value: &Value, field: &str) -> String {
    value[field].as_str().unwrap_or_default().to_string()
}

fn json_tokens(value: &Value) -> Tokens {
    Tokens {
        access_token: text(value, "accessToken"),
        refresh_token: text(value, "refreshToken"),
        expires_in: value["expiresIn"].as_i64().unwrap_or_default(),
    }
}

fn json_codes(value: &Value) -> Vec<String> {
    value["cities"]
        .as_array()
        .map(|cities| cities.iter().map(|c| text(c, "code")).collect())
        .unwrap_or_default()
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn sign_up(&self, input: SignUp) -> Outcome<(String, String)> {
        let body = json!({
            "firstName": input.first_name,
            "lastName": input.last_name,
            "email": input.email,
            "password": input.password,
            "cityId": input.city_id,
            "genderId": input.gender_id,
            "dob": input.dob,
        });
        let value = self
            .expect(
                Method::POST,
                "/api/v1/auth/sign-up",
                Some(body),
                StatusCode::CREATED,
            )
            .await?;
        Ok((text(&value, "userId"), text(&value, "verificationToken")))
    }

    async fn sign_in(&self, identifier: &str, password: &str) -> Outcome<Tokens> {
        let body = json!({ "identifier": identifier, "password": password });
        let value = self
            .expect(Method::POST, "/api/v1/auth/sign-in", Some(body), StatusCode::OK)
            .await?;
        Ok(json_tokens(&value))
    }

    async fn verify_access_token(&self, token: &str) -> (bool, String) {
        let uri = format!("/api/v1/auth/verify-access-token?token={}", token);
        let (status, value) = self.call(Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        (value["valid"].as_bool().unwrap_or_default(), text(&value, "message"))
    }

    async fn renew_access_token(&self, refresh_token: &str) -> Outcome<Tokens> {
        let body = json!({ "refreshToken": refresh_token });
        let value = self
            .expect(
                Method::POST,
                "/api/v1/auth/renew-access-token",
                Some(body),
                StatusCode::OK,
            )
            .await?;
        Ok(json_tokens(&value))
    }

    async fn verify_mail(&self, handle: &str, otp: &str) -> Outcome<String> {
        let body = json!({ "verificationToken": handle, "otp": otp });
        let value = self
            .expect(Method::POST, "/api/v1/auth/verify-mail", Some(body), StatusCode::OK)
            .await?;
        Ok(text(&value, "userId"))
    }

    async fn resend_otp(&self, handle: &str) -> Outcome<String> {
        let body = json!({ "verificationToken": handle });
        let value = self
            .expect(Method::POST, "/api/v1/auth/resend-otp", Some(body), StatusCode::OK)
            .await?;
        Ok(text(&value, "verificationToken"))
    }

    async fn provinces(&self) -> Outcome<Vec<String>> {
        let value = self
            .expect(
                Method::GET,
                "/api/v1/auth/cities/provinces",
                None,
                StatusCode::OK,
            )
            .await?;
        Ok(json_codes(&value))
    }

    async fn wards(&self, province_code: &str) -> Outcome<Vec<String>> {
        let uri = format!(
            "/api/v1/auth/cities/provinces/{}/wards",
            province_code.replace(' ', "%20")
        );
        let value = self.expect(Method::GET, &uri, None, StatusCode::OK).await?;
        Ok(json_codes(&value))
    }
}

// ============================================================================
// gRPC adapter
// ============================================================================

struct GrpcTransport {
    server: AuthGrpcServer,
}

fn grpc_failure(status: tonic::Status) -> Failure {
    Failure {
        code: status
            .metadata()
            .get(ERROR_CODE_METADATA_KEY)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        message: status.message().to_string(),
    }
}

fn proto_codes(cities: Vec<pb::City>) -> Vec<String> {
    cities.into_iter().map(|c| c.code).collect()
}

#[async_trait]
impl Transport for GrpcTransport {
    fn name(&self) -> &'static str {
        "grpc"
    }

    async fn sign_up(&self, input: SignUp) -> Outcome<(String, String)> {
        let response = self
            .server
            .sign_up(GrpcRequest::new(pb::SignUpRequest {
                first_name: input.first_name,
                last_name: input.last_name,
                email: input.email,
                password: input.password,
                city_id: input.city_id.unwrap_or_default(),
                gender_id: input.gender_id.unwrap_or_default(),
                dob: input.dob.unwrap_or_default(),
                ..Default::default()
            }))
            .await
            .map_err(grpc_failure)?
            .into_inner();
        Ok((response.user_id, response.verification_token))
    }

    async fn sign_in(&self, identifier: &str, password: &str) -> Outcome<Tokens> {
        let response = self
            .server
            .sign_in(GrpcRequest::new(pb::SignInRequest {
                identifier: identifier.to_string(),
                password: password.to_string(),
            }))
            .await
            .map_err(grpc_failure)?
            .into_inner();
        Ok(Tokens {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
        })
    }

    async fn verify_access_token(&self, token: &str) -> (bool, String) {
        let response = self
            .server
            .verify_access_token(GrpcRequest::new(pb::VerifyAccessTokenRequest {
                token: token.to_string(),
            }))
            .await
            .unwrap()
            .into_inner();
        (response.valid, response.message)
    }

    async fn renew_access_token(&self, refresh_token: &str) -> Outcome<Tokens> {
        let response = self
            .server
            .renew_access_token(GrpcRequest::new(pb::RenewAccessTokenRequest {
                refresh_token: refresh_token.to_string(),
            }))
            .await
            .map_err(grpc_failure)?
            .into_inner();
        Ok(Tokens {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
        })
    }

    async fn verify_mail(&self, handle: &str, otp: &str) -> Outcome<String> {
        let response = self
            .server
            .verify_mail(GrpcRequest::new(pb::VerifyMailRequest {
                verification_token: handle.to_string(),
                otp: otp.to_string(),
            }))
            .await
            .map_err(grpc_failure)?
            .into_inner();
        Ok(response.user_id)
    }

    async fn resend_otp(&self, handle: &str) -> Outcome<String> {
        let response = self
            .server
            .resend_otp(GrpcRequest::new(pb::ResendOtpRequest {
                verification_token: handle.to_string(),
            }))
            .await
            .map_err(grpc_failure)?
            .into_inner();
        Ok(response.verification_token)
    }

    async fn provinces(&self) -> Outcome<Vec<String>> {
        let response = self
            .server
            .get_provinces(GrpcRequest::new(pb::GetProvincesRequest {}))
            .await
            .map_err(grpc_failure)?
            .into_inner();
        Ok(proto_codes(response.cities))
    }

    async fn wards(&self, province_code: &str) -> Outcome<Vec<String>> {
        let response = self
            .server
            .get_wards(GrpcRequest::new(pb::GetWardsRequest {
                province_code: province_code.to_string(),
            }))
            .await
            .map_err(grpc_failure)?
            .into_inner();
        Ok(proto_codes(response.cities))
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Run a scenario once over HTTP and once over gRPC, each on a fresh world
async fn on_both<F, Fut>(scenario: F)
where
    F: Fn(Arc<dyn Transport>, World) -> Fut,
    Fut: Future<Output = ()>,
{
    let w = world().await;
    scenario(Arc::new(HttpTransport::new(w.core.clone())), w).await;

    let w = world().await;
    let server = AuthGrpcServer::new(w.core.clone());
    scenario(Arc::new(GrpcTransport { server }), w).await;
}

fn code_of<T: std::fmt::Debug>(t: &dyn Transport, outcome: Outcome<T>) -> String {
    match outcome {
        Ok(value) => panic!("[{}] expected failure, got {:?}", t.name(), value),
        Err(failure) => failure.code,
    }
}

fn other_code(code: &str) -> &'static str {
    if code == "000000" {
        "111111"
    } else {
        "000000"
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_sign_up_verify_sign_in_renew() {
    on_both(|t, w| async move {
        let (user_id, handle) = t.sign_up(sign_up("ada@example.com")).await.unwrap();
        assert_eq!(handle.len(), 32, "[{}]", t.name());

        let otp = w.notifier.last_code_for("ada@example.com").unwrap();
        assert_eq!(t.verify_mail(&handle, &otp).await.unwrap(), user_id);

        let tokens = t.sign_in("ada@example.com", "correct-horse").await.unwrap();
        assert_eq!(tokens.expires_in, 3600);
        assert_eq!(
            t.verify_access_token(&tokens.access_token).await,
            (true, "Token is valid".to_string())
        );

        let renewed = t.renew_access_token(&tokens.refresh_token).await.unwrap();
        assert_eq!(renewed.refresh_token, tokens.refresh_token);
        assert_eq!(renewed.expires_in, 3600);
        assert!(t.verify_access_token(&renewed.access_token).await.0);
    })
    .await;
}

#[tokio::test]
async fn test_sign_in_is_case_insensitive_on_email() {
    on_both(|t, _w| async move {
        t.sign_up(sign_up("Grace@Example.com")).await.unwrap();
        assert!(t.sign_in("  GRACE@example.COM ", "correct-horse").await.is_ok());
    })
    .await;
}

#[tokio::test]
async fn test_otp_mismatch_then_success_then_already_used() {
    on_both(|t, w| async move {
        let (_, handle) = t.sign_up(sign_up("otp@example.com")).await.unwrap();
        let otp = w.notifier.last_code_for("otp@example.com").unwrap();

        let mismatch = t.verify_mail(&handle, other_code(&otp)).await;
        assert_eq!(code_of(&*t, mismatch), "otp_mismatch");

        assert!(t.verify_mail(&handle, &otp).await.is_ok());

        let replay = t.verify_mail(&handle, &otp).await;
        assert_eq!(code_of(&*t, replay), "already_used");
    })
    .await;
}

#[tokio::test]
async fn test_unknown_handle_is_not_found() {
    on_both(|t, _w| async move {
        let outcome = t.verify_mail("no-such-handle", "123456").await;
        assert_eq!(code_of(&*t, outcome), "verification_not_found");

        let outcome = t.resend_otp("no-such-handle").await;
        assert_eq!(code_of(&*t, outcome), "verification_not_found");
    })
    .await;
}

#[tokio::test]
async fn test_duplicate_email_differs_only_in_case() {
    on_both(|t, w| async move {
        t.sign_up(sign_up("dup@example.com")).await.unwrap();

        let outcome = t.sign_up(sign_up(" DUP@Example.com ")).await;
        assert_eq!(code_of(&*t, outcome), "duplicate_email");
        assert_eq!(w.store.user_count().await, 1);
    })
    .await;
}

#[tokio::test]
async fn test_sign_up_validation() {
    on_both(|t, w| async move {
        let missing = SignUp {
            first_name: String::new(),
            ..sign_up("v@example.com")
        };
        let failure = t.sign_up(missing).await.unwrap_err();
        assert_eq!(failure.code, "validation_error");
        assert_eq!(failure.message, "firstName is required");

        let short = SignUp {
            password: "abc".to_string(),
            ..sign_up("v@example.com")
        };
        assert_eq!(code_of(&*t, t.sign_up(short).await), "validation_error");

        let bad_dob = SignUp {
            dob: Some("2024-02-30".to_string()),
            ..sign_up("v@example.com")
        };
        let failure = t.sign_up(bad_dob).await.unwrap_err();
        assert_eq!(failure.code, "validation_error");
        assert_eq!(failure.message, "invalid DOB format");

        assert_eq!(w.store.user_count().await, 0);
        assert_eq!(w.notifier.sent_count(), 0);
    })
    .await;
}

#[tokio::test]
async fn test_sign_up_accepts_reference_ids_and_dob() {
    on_both(|t, w| async move {
        let input = SignUp {
            city_id: Some("10".to_string()),
            gender_id: Some("2".to_string()),
            dob: Some("1990-12-10".to_string()),
            ..sign_up("ref@example.com")
        };
        t.sign_up(input).await.unwrap();

        // Unknown reference ids are dropped, not rejected
        let input = SignUp {
            city_id: Some("9999".to_string()),
            gender_id: Some("not-a-number".to_string()),
            ..sign_up("ref2@example.com")
        };
        t.sign_up(input).await.unwrap();
        assert_eq!(w.store.user_count().await, 2);
    })
    .await;
}

#[tokio::test]
async fn test_invalid_credentials_are_indistinguishable() {
    on_both(|t, _w| async move {
        t.sign_up(sign_up("known@example.com")).await.unwrap();

        let unknown = t.sign_in("nobody@example.com", "correct-horse").await.unwrap_err();
        let wrong = t.sign_in("known@example.com", "wrong-horse").await.unwrap_err();

        assert_eq!(unknown, wrong, "[{}]", t.name());
        assert_eq!(unknown.code, "invalid_credentials");

        let blank = t.sign_in("", "").await.unwrap_err();
        assert_eq!(blank.code, "validation_error");
    })
    .await;
}

#[tokio::test]
async fn test_inactive_account_cannot_sign_in() {
    on_both(|t, w| async move {
        let (user_id, _) = t.sign_up(sign_up("off@example.com")).await.unwrap();
        assert!(w.store.set_active(user_id.parse().unwrap(), false).await);

        let outcome = t.sign_in("off@example.com", "correct-horse").await;
        assert_eq!(code_of(&*t, outcome), "account_inactive");
    })
    .await;
}

#[tokio::test]
async fn test_resend_supersedes_previous_handle() {
    on_both(|t, w| async move {
        let (user_id, first) = t.sign_up(sign_up("re@example.com")).await.unwrap();
        let first_otp = w.notifier.last_code_for("re@example.com").unwrap();

        let second = t.resend_otp(&first).await.unwrap();
        assert_ne!(second, first);
        assert_eq!(w.notifier.sent_count(), 2);
        let second_otp = w.notifier.last_code_for("re@example.com").unwrap();

        let stale = t.verify_mail(&first, &first_otp).await;
        assert_eq!(code_of(&*t, stale), "verification_expired");

        let stale = t.resend_otp(&first).await;
        assert_eq!(code_of(&*t, stale), "verification_expired");

        assert_eq!(t.verify_mail(&second, &second_otp).await.unwrap(), user_id);

        let used = t.resend_otp(&second).await;
        assert_eq!(code_of(&*t, used), "already_used");
        assert_eq!(w.notifier.sent_count(), 2);
    })
    .await;
}

#[tokio::test]
async fn test_verification_entry_expires_after_fifteen_minutes() {
    on_both(|t, w| async move {
        let (_, handle) = t.sign_up(sign_up("late@example.com")).await.unwrap();
        let otp = w.notifier.last_code_for("late@example.com").unwrap();

        w.clock.advance(Duration::minutes(15) + Duration::seconds(1));

        let outcome = t.verify_mail(&handle, &otp).await;
        assert_eq!(code_of(&*t, outcome), "verification_expired");

        let outcome = t.resend_otp(&handle).await;
        assert_eq!(code_of(&*t, outcome), "verification_expired");
    })
    .await;
}

#[tokio::test]
async fn test_token_kinds_are_not_interchangeable() {
    on_both(|t, w| async move {
        t.sign_up(sign_up("kind@example.com")).await.unwrap();
        let tokens = t.sign_in("kind@example.com", "correct-horse").await.unwrap();

        let outcome = t.renew_access_token(&tokens.access_token).await;
        assert_eq!(code_of(&*t, outcome), "invalid_refresh_token");

        let outcome = t.renew_access_token("").await;
        assert_eq!(code_of(&*t, outcome), "invalid_refresh_token");

        let (valid, message) = t.verify_access_token(&tokens.refresh_token).await;
        assert!(!valid);
        assert_eq!(
            message,
            "Invalid token: token kind mismatch: expected access, found refresh"
        );

        assert_eq!(
            t.verify_access_token("").await,
            (false, "Token is required".to_string())
        );

        w.clock.advance(Duration::seconds(3601));
        let (valid, _) = t.verify_access_token(&tokens.access_token).await;
        assert!(!valid);
        assert!(t.renew_access_token(&tokens.refresh_token).await.is_ok());
    })
    .await;
}

#[tokio::test]
async fn test_reference_lookups() {
    on_both(|t, _w| async move {
        assert_eq!(t.provinces().await.unwrap(), vec!["01", "79"]);
        assert_eq!(t.wards("01").await.unwrap(), vec!["00004", "00001"]);
        assert!(t.wards("99").await.unwrap().is_empty());

        let outcome = t.wards(" ").await;
        assert_eq!(code_of(&*t, outcome), "validation_error");
    })
    .await;
}
