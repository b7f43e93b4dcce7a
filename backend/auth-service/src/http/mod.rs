/// HTTP API for auth operations
///
/// Routes live under `/api/v1/auth`; `/health` sits at the root. Every route
/// is a thin adapter over [`AuthCore`].
pub mod handlers;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::services::AuthCore;

/// Build the HTTP router with all auth endpoints
pub fn build_router(core: Arc<AuthCore>) -> Router {
    let auth = Router::new()
        .route("/sign-up", post(handlers::sign_up))
        .route("/sign-in", post(handlers::sign_in))
        .route("/verify-mail", post(handlers::verify_mail))
        .route("/resend-otp", post(handlers::resend_otp))
        .route("/verify-access-token", get(handlers::verify_access_token))
        .route("/renew-access-token", post(handlers::renew_access_token))
        .route("/cities/provinces", get(handlers::provinces))
        .route(
            "/cities/provinces/:province_code/wards",
            get(handlers::wards),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/auth", auth)
        .layer(TraceLayer::new_for_http())
        .with_state(core)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Serve the router until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    info!(addr = ?listener.local_addr().ok(), "HTTP server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
