/// Auth Service - Main entry point
/// Serves the REST API and the gRPC AuthService from one process
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tonic::transport::Server as GrpcServer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth_service::{
    clock::SystemClock,
    config::Settings,
    db::PgStore,
    grpc::{AuthGrpcServer, AuthServiceServer},
    http,
    security::{Argon2Hasher, CredentialCodec},
    services::{AuthCore, EmailNotifier},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("auth_service=info,info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let settings = Settings::load().context("Failed to load configuration")?;

    info!(
        "Starting auth-service (HTTP {}:{}, gRPC {}:{})",
        settings.server.host,
        settings.server.http_port,
        settings.server.host,
        settings.server.grpc_port
    );

    settings.database.log_config();
    let pool = db_pool::create_pool(settings.database.clone())
        .await
        .context("Failed to create database pool")?;

    let store = Arc::new(PgStore::new(pool));
    store
        .migrate()
        .await
        .context("Failed to run database migrations")?;

    let codec = CredentialCodec::new(settings.jwt.secret.as_bytes());
    let notifier = EmailNotifier::new(&settings.email).context("Failed to configure email")?;

    let core = Arc::new(
        AuthCore::new(
            store,
            codec,
            Arc::new(Argon2Hasher::default()),
            Arc::new(notifier),
            Arc::new(SystemClock),
        )
        .context("Failed to initialize auth core")?,
    );

    let http_addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.http_port)
        .parse()
        .context("Invalid HTTP listen address")?;
    let grpc_addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.grpc_port)
        .parse()
        .context("Invalid gRPC listen address")?;

    // Both servers stop when this flips to true
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {}", http_addr))?;
    let router = http::build_router(core.clone());
    let http_server = tokio::spawn(http::serve(
        http_listener,
        router,
        wait_for(shutdown_rx.clone()),
    ));

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<AuthServiceServer<AuthGrpcServer>>()
        .await;

    info!("gRPC server listening on {}", grpc_addr);
    let grpc_server = tokio::spawn(
        GrpcServer::builder()
            .add_service(health_service)
            .add_service(AuthGrpcServer::new(core).into_service())
            .serve_with_shutdown(grpc_addr, wait_for(shutdown_rx)),
    );

    shutdown_signal().await;
    info!("Shutdown signal received, stopping servers");
    let _ = shutdown_tx.send(true);

    let (http_result, grpc_result) = tokio::try_join!(http_server, grpc_server)
        .context("Server task panicked")?;
    http_result.context("HTTP server failed")?;
    grpc_result.context("gRPC server failed")?;

    info!("auth-service stopped");
    Ok(())
}

async fn wait_for(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
