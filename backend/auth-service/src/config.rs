//! Configuration management for Auth Service
//!
//! Loads settings from environment variables, with a `.env` file picked up in
//! debug builds for local development.
//!
//! # Example
//!
//! ```no_run
//! use auth_service::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     println!("HTTP port: {}", settings.server.http_port);
//!     Ok(())
//! }
//! ```

use anyhow::{bail, Context, Result};
use crypto_core::jwt::MIN_SECRET_LEN;
use db_pool::DbConfig;
use std::env;
use std::fmt;
use tracing::info;

const SERVICE_NAME: &str = "auth-service";

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DbConfig,
    pub server: ServerSettings,
    pub jwt: JwtSettings,
    pub email: EmailSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) && dotenvy::dotenv().is_ok() {
            info!("Loaded .env file for development");
        }

        Ok(Settings {
            database: DbConfig::from_env(SERVICE_NAME).map_err(anyhow::Error::msg)?,
            server: ServerSettings::from_env()?,
            jwt: JwtSettings::from_env()?,
            email: EmailSettings::from_env()?,
        })
    }
}

/// Listener settings for both transports
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub http_port: u16,
    pub grpc_port: u16,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            grpc_port: env::var("GRPC_PORT")
                .unwrap_or_else(|_| "50000".to_string())
                .parse()
                .context("Invalid GRPC_PORT")?,
        })
    }
}

/// Credential signing settings
#[derive(Clone)]
pub struct JwtSettings {
    pub secret: String,
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl JwtSettings {
    /// `JWT_SECRET` is mandatory and has no fallback value
    fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        Self::new(secret)
    }

    pub fn new(secret: String) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            bail!(
                "JWT_SECRET must be at least {} bytes (got {})",
                MIN_SECRET_LEN,
                secret.len()
            );
        }
        Ok(Self { secret })
    }
}

/// SMTP settings for verification mail
#[derive(Clone)]
pub struct EmailSettings {
    /// Empty host means delivery is logged and skipped
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub use_starttls: bool,
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "[REDACTED]"))
            .field("smtp_from", &self.smtp_from)
            .field("use_starttls", &self.use_starttls)
            .finish()
    }
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "no-reply@localhost".to_string(),
            use_starttls: true,
        }
    }
}

impl EmailSettings {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            smtp_host: env::var("SMTP_HOST").unwrap_or_default(),
            smtp_port: match env::var("SMTP_PORT") {
                Ok(port) => port.parse().context("Invalid SMTP_PORT")?,
                Err(_) => defaults.smtp_port,
            },
            smtp_username: env::var("SMTP_USERNAME").ok().filter(|v| !v.is_empty()),
            smtp_password: env::var("SMTP_PASSWORD").ok().filter(|v| !v.is_empty()),
            smtp_from: env::var("SMTP_FROM").unwrap_or(defaults.smtp_from),
            use_starttls: match env::var("SMTP_USE_STARTTLS") {
                Ok(flag) => flag.parse().context("Invalid SMTP_USE_STARTTLS")?,
                Err(_) => defaults.use_starttls,
            },
        })
    }
}
