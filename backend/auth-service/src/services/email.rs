/// Verification code delivery
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::EmailSettings;
use crate::error::{AuthError, Result};
use crate::services::verification::VERIFICATION_TTL_MINUTES;
use crate::validators::mask_email;

/// Out-of-band channel that carries OTP codes to the user
#[async_trait]
pub trait VerificationNotifier: Send + Sync {
    async fn send_verification_code(&self, recipient: &str, otp: &str) -> Result<()>;
}

/// Async SMTP transport wrapper (SMTP or no-op)
#[derive(Clone)]
pub struct EmailNotifier {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl EmailNotifier {
    /// Build the notifier from configuration
    ///
    /// If SMTP host is empty, operates in no-op mode (logs only).
    pub fn new(config: &EmailSettings) -> Result<Self> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| AuthError::Internal(format!("Invalid SMTP_FROM address: {}", e)))?;

        let transport = if config.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured; verification codes will not be delivered");
            None
        } else {
            let builder = if config.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            }
            .map_err(|e| AuthError::Internal(format!("Failed to configure SMTP transport: {}", e)))?
            .port(config.smtp_port);

            let builder = if let (Some(username), Some(password)) =
                (&config.smtp_username, &config.smtp_password)
            {
                builder.credentials(Credentials::new(username.to_string(), password.to_string()))
            } else {
                builder
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }
}

fn verification_body(otp: &str) -> String {
    format!(
        "Your verification code is {}.\n\nIt expires in {} minutes. If you did not create an account, please ignore this email.",
        otp, VERIFICATION_TTL_MINUTES
    )
}

#[async_trait]
impl VerificationNotifier for EmailNotifier {
    async fn send_verification_code(&self, recipient: &str, otp: &str) -> Result<()> {
        let Some(transport) = &self.transport else {
            info!(
                recipient = %mask_email(recipient),
                "Email notifier running in no-op mode; skipping actual send"
            );
            return Ok(());
        };

        let to = recipient
            .parse::<Mailbox>()
            .map_err(|e| AuthError::Validation(format!("Invalid recipient email address: {}", e)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Verify your email address")
            .header(header::ContentType::TEXT_PLAIN)
            .body(verification_body(otp))
            .map_err(|e| AuthError::Internal(format!("Failed to build email message: {}", e)))?;

        transport
            .send(email)
            .await
            .map_err(|e| AuthError::Unavailable(format!("Failed to send email: {}", e)))?;

        info!(recipient = %mask_email(recipient), "Verification email sent");
        Ok(())
    }
}
