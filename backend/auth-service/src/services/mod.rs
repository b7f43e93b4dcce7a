/// Business logic services
pub mod auth_core;
pub mod credentials;
pub mod email;
pub mod registration;
pub mod verification;

pub use auth_core::{AuthCore, SignUpOutcome};
pub use credentials::{AccessCheck, CredentialIssuer, IssuedCredentials, RenewedCredentials};
pub use email::{EmailNotifier, VerificationNotifier};
pub use registration::RegistrationService;
pub use verification::VerificationLedger;
