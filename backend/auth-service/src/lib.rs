// Auth Service Library
//
// Credential issuance, email OTP verification and reference lookups, served
// over HTTP (axum) and gRPC (tonic) from one shared core.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod grpc;
pub mod http;
pub mod models;
pub mod security;
pub mod services;
pub mod validators;

pub use error::{AuthError, Result};
pub use services::AuthCore;
