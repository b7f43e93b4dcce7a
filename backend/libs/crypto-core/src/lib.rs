//! Credential primitives shared by the auth service
//!
//! - [`jwt`]: HS256 access/refresh token codec
//! - [`otp`]: one-time codes, verification handles and constant-time comparison

pub mod jwt;
pub mod otp;

pub use jwt::{CredentialCodec, TokenError, TokenKind, VerifiedToken};
