/// Data models for authentication
pub mod reference;
pub mod user;
pub mod verify_token;

pub use reference::{City, Gender};
pub use user::{NewUser, RegisterInput, User};
pub use verify_token::{NewVerifyToken, VerificationPurpose, VerifyToken};
