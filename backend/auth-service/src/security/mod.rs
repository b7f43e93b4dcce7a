/// Security utilities
pub mod password;

pub use crypto_core::jwt::{CredentialCodec, TokenError, TokenKind, ACCESS_TOKEN_TTL_SECS};
pub use password::{Argon2Hasher, SecretHasher};
