//! One-time codes and verification handles
//!
//! Codes are six decimal digits drawn from the OS CSPRNG. Handles are opaque
//! alphanumeric strings that identify a verification entry without revealing
//! anything about the user it belongs to.

use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use subtle::ConstantTimeEq;

/// Number of digits in a one-time code
pub const OTP_LENGTH: usize = 6;

/// Length of a verification handle
pub const HANDLE_LENGTH: usize = 32;

/// Generate a uniformly random six-digit code, zero-padded
pub fn generate_otp() -> String {
    let value: u32 = OsRng.gen_range(0..1_000_000);
    format!("{:0width$}", value, width = OTP_LENGTH)
}

/// Generate an opaque verification handle
pub fn generate_handle() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(HANDLE_LENGTH)
        .map(char::from)
        .collect()
}

/// Compare a stored code against a submitted one in constant time
///
/// Equal-length inputs are compared without early exit. A length mismatch
/// returns false immediately, so timing reveals the length only.
pub fn codes_match(stored: &str, submitted: &str) -> bool {
    stored.as_bytes().ct_eq(submitted.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_otp_is_six_digits() {
        for _ in 0..500 {
            let code = generate_otp();
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()), "got {code}");
        }
    }

    #[test]
    fn test_handle_shape_and_uniqueness() {
        let handles: HashSet<String> = (0..200).map(|_| generate_handle()).collect();
        assert_eq!(handles.len(), 200);
        for handle in &handles {
            assert_eq!(handle.len(), HANDLE_LENGTH);
            assert!(handle.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_codes_match() {
        assert!(codes_match("012345", "012345"));
        assert!(!codes_match("012345", "012346"));
        assert!(!codes_match("012345", "12345"));
        assert!(!codes_match("012345", ""));
        assert!(!codes_match("012345", " 012345"));
    }
}
