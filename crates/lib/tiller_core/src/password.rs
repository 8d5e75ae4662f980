//! Password hashing via bcrypt.
//!
//! bcrypt self-salts, so hashes are stored as a single opaque string and
//! verification never needs a separate salt column.

use crate::error::Error;

/// Default bcrypt cost factor. Tests pass a lower cost to stay fast.
pub const DEFAULT_COST: u32 = 10;

/// Hash a password with bcrypt at the given cost.
pub fn hash(password: &str, cost: u32) -> Result<String, Error> {
    bcrypt::hash(password, cost).map_err(|e| Error::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
pub fn verify(password: &str, hash: &str) -> Result<bool, Error> {
    bcrypt::verify(password, hash).map_err(|e| Error::Internal(format!("bcrypt verify: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    // bcrypt's minimum cost; full cost makes the suite crawl.
    const TEST_COST: u32 = 4;

    #[test]
    fn verify_accepts_the_original_password() {
        let hashed = hash("opensesame", TEST_COST).expect("hash");
        assert!(verify("opensesame", &hashed).expect("verify"));
        assert!(!verify("opensesam", &hashed).expect("verify"));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash("opensesame", TEST_COST).expect("hash");
        let b = hash("opensesame", TEST_COST).expect("hash");
        assert_ne!(a, b);
    }
}
