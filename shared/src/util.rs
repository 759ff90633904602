/// Current UTC timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Short hex digest: first 16 hex chars of SHA-256 over `input`.
///
/// Used for idempotency fingerprints and derived webhook event identities.
pub fn short_sha256(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_sha256_deterministic() {
        assert_eq!(short_sha256("abc"), short_sha256("abc"));
        assert_ne!(short_sha256("abc"), short_sha256("abd"));
        assert_eq!(short_sha256("abc").len(), 16);
    }
}
