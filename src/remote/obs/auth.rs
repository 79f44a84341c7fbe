use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

/// Builds the identify authentication string:
/// `base64(sha256(base64(sha256(password + salt)) + challenge))`.
pub(super) fn authentication_string(password: &str, salt: &str, challenge: &str) -> String {
    let mut secret_hasher = Sha256::new();
    secret_hasher.update(password.as_bytes());
    secret_hasher.update(salt.as_bytes());
    let secret = STANDARD.encode(secret_hasher.finalize());

    let mut auth_hasher = Sha256::new();
    auth_hasher.update(secret.as_bytes());
    auth_hasher.update(challenge.as_bytes());
    STANDARD.encode(auth_hasher.finalize())
}
