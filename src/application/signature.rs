use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha512};

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "X-Hook-Signature";

/// Computes the signature the bank attaches to a webhook: base64 of SHA-512 over
/// `secret || body`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(secret.as_bytes());
    hasher.update(body);
    STANDARD.encode(hasher.finalize())
}

/// Authenticates inbound webhooks against the shared secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Returns `true` only when the presented header matches. A missing header is a mismatch.
    pub fn verify(&self, body: &[u8], presented: Option<&str>) -> bool {
        let Some(presented) = presented else {
            return false;
        };
        let expected = sign(&self.secret, body);
        constant_time_eq(expected.as_bytes(), presented.as_bytes())
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (left, right) in a.iter().zip(b.iter()) {
        diff |= left ^ right;
    }
    diff == 0
}
