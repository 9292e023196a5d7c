use base64::prelude::*;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

fn digest(secret: &str, body: &[u8]) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

/// Base64 signature for a webhook body, as the platform computes it for the
/// `X-Shopify-Hmac-Sha256` header.
pub fn sign_webhook(secret: &str, body: &[u8]) -> String {
    BASE64_STANDARD.encode(digest(secret, body))
}

/// Verify the signature header against the raw request body in constant time.
pub fn verify_webhook_hmac(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(provided) = BASE64_STANDARD.decode(signature.trim()) else {
        return false;
    };
    let expected = digest(secret, body);
    ConstantTimeEq::ct_eq(provided.as_slice(), expected.as_slice()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_signature() {
        let body = br#"{"id":9001,"financial_status":"paid"}"#;
        let sig = sign_webhook("shpss_secret", body);
        assert!(verify_webhook_hmac("shpss_secret", body, &sig));
    }

    #[test]
    fn rejects_wrong_secret_and_tampered_body() {
        let body = br#"{"id":9001}"#;
        let sig = sign_webhook("shpss_secret", body);
        assert!(!verify_webhook_hmac("other_secret", body, &sig));
        assert!(!verify_webhook_hmac("shpss_secret", br#"{"id":9002}"#, &sig));
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(!verify_webhook_hmac("shpss_secret", b"{}", "not base64!!"));
        assert!(!verify_webhook_hmac("shpss_secret", b"{}", ""));
    }
}
