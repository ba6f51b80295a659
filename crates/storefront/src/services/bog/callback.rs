//! Payment callback verification.
//!
//! BOG signs the raw callback body with SHA256withRSA and sends the
//! signature, base64 encoded, in the `Callback-Signature` header. The body
//! must be checked byte for byte before it is parsed.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;

use super::BogError;
use super::client::Receipt;

/// Header carrying the callback signature.
pub const SIGNATURE_HEADER: &str = "Callback-Signature";

/// Checks callback signatures against BOG's public key.
#[derive(Clone)]
pub struct CallbackVerifier {
    key: DecodingKey,
}

impl CallbackVerifier {
    /// Load the RSA public key from PEM.
    ///
    /// # Errors
    ///
    /// Returns `BogError::Signature` if the PEM is not an RSA public key.
    pub fn from_pem(pem: &str) -> Result<Self, BogError> {
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| BogError::Signature(format!("invalid callback public key: {e}")))?;
        Ok(Self { key })
    }

    /// Verify `signature` (standard base64) over `body`.
    ///
    /// # Errors
    ///
    /// Returns `BogError::Signature` if the signature is not valid base64 or
    /// does not match the body.
    pub fn verify(&self, body: &[u8], signature: &str) -> Result<(), BogError> {
        let raw = STANDARD
            .decode(signature.trim())
            .map_err(|e| BogError::Signature(format!("signature is not base64: {e}")))?;

        // jsonwebtoken expects the JWS encoding of the signature bytes.
        let encoded = URL_SAFE_NO_PAD.encode(raw);

        match jsonwebtoken::crypto::verify(&encoded, body, &self.key, Algorithm::RS256) {
            Ok(true) => Ok(()),
            Ok(false) => Err(BogError::Signature("signature mismatch".to_string())),
            Err(e) => Err(BogError::Signature(e.to_string())),
        }
    }
}

/// A payment callback.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackEvent {
    /// Always `order_payment` for payment callbacks.
    pub event: String,
    #[serde(default)]
    pub zoned_request_time: Option<String>,
    pub body: Receipt,
}

impl CallbackEvent {
    /// Parse a verified callback body.
    ///
    /// # Errors
    ///
    /// Returns `BogError::Parse` if the body is not a callback payload.
    pub fn parse(body: &[u8]) -> Result<Self, BogError> {
        serde_json::from_slice(body).map_err(|e| BogError::Parse(format!("callback body: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use oakhouse_core::PaymentStatus;

    use super::*;

    const PUBLIC_KEY: &str = include_str!("../../../testdata/bog_callback_public.pem");
    const UNRELATED_KEY: &str = include_str!("../../../testdata/unrelated_public.pem");

    const BODY: &str = r#"{"event":"order_payment","zoned_request_time":"2026-10-16T10:15:30.000000Z","body":{"order_id":"bog-123","external_order_id":"42","order_status":{"key":"completed","value":"Completed"}}}"#;

    const SIGNATURE: &str = "hmJQr50MVpsxD4kHBPYXF57/Ht4MwzAzxptzYDnxxPHCPqHYf4PClIrTWmIZEvXdmJ5OzAVFz4uceIw4HA9bqwtyVyi1GUm+GqSpzJleoZxdD0znz6YGp3YrGuCnYO/Avk+siwUAuAvTwp/6G1jaThCQBRDqsT/6bU7JkPDtF8FgMW4mK+6OMo4s4yRad8LMHqfpWyNaksbC/5NtKWzGeFF+ZVBfLXAvslxmD9nZsq/iQ/vj/6FHLs3ppBemtDDXBV6REUqQdG+L8eYgrtITCfNsuj02wbxaqf+07jEc4DUBWffGb6wr3AL9pe61C51AHsisSlEL9mgsK1uYRwuNtw==";

    #[test]
    fn test_valid_signature_is_accepted() {
        let verifier = CallbackVerifier::from_pem(PUBLIC_KEY).unwrap();
        assert!(verifier.verify(BODY.as_bytes(), SIGNATURE).is_ok());
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let verifier = CallbackVerifier::from_pem(PUBLIC_KEY).unwrap();
        let padded = format!("  {SIGNATURE}\n");
        assert!(verifier.verify(BODY.as_bytes(), &padded).is_ok());
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let verifier = CallbackVerifier::from_pem(PUBLIC_KEY).unwrap();
        let tampered = BODY.replace("completed", "rejected");
        assert!(matches!(
            verifier.verify(tampered.as_bytes(), SIGNATURE),
            Err(BogError::Signature(_))
        ));
    }

    #[test]
    fn test_bad_base64_is_rejected() {
        let verifier = CallbackVerifier::from_pem(PUBLIC_KEY).unwrap();
        assert!(matches!(
            verifier.verify(BODY.as_bytes(), "not base64 at all!"),
            Err(BogError::Signature(_))
        ));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let verifier = CallbackVerifier::from_pem(UNRELATED_KEY).unwrap();
        assert!(verifier.verify(BODY.as_bytes(), SIGNATURE).is_err());
    }

    #[test]
    fn test_invalid_pem_is_rejected() {
        assert!(CallbackVerifier::from_pem("-----BEGIN NOTHING-----").is_err());
    }

    #[test]
    fn test_parse_event() {
        let event = CallbackEvent::parse(BODY.as_bytes()).unwrap();
        assert_eq!(event.event, "order_payment");
        assert_eq!(event.body.order_id, "bog-123");
        assert_eq!(event.body.external_order_id.as_deref(), Some("42"));
        assert_eq!(event.body.status(), PaymentStatus::Completed);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            CallbackEvent::parse(b"{\"event\":1}"),
            Err(BogError::Parse(_))
        ));
    }
}
