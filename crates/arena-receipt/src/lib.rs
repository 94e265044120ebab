// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = "Ed25519 receipts over canonical payloads."]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! arena-receipt
//!
//! A receipt is a signed assertion over a canonical JSON payload: the
//! payload is canonicalized (sorted keys, no whitespace), the bytes are
//! Ed25519-signed, and the receipt carries the signature and the
//! SPKI-DER public key, both hex-encoded. Verifying recomputes the
//! canonical bytes, so any mutation of the payload, however cosmetic it
//! looks, invalidates the signature. Filesystem cross-checks (do the
//! payload hashes match the bundle on disk?) live in `arena-verify`.

use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use arena_core::{CanonError, canonicalize};

/// The only receipt version this crate produces or accepts.
pub const RECEIPT_VERSION: u32 = 1;

/// The only signature algorithm this crate produces or accepts.
pub const RECEIPT_ALGORITHM: &str = "ed25519";

/// A signed assertion over a canonical payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Receipt format version.
    pub version: u32,
    /// Signature algorithm identifier.
    pub algorithm: String,
    /// The signed payload, verbatim.
    pub payload: Value,
    /// Hex-encoded Ed25519 signature over the canonical payload bytes.
    pub signature: String,
    /// Hex-encoded SPKI-DER export of the signer's public key.
    pub public_key: String,
    /// RFC 3339 signing timestamp. Not covered by the signature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<String>,
}

/// Errors from signing and key handling.
#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    /// The payload could not be canonicalized.
    #[error(transparent)]
    Canon(#[from] CanonError),
    /// A key failed to parse or export.
    #[error("key handling failed: {0}")]
    Key(String),
}

/// Build the payload for a match receipt.
#[must_use]
pub fn match_receipt_payload(
    match_id: &str,
    log_hash: &str,
    manifest_hash: &str,
    runner_version: &str,
    issued_by: &str,
) -> Value {
    json!({
        "matchId": match_id,
        "logHash": log_hash,
        "manifestHash": manifest_hash,
        "runnerVersion": runner_version,
        "issuedBy": issued_by,
    })
}

/// Build the payload for a tournament receipt.
#[must_use]
pub fn tournament_receipt_payload(
    tournament_id: &str,
    truth_bundle_hash: &str,
    match_count: usize,
    issued_by: &str,
) -> Value {
    json!({
        "tournamentId": tournament_id,
        "truthBundleHash": truth_bundle_hash,
        "matchCount": match_count,
        "issuedBy": issued_by,
    })
}

/// Sign a payload, producing a complete receipt.
///
/// # Errors
///
/// Returns [`ReceiptError`] if the payload cannot be canonicalized or
/// the public key cannot be exported.
pub fn sign_payload(
    payload: &Value,
    key: &SigningKey,
    signed_at: Option<String>,
) -> Result<Receipt, ReceiptError> {
    let canonical = canonicalize(payload)?;
    let signature: Signature = key.sign(canonical.as_bytes());
    Ok(Receipt {
        version: RECEIPT_VERSION,
        algorithm: RECEIPT_ALGORITHM.to_string(),
        payload: payload.clone(),
        signature: hex::encode(signature.to_bytes()),
        public_key: spki_hex(&key.verifying_key())?,
        signed_at,
    })
}

/// Verify a receipt against the public key it carries.
///
/// Accepts only `version == 1` and `algorithm == "ed25519"`. Returns
/// `false` on any malformed field; verification never errors.
#[must_use]
pub fn verify_receipt(receipt: &Receipt) -> bool {
    if receipt.version != RECEIPT_VERSION || receipt.algorithm != RECEIPT_ALGORITHM {
        return false;
    }
    let Ok(canonical) = canonicalize(&receipt.payload) else {
        return false;
    };
    let Ok(spki) = hex::decode(&receipt.public_key) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_public_key_der(&spki) else {
        return false;
    };
    let Ok(signature_bytes) = hex::decode(&receipt.signature) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&signature_bytes) else {
        return false;
    };
    verifying_key
        .verify(canonical.as_bytes(), &signature)
        .is_ok()
}

/// Verify a receipt and additionally require that it was signed by the
/// supplied key.
#[must_use]
pub fn verify_receipt_against_key(receipt: &Receipt, key: &VerifyingKey) -> bool {
    let Ok(expected) = spki_hex(key) else {
        return false;
    };
    receipt.public_key == expected && verify_receipt(receipt)
}

/// Hex encoding of a public key's SPKI-DER export.
///
/// # Errors
///
/// Returns [`ReceiptError::Key`] if the export fails.
pub fn spki_hex(key: &VerifyingKey) -> Result<String, ReceiptError> {
    let der = key
        .to_public_key_der()
        .map_err(|e| ReceiptError::Key(e.to_string()))?;
    Ok(hex::encode(der.as_bytes()))
}

/// Load a signing key from PKCS#8 PEM text.
///
/// # Errors
///
/// Returns [`ReceiptError::Key`] if the PEM does not hold an Ed25519
/// private key.
pub fn signing_key_from_pem(pem: &str) -> Result<SigningKey, ReceiptError> {
    SigningKey::from_pkcs8_pem(pem).map_err(|e| ReceiptError::Key(e.to_string()))
}

/// Load a verifying key from SPKI PEM text.
///
/// # Errors
///
/// Returns [`ReceiptError::Key`] if the PEM does not hold an Ed25519
/// public key.
pub fn verifying_key_from_pem(pem: &str) -> Result<VerifyingKey, ReceiptError> {
    VerifyingKey::from_public_key_pem(pem).map_err(|e| ReceiptError::Key(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let payload = match_receipt_payload("m1", "sha256:aa", "sha256:bb", "0.1.0", "tester");
        let receipt = sign_payload(&payload, &test_key(), None).unwrap();
        assert!(verify_receipt(&receipt));
        assert!(verify_receipt_against_key(
            &receipt,
            &test_key().verifying_key()
        ));
    }

    #[test]
    fn payload_mutation_breaks_the_signature() {
        let payload = tournament_receipt_payload("t1", "cc", 4, "tester");
        let mut receipt = sign_payload(&payload, &test_key(), None).unwrap();
        receipt.payload["matchCount"] = serde_json::json!(5);
        assert!(!verify_receipt(&receipt));
    }

    #[test]
    fn wrong_version_or_algorithm_is_rejected() {
        let payload = serde_json::json!({"k": "v"});
        let good = sign_payload(&payload, &test_key(), None).unwrap();

        let mut bad_version = good.clone();
        bad_version.version = 2;
        assert!(!verify_receipt(&bad_version));

        let mut bad_algorithm = good;
        bad_algorithm.algorithm = "rsa".to_string();
        assert!(!verify_receipt(&bad_algorithm));
    }

    #[test]
    fn different_key_fails_the_pinned_check() {
        let payload = serde_json::json!({"k": "v"});
        let receipt = sign_payload(&payload, &test_key(), None).unwrap();
        let other = SigningKey::from_bytes(&[9u8; 32]);
        assert!(verify_receipt(&receipt));
        assert!(!verify_receipt_against_key(&receipt, &other.verifying_key()));
    }

    #[test]
    fn signature_covers_canonical_bytes_not_formatting() {
        // Two payloads that differ only in key order sign identically.
        let a = serde_json::json!({"b": 1, "a": 2});
        let b = serde_json::json!({"a": 2, "b": 1});
        let ra = sign_payload(&a, &test_key(), None).unwrap();
        let rb = sign_payload(&b, &test_key(), None).unwrap();
        assert_eq!(ra.signature, rb.signature);
    }

    #[test]
    fn malformed_hex_is_rejected_not_a_panic() {
        let payload = serde_json::json!({"k": "v"});
        let mut receipt = sign_payload(&payload, &test_key(), None).unwrap();
        receipt.signature = "zz-not-hex".to_string();
        assert!(!verify_receipt(&receipt));
        let mut receipt = sign_payload(&payload, &test_key(), None).unwrap();
        receipt.public_key = "00".to_string();
        assert!(!verify_receipt(&receipt));
    }

    #[test]
    fn receipt_serializes_camel_case() {
        let payload = serde_json::json!({"k": "v"});
        let receipt =
            sign_payload(&payload, &test_key(), Some("2026-01-01T00:00:00Z".into())).unwrap();
        let v = serde_json::to_value(&receipt).unwrap();
        assert_eq!(v["algorithm"], "ed25519");
        assert!(v.get("publicKey").is_some());
        assert!(v.get("signedAt").is_some());
    }

    #[test]
    fn pem_round_trip_for_signing_key() {
        use ed25519_dalek::pkcs8::EncodePrivateKey;
        let key = test_key();
        let pem = key
            .to_pkcs8_pem(ed25519_dalek::pkcs8::LineEnding::LF)
            .unwrap();
        let loaded = signing_key_from_pem(&pem).unwrap();
        assert_eq!(loaded.to_bytes(), key.to_bytes());
    }
}
