use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::pss::{Signature as PssSignature, VerifyingKey};
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha2::Sha256;

use crate::common::error::{SignError, SignResult};
use crate::common::types::SigningRequest;

/// Parses a PKCS#1 (`BEGIN RSA PUBLIC KEY`) or SPKI (`BEGIN PUBLIC KEY`) PEM.
pub fn load_public_key(pem: &str) -> SignResult<RsaPublicKey> {
    let pem = pem.trim();
    RsaPublicKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPublicKey::from_public_key_pem(pem))
        .map_err(|e| SignError::SigningFailure(format!("invalid public key: {}", e)))
}

/// Verifies an RSA-PSS/SHA-256 signature over `message`.
pub fn verify_signature(
    public_key: &RsaPublicKey,
    message: &[u8],
    signature: &[u8],
) -> SignResult<bool> {
    let verifying_key = VerifyingKey::<Sha256>::new(public_key.clone());

    let signature = match PssSignature::try_from(signature) {
        Ok(sig) => sig,
        Err(_) => return Ok(false),
    };

    match verifying_key.verify(message, &signature) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false),
    }
}

/// Rebuilds the canonical message the way the trading API does and checks
/// a base64 signature against it.
pub fn verify_request(
    public_key: &RsaPublicKey,
    request: &SigningRequest,
    signature_b64: &str,
) -> SignResult<bool> {
    let signature = match BASE64.decode(signature_b64) {
        Ok(sig) => sig,
        Err(_) => return Ok(false),
    };
    verify_signature(public_key, request.canonical_message().as_bytes(), &signature)
}
