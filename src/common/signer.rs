use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::pss::BlindedSigningKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::common::clock::next_timestamp_millis;
use crate::common::error::{SignError, SignResult};
use crate::common::types::{AuthHeaders, Credential, Method, Signature, SigningRequest};

/// Signs trading API requests with RSA-PSS over SHA-256.
///
/// The PSS salt is random, so two signatures over the same request differ;
/// only verification against the public key is meaningful.
pub struct RequestSigner {
    key_id: String,
    signing_key: BlindedSigningKey<Sha256>,
    public_key: RsaPublicKey,
}

impl RequestSigner {
    pub fn from_credential(credential: &Credential) -> SignResult<Self> {
        let key_id = present(&credential.key_id).ok_or(SignError::CredentialMissing("key id"))?;
        let pem = present(&credential.private_key_pem)
            .ok_or(SignError::CredentialMissing("private key"))?;

        let private_key = parse_private_key(pem)?;
        let public_key = RsaPublicKey::from(&private_key);

        Ok(Self {
            key_id: key_id.to_string(),
            signing_key: BlindedSigningKey::<Sha256>::new(private_key),
            public_key,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    pub fn sign(&self, request: &SigningRequest) -> SignResult<Signature> {
        let message = request.canonical_message();
        let mut rng = rand::thread_rng();
        let signature = self
            .signing_key
            .try_sign_with_rng(&mut rng, message.as_bytes())
            .map_err(|e| SignError::SigningFailure(e.to_string()))?;
        Ok(Signature::from_bytes(signature.to_vec()))
    }

    /// Signs a request stamped with the process clock and returns the
    /// headers the trading API expects.
    pub fn auth_headers(&self, method: Method, path: &str, body: &str) -> SignResult<AuthHeaders> {
        let request = SigningRequest::new(next_timestamp_millis(), method, path, body);
        let signature = self.sign(&request)?;
        Ok(AuthHeaders {
            key_id: self.key_id.clone(),
            signature: signature.to_base64(),
            timestamp: request.timestamp.to_string(),
        })
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner").field("key_id", &self.key_id).finish_non_exhaustive()
    }
}

/// One-shot signing for callers that do not keep a signer around.
pub fn sign_request(request: &SigningRequest, credential: &Credential) -> SignResult<Signature> {
    RequestSigner::from_credential(credential)?.sign(request)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Accepts both `BEGIN RSA PRIVATE KEY` (PKCS#1) and `BEGIN PRIVATE KEY`
/// (PKCS#8) encodings, since the trading API hands out either.
fn parse_private_key(pem: &str) -> SignResult<RsaPrivateKey> {
    let pem = pem.trim();
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|e| SignError::SigningFailure(format!("invalid private key: {}", e)))
}
