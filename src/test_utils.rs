use std::sync::OnceLock;

use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::RsaPrivateKey;

use crate::common::dispatch::CallTarget;
use crate::common::types::Credential;
use crate::client::voice::CallScript;

pub const KEY_ID: &str = "test-key-id";

// Small key so debug-build tests stay fast. Never use outside tests.
const TEST_KEY_BITS: usize = 1024;

/// One RSA key per test process.
pub fn private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        RsaPrivateKey::new(&mut rand::thread_rng(), TEST_KEY_BITS)
            .expect("failed to generate test key")
    })
}

pub fn private_key_pem() -> String {
    private_key()
        .to_pkcs1_pem(LineEnding::LF)
        .expect("failed to encode test key")
        .to_string()
}

/// A credential backed by the shared test key.
pub fn credential() -> Credential {
    Credential::new(KEY_ID, private_key_pem())
}

/// Call targets sharing one script, one per number.
pub fn call_targets(numbers: &[&str]) -> Vec<CallTarget<CallScript>> {
    numbers
        .iter()
        .map(|number| {
            CallTarget::new(*number, CallScript::new("You are a researcher.", "Hi there!"))
        })
        .collect()
}
