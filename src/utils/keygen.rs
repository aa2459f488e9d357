use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use rand::rngs::OsRng;

const KEY_BITS: usize = 2048;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Output directory, defaults to the working directory
    let dir = std::path::PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| ".".to_string()));

    let mut rng = OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, KEY_BITS)?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_path = dir.join("private_key.pem");
    let public_path = dir.join("public_key.pem");

    // Point KALSHI_PRIVATE_KEY_PATH at this file; upload the public key to the exchange.
    private_key.write_pkcs1_pem_file(&private_path, LineEnding::LF)?;
    println!("Private key saved to {}", private_path.display());

    public_key.write_pkcs1_pem_file(&public_path, LineEnding::LF)?;
    println!("Public key saved to {}", public_path.display());

    Ok(())
}
