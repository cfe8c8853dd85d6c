//! Cryptographic primitives for SealChain

use crate::error::ChainError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{PUBLIC_KEY_SIZE, SECRET_KEY_SIZE, UNCOMPRESSED_PUBLIC_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// A 32-byte SHA-256 digest.
pub type Digest32 = [u8; 32];

/// Parses a wallet address (hex of a compressed or uncompressed public key).
pub fn public_key_from_hex(address: &str) -> Result<PublicKey, ChainError> {
    let bytes = hex::decode(address)
        .map_err(|e| ChainError::MalformedKey(format!("Invalid hex public key: {}", e)))?;
    if bytes.len() != PUBLIC_KEY_SIZE && bytes.len() != UNCOMPRESSED_PUBLIC_KEY_SIZE {
        return Err(ChainError::MalformedKey(format!(
            "Public key must be {} or {} bytes, got {}",
            PUBLIC_KEY_SIZE,
            UNCOMPRESSED_PUBLIC_KEY_SIZE,
            bytes.len()
        )));
    }
    PublicKey::from_slice(&bytes)
        .map_err(|e| ChainError::MalformedKey(format!("Invalid public key: {}", e)))
}

/// A signing-capable key handle. Its public key doubles as the wallet address.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Result<Self, ChainError> {
        let secret_key = SecretKey::new(&mut OsRng);
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::MalformedKey(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::MalformedKey(format!("Invalid secret key bytes: {}", e))
            }
        })?;

        Ok(Self::from_secret_key(secret_key))
    }

    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, ChainError> {
        let bytes = hex::decode(secret_hex)
            .map_err(|e| ChainError::MalformedKey(format!("Invalid hex secret key: {}", e)))?;
        Self::from_secret_bytes(&bytes)
    }

    /// The wallet address: hex of the compressed public key.
    pub fn address(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }

    /// True only for this key pair's exact wallet address string.
    pub fn owns_address(&self, address: &str) -> bool {
        self.address() == address
    }

    /// Signs a digest and returns the DER-encoded signature.
    pub fn sign_digest(&self, digest: &Digest32) -> Vec<u8> {
        let message = Message::from_digest(*digest);
        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);
        signature.serialize_der().to_vec()
    }
}

/// Verifies a DER signature over `digest` by the holder of `public_key_hex`.
///
/// A well-formed signature that does not match yields `Ok(false)`; only
/// undecodable keys or signatures are errors.
pub fn verify_digest(
    public_key_hex: &str,
    digest: &Digest32,
    signature_der: &[u8],
) -> Result<bool, ChainError> {
    let public_key = public_key_from_hex(public_key_hex)?;
    let mut signature = Signature::from_der(signature_der)
        .map_err(|e| ChainError::MalformedSignature(format!("Invalid DER signature: {}", e)))?;
    // libsecp256k1 only accepts low-S signatures
    signature.normalize_s();

    let message = Message::from_digest(*digest);
    Ok(SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &public_key)
        .is_ok())
}
