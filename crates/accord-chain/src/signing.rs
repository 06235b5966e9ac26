// Node identity signing. Verification requests and challenge filings
// are signed over the SHA-256 of their canonical JSON encoding, with
// the signature hex-encoded on the wire.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("payload could not be canonicalized: {0}")]
    Canonicalize(#[from] serde_json::Error),

    #[error("malformed signature or key: {0}")]
    Malformed(String),

    #[error("signature verification failed")]
    Invalid,
}

/// Ed25519 identity of this node.
pub struct NodeSigner {
    key: SigningKey,
}

impl NodeSigner {
    pub fn generate() -> Self {
        NodeSigner { key: SigningKey::generate(&mut OsRng) }
    }

    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Self {
        NodeSigner { key: SigningKey::from_bytes(bytes) }
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.key.verifying_key().to_bytes())
    }

    fn digest<T: Serialize>(payload: &T) -> Result<[u8; 32], SigningError> {
        let bytes = serde_json::to_vec(payload)?;
        Ok(Sha256::digest(&bytes).into())
    }

    /// Sign a payload's canonical digest, returning a hex signature.
    pub fn sign<T: Serialize>(&self, payload: &T) -> Result<String, SigningError> {
        let digest = Self::digest(payload)?;
        Ok(hex::encode(self.key.sign(&digest).to_bytes()))
    }

    /// Verify a hex signature against a payload and a hex public key.
    pub fn verify<T: Serialize>(
        payload: &T,
        signature_hex: &str,
        public_key_hex: &str,
    ) -> Result<(), SigningError> {
        let sig_bytes = hex::decode(signature_hex)
            .map_err(|e| SigningError::Malformed(e.to_string()))?;
        let sig = Signature::from_slice(&sig_bytes)
            .map_err(|e| SigningError::Malformed(e.to_string()))?;
        let key_bytes: [u8; 32] = hex::decode(public_key_hex)
            .map_err(|e| SigningError::Malformed(e.to_string()))?
            .try_into()
            .map_err(|_| SigningError::Malformed("public key must be 32 bytes".into()))?;
        let key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| SigningError::Malformed(e.to_string()))?;
        let digest = Self::digest(payload)?;
        key.verify(&digest, &sig).map_err(|_| SigningError::Invalid)
    }
}
