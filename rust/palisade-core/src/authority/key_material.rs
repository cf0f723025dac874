use crate::data::Did;
use anyhow::Result;
use base64::Engine;
use bip39::{Language, Mnemonic as BipMnemonic};
use ed25519_zebra::{SigningKey as Ed25519PrivateKey, VerificationKey as Ed25519PublicKey};
use noosphere_ucan::crypto::{did::KeyConstructorSlice, KeyMaterial};
use noosphere_ucan_key_support::{
    ed25519::{bytes_to_ed25519_key, Ed25519KeyMaterial, ED25519_MAGIC_BYTES},
    rsa::{bytes_to_rsa_key, RSA_MAGIC_BYTES},
};

/// A common set of DID Key formats that are supported by this crate
pub const SUPPORTED_KEYS: &KeyConstructorSlice = &[
    (ED25519_MAGIC_BYTES, bytes_to_ed25519_key),
    (RSA_MAGIC_BYTES, bytes_to_rsa_key),
];

const ED25519_KEY_LENGTH: usize = 32;

/// Produce a unique [Ed25519KeyMaterial] for general purpose use cases
pub fn generate_ed25519_key() -> Ed25519KeyMaterial {
    let private_key = Ed25519PrivateKey::new(rand::thread_rng());
    let public_key = Ed25519PublicKey::from(&private_key);
    Ed25519KeyMaterial(public_key, Some(private_key))
}

/// Restore an [Ed25519KeyMaterial] from a BIP39 mnemonic phrase
pub fn restore_ed25519_key(mnemonic: &str) -> Result<Ed25519KeyMaterial> {
    let mnemonic = BipMnemonic::from_phrase(mnemonic, Language::English)?;
    let private_key = Ed25519PrivateKey::try_from(mnemonic.entropy())?;
    let public_key = Ed25519PublicKey::from(&private_key);

    Ok(Ed25519KeyMaterial(public_key, Some(private_key)))
}

/// Restore the authority's [Ed25519KeyMaterial] from its configured secret;
/// the secret may be either a base64-encoded ed25519 private key or a BIP39
/// mnemonic phrase.
pub fn restore_authority_key(secret: &str) -> Result<Ed25519KeyMaterial> {
    let secret = secret.trim();

    if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(secret) {
        if bytes.len() == ED25519_KEY_LENGTH {
            let private_key = Ed25519PrivateKey::try_from(bytes.as_slice())?;
            let public_key = Ed25519PublicKey::from(&private_key);
            return Ok(Ed25519KeyMaterial(public_key, Some(private_key)));
        }
    }

    restore_ed25519_key(secret)
}

/// The process-wide trust root: the authority key pair and the DID derived
/// from it. Constructed once at startup and threaded explicitly into every
/// component that anchors requirements to the root issuer.
#[derive(Clone)]
pub struct AuthorityContext {
    pub key: Ed25519KeyMaterial,
    pub identity: Did,
}

impl AuthorityContext {
    /// Derive the authority context from the configured secret
    pub async fn from_secret(secret: &str) -> Result<Self> {
        let key = restore_authority_key(secret)?;
        let identity = Did(key.get_did().await?);
        Ok(AuthorityContext { key, identity })
    }

    /// An ephemeral authority with a freshly generated key
    pub async fn ephemeral() -> Result<Self> {
        let key = generate_ed25519_key();
        let identity = Did(key.get_did().await?);
        Ok(AuthorityContext { key, identity })
    }
}

impl std::fmt::Debug for AuthorityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorityContext")
            .field("identity", &self.identity)
            .finish()
    }
}
