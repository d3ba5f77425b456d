use rand::TryRngCore;
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::Error;

/// Draws a fresh 32-byte seed from the operating system CSPRNG.
pub fn generate_random_seed() -> Result<[u8; 32], Error> {
    let mut seed = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut seed)
        .map_err(|err| Error::KeyGeneration(err.to_string()))?;
    Ok(seed)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct X25519PublicKey(PublicKey);

impl X25519PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

impl From<[u8; 32]> for X25519PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(PublicKey::from(bytes))
    }
}

impl From<PublicKey> for X25519PublicKey {
    fn from(value: PublicKey) -> Self {
        Self(value)
    }
}

impl AsRef<PublicKey> for X25519PublicKey {
    fn as_ref(&self) -> &PublicKey {
        &self.0
    }
}

#[derive(Clone)]
pub struct X25519Secret(StaticSecret);

impl X25519Secret {
    /// Diffie-Hellman with contributory-behaviour enforcement: a low-order or
    /// identity remote point yields an all-zero output and is rejected.
    pub(crate) fn dh(&self, public_key: &X25519PublicKey) -> Result<[u8; 32], Error> {
        let shared = self.0.diffie_hellman(public_key.as_ref());
        if !shared.was_contributory() {
            return Err(Error::KeyAgreement(
                "low-order remote public key".to_string(),
            ));
        }
        Ok(shared.to_bytes())
    }

    pub(crate) fn public_key(&self) -> X25519PublicKey {
        let pub_key = PublicKey::from(&self.0);
        pub_key.into()
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl From<[u8; 32]> for X25519Secret {
    fn from(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }
}

impl Zeroize for X25519Secret {
    fn zeroize(&mut self) {
        self.0.zeroize()
    }
}
