use ed25519_dalek::{SecretKey, Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::{Error, X25519PublicKey, X25519Secret, generate_random_seed};

/// A long-term identity key pair.
///
/// Holds an Ed25519 signing key used to authenticate pre-keys and an X25519
/// key used in Diffie-Hellman agreement. The two halves are generated from
/// independent seeds; neither secret is ever exposed through `Debug` or any
/// transport form.
pub struct IdentityKey {
    signing_key: SigningKey,
    dh_key: X25519Secret,
}

impl IdentityKey {
    pub fn generate() -> Result<Self, Error> {
        let signing_seed = generate_random_seed()?;
        let dh_seed = generate_random_seed()?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&SecretKey::from(signing_seed)),
            dh_key: X25519Secret::from(dh_seed),
        })
    }

    /// Signs data with the identity signing key.
    pub fn sign(&self, message: &[u8]) -> Result<Signature, Error> {
        self.signing_key
            .try_sign(message)
            .map_err(|err| Error::Signing(err.to_string()))
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), Error> {
        self.signing_key
            .verifying_key()
            .verify(message, signature)
            .map_err(|err| Error::KeyAgreement(err.to_string()))
    }

    /// The public Ed25519 verifying key.
    pub fn signing_key_public(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// The public X25519 key for DH operations.
    pub fn dh_key_public(&self) -> X25519PublicKey {
        self.dh_key.public_key()
    }

    pub fn dh(&self, public_key: &X25519PublicKey) -> Result<[u8; 32], Error> {
        self.dh_key.dh(public_key)
    }

    /// Serializes both secret halves for the external secure store.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[0..32].copy_from_slice(self.signing_key.as_bytes().as_slice());
        bytes[32..64].copy_from_slice(self.dh_key.as_bytes());

        bytes
    }

    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        let mut signing_seed = [0u8; 32];
        signing_seed.copy_from_slice(&bytes[0..32]);

        let mut dh_seed = [0u8; 32];
        dh_seed.copy_from_slice(&bytes[32..64]);

        Self {
            signing_key: SigningKey::from_bytes(&SecretKey::from(signing_seed)),
            dh_key: X25519Secret::from(dh_seed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_generation() {
        let identity_key = IdentityKey::generate().unwrap();

        assert!(!identity_key.signing_key.as_bytes().iter().all(|&b| b == 0));
        assert!(!identity_key.dh_key.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_signing_and_verification() {
        let identity_key = IdentityKey::generate().unwrap();
        let message = b"This is a test message";

        let signature = identity_key.sign(message).unwrap();
        assert!(identity_key.verify(message, &signature).is_ok());

        let modified_message = b"This is a modified message";
        assert!(identity_key.verify(modified_message, &signature).is_err());
    }

    #[test]
    fn test_diffie_hellman() {
        let alice_identity = IdentityKey::generate().unwrap();
        let bob_identity = IdentityKey::generate().unwrap();

        let alice_shared = alice_identity.dh(&bob_identity.dh_key_public()).unwrap();
        let bob_shared = bob_identity.dh(&alice_identity.dh_key_public()).unwrap();

        assert_eq!(alice_shared, bob_shared);
    }

    #[test]
    fn test_serialization_round_trip() {
        let original_key = IdentityKey::generate().unwrap();
        let serialized = original_key.to_bytes();
        assert_eq!(serialized.len(), 64);

        let deserialized_key = IdentityKey::from_bytes(&serialized);

        assert_eq!(
            original_key.signing_key.as_bytes(),
            deserialized_key.signing_key.as_bytes()
        );
        assert_eq!(
            original_key.dh_key.as_bytes(),
            deserialized_key.dh_key.as_bytes()
        );
    }

    #[test]
    fn test_generated_keys_are_distinct() {
        let a = IdentityKey::generate().unwrap();
        let b = IdentityKey::generate().unwrap();

        assert_ne!(a.dh_key_public(), b.dh_key_public());
        assert_ne!(a.signing_key_public(), b.signing_key_public());
    }
}
