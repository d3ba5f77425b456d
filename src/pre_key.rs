use std::collections::HashMap;

use ed25519_dalek::ed25519::SignatureBytes;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::{
    Error, IdentityKey, OneTimePreKey, X25519PublicKey, X25519Secret,
    decode_from_transport_string, encode_to_transport_string, generate_random_seed,
};

/// A medium-term signed pre-key as defined in Signal's X3DH protocol.
///
/// Signed pre-keys (SPK) are signed with the owner's identity key so that a
/// remote party can authenticate them before agreeing on a session. They are
/// rotated periodically by policy (see [`crate::AccountConfig`]).
pub struct SignedPreKey {
    pre_key: X25519Secret,
    signature: Signature,
    id: u32, // for referencing this pre-key
}

impl SignedPreKey {
    /// Generates a fresh pre-key and signs its public half with `identity`.
    pub fn generate(id: u32, identity: &IdentityKey) -> Result<Self, Error> {
        let pre_key = X25519Secret::from(generate_random_seed()?);
        let signature = identity.sign(pre_key.public_key().as_bytes())?;

        Ok(Self {
            pre_key,
            signature,
            id,
        })
    }

    /// Returns the public component of this signed pre-key.
    pub fn public_key(&self) -> X25519PublicKey {
        self.pre_key.public_key()
    }

    /// Returns the unique identifier for this signed pre-key.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The signature over this pre-key's public half, made with the owning
    /// identity's signing key.
    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Performs a Diffie-Hellman key agreement with the other party's public key.
    pub fn dh(&self, public_key: &X25519PublicKey) -> Result<[u8; 32], Error> {
        self.pre_key.dh(public_key)
    }

    /// Serializes the signed pre-key for the external secure store.
    ///
    /// The format is:
    /// - 4 bytes: ID (big-endian u32)
    /// - 32 bytes: X25519 key
    /// - 64 bytes: signature
    pub fn to_bytes(&self) -> [u8; 100] {
        let mut result = [0u8; 100];

        result[0..4].copy_from_slice(&self.id.to_be_bytes());
        result[4..36].copy_from_slice(self.pre_key.as_bytes());
        result[36..100].copy_from_slice(&self.signature.to_bytes());

        result
    }
}

impl From<[u8; 100]> for SignedPreKey {
    fn from(bytes: [u8; 100]) -> Self {
        let mut id_bytes = [0u8; 4];
        id_bytes.copy_from_slice(&bytes[0..4]);
        let id = u32::from_be_bytes(id_bytes);

        let mut key_bytes = [0u8; 32];
        key_bytes.copy_from_slice(&bytes[4..36]);

        let mut signature_bytes = [0u8; 64];
        signature_bytes.copy_from_slice(&bytes[36..100]);

        Self {
            pre_key: X25519Secret::from(key_bytes),
            signature: Signature::from_bytes(&SignatureBytes::from(signature_bytes)),
            id,
        }
    }
}

/// A bundle of public keys used for X3DH key agreement.
///
/// Contains all the public material an initiator needs to establish a secure
/// session asynchronously:
/// - identity keys for authentication and key agreement
/// - a signed pre-key with its signature
/// - an optional one-time pre-key
pub struct PreKeyBundle {
    pub(crate) ik_public: X25519PublicKey,
    pub(crate) signing_key_public: VerifyingKey,
    pub(crate) spk_public: (u32, X25519PublicKey),
    pub(crate) signature: Signature,
    pub(crate) otpk_public: Option<(u32, X25519PublicKey)>,
}

impl PreKeyBundle {
    pub fn new(ik: &IdentityKey, spk: &SignedPreKey, otpk: Option<&OneTimePreKey>) -> Self {
        Self {
            ik_public: ik.dh_key_public(),
            signing_key_public: ik.signing_key_public(),
            spk_public: (spk.id(), spk.public_key()),
            signature: spk.signature(),
            otpk_public: otpk.map(|key| (key.id(), key.public_key())),
        }
    }

    /// Verifies that the signed pre-key was created by the owner of the
    /// claimed identity key. Nothing in this bundle may be trusted for key
    /// agreement until this check passes.
    pub fn verify(&self) -> Result<(), Error> {
        let encoded_key = self.spk_public.1.to_bytes();
        self.signing_key_public
            .verify(&encoded_key, &self.signature)
            .map_err(|_| Error::KeyAgreement("signed pre-key signature rejected".to_string()))
    }

    /// Returns the public signed pre-key (SPK_pub) from this bundle.
    pub fn spk_public(&self) -> (u32, X25519PublicKey) {
        self.spk_public
    }

    /// Returns the public identity key (IK_pub) for DH operations.
    pub fn ik_public(&self) -> X25519PublicKey {
        self.ik_public
    }

    /// Returns the public verification key for the identity.
    pub fn signing_key_public(&self) -> VerifyingKey {
        self.signing_key_public
    }

    /// Returns the optional one-time pre-key (OPK_pub) from this bundle.
    pub fn otpk_public(&self) -> Option<(u32, X25519PublicKey)> {
        self.otpk_public
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Reassembles a bundle from raw key material fetched from storage.
    pub fn from_parts(
        ik_public: [u8; 32],
        signing_key_public: [u8; 32],
        spk_public: (u32, [u8; 32]),
        signature: [u8; 64],
        otpk_public: Option<(u32, [u8; 32])>,
    ) -> Result<Self, Error> {
        Ok(Self {
            ik_public: X25519PublicKey::from(ik_public),
            signing_key_public: VerifyingKey::from_bytes(&signing_key_public)
                .map_err(|err| Error::Decoding(err.to_string()))?,
            spk_public: (spk_public.0, X25519PublicKey::from(spk_public.1)),
            signature: Signature::from_bytes(&SignatureBytes::from(signature)),
            otpk_public: otpk_public.map(|(id, otpk)| (id, X25519PublicKey::from(otpk))),
        })
    }
}

/// Wire form of a fetched pre-key bundle: base64 fields as served by the key
/// directory. Fields the directory failed to supply are `None`; decoding
/// decides which of those are fatal.
#[derive(Clone, Debug, Default)]
pub struct TransportBundle {
    pub identity_key: Option<String>,
    pub identity_signing_key: Option<String>,
    pub signed_pre_key: Option<(u32, String)>,
    pub signed_pre_key_signature: Option<String>,
    pub one_time_pre_key: Option<(u32, String)>,
}

impl TransportBundle {
    /// Decodes into a [`PreKeyBundle`].
    ///
    /// A bundle missing its identity key, signed pre-key, or signature cannot
    /// be used for key agreement and is rejected; a missing one-time pre-key
    /// means the handshake proceeds without one.
    pub fn decode(&self) -> Result<PreKeyBundle, Error> {
        let identity_key = self
            .identity_key
            .as_deref()
            .ok_or_else(|| Error::KeyAgreement("bundle is missing the identity key".to_string()))?;
        let signing_key = self.identity_signing_key.as_deref().ok_or_else(|| {
            Error::KeyAgreement("bundle is missing the identity signing key".to_string())
        })?;
        let (spk_id, spk) = self.signed_pre_key.as_ref().ok_or_else(|| {
            Error::KeyAgreement("bundle is missing the signed pre-key".to_string())
        })?;
        let signature = self.signed_pre_key_signature.as_deref().ok_or_else(|| {
            Error::KeyAgreement("bundle is missing the signed pre-key signature".to_string())
        })?;

        let ik_public = fixed::<32>(decode_from_transport_string(identity_key)?, "identity key")?;
        let signing_key_public = fixed::<32>(
            decode_from_transport_string(signing_key)?,
            "identity signing key",
        )?;
        let spk_public = fixed::<32>(decode_from_transport_string(spk)?, "signed pre-key")?;
        let signature = fixed::<64>(
            decode_from_transport_string(signature)?,
            "signed pre-key signature",
        )?;

        let otpk_public = match &self.one_time_pre_key {
            Some((id, encoded)) => Some((
                *id,
                fixed::<32>(decode_from_transport_string(encoded)?, "one-time pre-key")?,
            )),
            None => None,
        };

        PreKeyBundle::from_parts(
            ik_public,
            signing_key_public,
            (*spk_id, spk_public),
            signature,
            otpk_public,
        )
    }
}

impl From<&PreKeyBundle> for TransportBundle {
    fn from(bundle: &PreKeyBundle) -> Self {
        Self {
            identity_key: Some(encode_to_transport_string(bundle.ik_public.as_bytes())),
            identity_signing_key: Some(encode_to_transport_string(
                bundle.signing_key_public.as_bytes(),
            )),
            signed_pre_key: Some((
                bundle.spk_public.0,
                encode_to_transport_string(bundle.spk_public.1.as_bytes()),
            )),
            signed_pre_key_signature: Some(encode_to_transport_string(
                &bundle.signature.to_bytes(),
            )),
            one_time_pre_key: bundle
                .otpk_public
                .map(|(id, otpk)| (id, encode_to_transport_string(otpk.as_bytes()))),
        }
    }
}

fn fixed<const N: usize>(bytes: Vec<u8>, what: &str) -> Result<[u8; N], Error> {
    <[u8; N]>::try_from(bytes).map_err(|_| Error::Decoding(format!("{what} has unexpected length")))
}

/// Upload form of an account's complete public key material, carrying the
/// whole one-time pre-key pool. All fields are transport strings; the layer
/// above wraps them into whatever envelope the key directory expects.
pub struct AccountPreKeyBundle {
    pub identity_key: String,
    pub identity_signing_key: String,
    pub signed_pre_key: (u32, String),
    pub signed_pre_key_signature: String,
    pub one_time_pre_keys: HashMap<u32, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdentityKey;

    #[test]
    fn test_signed_pre_key_generation() {
        let identity = IdentityKey::generate().unwrap();
        let pre_key = SignedPreKey::generate(123, &identity).unwrap();

        assert_eq!(pre_key.id(), 123);
        assert!(!pre_key.public_key().as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_signed_pre_key_serialization() {
        let identity = IdentityKey::generate().unwrap();
        let original_key = SignedPreKey::generate(42, &identity).unwrap();
        let serialized = original_key.to_bytes();
        assert_eq!(serialized.len(), 100);

        let deserialized_key = SignedPreKey::from(serialized);
        assert_eq!(deserialized_key.id(), original_key.id());
        assert_eq!(
            deserialized_key.public_key().as_bytes(),
            original_key.public_key().as_bytes()
        );
        assert_eq!(
            deserialized_key.signature().to_bytes(),
            original_key.signature().to_bytes()
        );
    }

    #[test]
    fn test_diffie_hellman() {
        let alice_identity = IdentityKey::generate().unwrap();
        let bob_identity = IdentityKey::generate().unwrap();
        let alice_key = SignedPreKey::generate(1, &alice_identity).unwrap();
        let bob_key = SignedPreKey::generate(2, &bob_identity).unwrap();

        let shared_alice = alice_key.dh(&bob_key.public_key()).unwrap();
        let shared_bob = bob_key.dh(&alice_key.public_key()).unwrap();

        assert_eq!(shared_alice, shared_bob);
    }

    #[test]
    fn test_bundle_creation_and_verification() {
        let identity_key = IdentityKey::generate().unwrap();
        let pre_key = SignedPreKey::generate(99, &identity_key).unwrap();

        let bundle = PreKeyBundle::new(&identity_key, &pre_key, None);
        assert!(bundle.verify().is_ok());

        // A bundle claiming the wrong identity must fail verification
        let another_identity = IdentityKey::generate().unwrap();
        let invalid_bundle = PreKeyBundle {
            ik_public: identity_key.dh_key_public(),
            signing_key_public: another_identity.signing_key_public(),
            spk_public: (pre_key.id(), pre_key.public_key()),
            signature: pre_key.signature(),
            otpk_public: None,
        };
        assert!(invalid_bundle.verify().is_err());
    }

    #[test]
    fn test_bundle_tamper_resistance() {
        let identity_key = IdentityKey::generate().unwrap();
        let pre_key = SignedPreKey::generate(77, &identity_key).unwrap();

        let mut bundle = PreKeyBundle::new(&identity_key, &pre_key, None);

        // Swap in a pre-key the identity never signed
        let another_pre_key = SignedPreKey::generate(78, &identity_key).unwrap();
        bundle.spk_public = (another_pre_key.id(), another_pre_key.public_key());

        assert!(bundle.verify().is_err());
    }

    #[test]
    fn test_transport_round_trip() {
        let identity_key = IdentityKey::generate().unwrap();
        let pre_key = SignedPreKey::generate(7, &identity_key).unwrap();
        let otpk = OneTimePreKey::generate(11).unwrap();

        let bundle = PreKeyBundle::new(&identity_key, &pre_key, Some(&otpk));
        let transport = TransportBundle::from(&bundle);
        let decoded = transport.decode().unwrap();

        assert_eq!(decoded.ik_public(), bundle.ik_public());
        assert_eq!(decoded.spk_public(), bundle.spk_public());
        assert_eq!(decoded.otpk_public(), bundle.otpk_public());
        assert!(decoded.verify().is_ok());
    }

    #[test]
    fn test_transport_missing_mandatory_fields() {
        let identity_key = IdentityKey::generate().unwrap();
        let pre_key = SignedPreKey::generate(7, &identity_key).unwrap();
        let bundle = PreKeyBundle::new(&identity_key, &pre_key, None);

        let mut missing_identity = TransportBundle::from(&bundle);
        missing_identity.identity_key = None;
        assert!(matches!(
            missing_identity.decode(),
            Err(Error::KeyAgreement(_))
        ));

        let mut missing_spk = TransportBundle::from(&bundle);
        missing_spk.signed_pre_key = None;
        assert!(matches!(missing_spk.decode(), Err(Error::KeyAgreement(_))));
    }

    #[test]
    fn test_transport_missing_one_time_pre_key_is_fine() {
        let identity_key = IdentityKey::generate().unwrap();
        let pre_key = SignedPreKey::generate(7, &identity_key).unwrap();
        let bundle = PreKeyBundle::new(&identity_key, &pre_key, None);

        let transport = TransportBundle::from(&bundle);
        let decoded = transport.decode().unwrap();
        assert!(decoded.otpk_public().is_none());
    }

    #[test]
    fn test_transport_malformed_base64() {
        let identity_key = IdentityKey::generate().unwrap();
        let pre_key = SignedPreKey::generate(7, &identity_key).unwrap();
        let bundle = PreKeyBundle::new(&identity_key, &pre_key, None);

        let mut transport = TransportBundle::from(&bundle);
        transport.identity_key = Some("@@not-base64@@".to_string());
        assert!(matches!(transport.decode(), Err(Error::Encoding(_))));
    }

    #[test]
    fn test_transport_wrong_length() {
        let identity_key = IdentityKey::generate().unwrap();
        let pre_key = SignedPreKey::generate(7, &identity_key).unwrap();
        let bundle = PreKeyBundle::new(&identity_key, &pre_key, None);

        let mut transport = TransportBundle::from(&bundle);
        transport.identity_key = Some(encode_to_transport_string(&[0u8; 16]));
        assert!(matches!(transport.decode(), Err(Error::Decoding(_))));
    }
}
