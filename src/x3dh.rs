use zeroize::Zeroize;

use crate::{
    Error, IdentityKey, OneTimePreKey, PreKeyBundle, SessionKeys, SignedPreKey, X25519PublicKey,
    X25519Secret, derive_session_key, generate_random_seed,
};

pub(crate) struct EphemeralKey {
    key: X25519Secret,
}

impl EphemeralKey {
    pub(crate) fn generate() -> Result<Self, Error> {
        Ok(Self {
            key: X25519Secret::from(generate_random_seed()?),
        })
    }

    pub(crate) fn public_key(&self) -> X25519PublicKey {
        self.key.public_key()
    }

    pub(crate) fn dh(&self, public: &X25519PublicKey) -> Result<[u8; 32], Error> {
        self.key.dh(public)
    }
}

impl Drop for EphemeralKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// The ordered Diffie-Hellman outputs feeding session-key derivation.
///
/// Both parties must concatenate their DH outputs identically or the derived
/// keys diverge, so the positions are fixed by construction and cannot be
/// reordered by callers:
///
/// - index 0: DH(IK_initiator, SPK_responder) — mandatory
/// - index 1: DH(EK_initiator, IK_responder) — mandatory
/// - index 2: DH(EK_initiator, SPK_responder) — mandatory
/// - index 3: DH(EK_initiator, OPK_responder) — present only when a one-time
///   pre-key was used
///
/// A missing one-time term is omitted entirely, never replaced with zeroes.
pub struct SharedSecretInputs {
    outputs: Vec<[u8; 32]>,
}

impl SharedSecretInputs {
    pub fn new(dh1: [u8; 32], dh2: [u8; 32], dh3: [u8; 32]) -> Self {
        Self {
            outputs: vec![dh1, dh2, dh3],
        }
    }

    pub fn push_one_time(&mut self, dh4: [u8; 32]) {
        self.outputs.push(dh4);
    }

    pub fn terms(&self) -> usize {
        self.outputs.len()
    }

    /// IKM = DH1 || DH2 || DH3 [|| DH4]
    pub(crate) fn concat(&self) -> Vec<u8> {
        let mut material = Vec::with_capacity(self.outputs.len() * 32);
        for output in &self.outputs {
            material.extend_from_slice(output);
        }
        material
    }
}

impl Drop for SharedSecretInputs {
    fn drop(&mut self) {
        for output in &mut self.outputs {
            output.zeroize();
        }
    }
}

/// Implementation of the X3DH (Extended Triple Diffie-Hellman) key agreement
/// protocol.
///
/// X3DH lets two parties establish a shared secret asynchronously, even if
/// one party is offline. Stateless and cheap to construct; build one wherever
/// a handshake is performed rather than sharing a global instance.
pub struct X3dh {
    info: Vec<u8>, // Application-specific info for the KDF
}

impl X3dh {
    /// Creates a new X3DH protocol instance with the specified application info.
    ///
    /// The info parameter is context for the key derivation, ensuring that
    /// keys derived in different applications differ even for identical key
    /// material.
    pub fn new(info: &[u8]) -> Self {
        Self {
            info: info.to_vec(),
        }
    }

    /// Initiates a key agreement against a responder's pre-key bundle.
    ///
    /// The initiator's side of X3DH:
    /// 1. Verifies the bundle's signed pre-key signature — an unverifiable
    ///    bundle is never used for any DH computation
    /// 2. Generates a fresh ephemeral key pair
    /// 3. Computes the DH terms in their fixed order
    /// 4. Derives the session key
    ///
    /// Any mandatory DH failure aborts with [`Error::KeyAgreement`]; a bundle
    /// without a one-time pre-key simply omits the fourth term.
    pub fn initiate(
        &self,
        identity: &IdentityKey,
        bundle: &PreKeyBundle,
    ) -> Result<SessionKeys, Error> {
        bundle.verify()?;

        let ephemeral = EphemeralKey::generate()?;

        // DH1 = DH(IKa, SPKb)
        let dh1 = identity.dh(&bundle.spk_public().1)?;
        // DH2 = DH(EKa, IKb)
        let dh2 = ephemeral.dh(&bundle.ik_public())?;
        // DH3 = DH(EKa, SPKb)
        let dh3 = ephemeral.dh(&bundle.spk_public().1)?;

        let mut inputs = SharedSecretInputs::new(dh1, dh2, dh3);

        // DH4 = DH(EKa, OPKb)
        if let Some((_, otpk)) = bundle.otpk_public() {
            inputs.push_one_time(ephemeral.dh(&otpk)?);
        }

        let encryption_key = derive_session_key(&self.info, &inputs)?;

        Ok(SessionKeys::new(encryption_key, ephemeral.public_key()))
    }

    /// Processes an initiation from the responder's side.
    ///
    /// The algebraic mirror of [`X3dh::initiate`]: DH is commutative, so the
    /// same four terms computed with the secret/public roles swapped produce
    /// bit-identical input material — provided both sides made the same
    /// one-time pre-key selection.
    pub fn accept(
        &self,
        identity: &IdentityKey,
        signed_pre_key: &SignedPreKey,
        one_time_pre_key: Option<OneTimePreKey>,
        sender_identity_public: &X25519PublicKey,
        sender_ephemeral_public: &X25519PublicKey,
    ) -> Result<SessionKeys, Error> {
        // DH1 = DH(SPKb, IKa)
        let dh1 = signed_pre_key.dh(sender_identity_public)?;
        // DH2 = DH(IKb, EKa)
        let dh2 = identity.dh(sender_ephemeral_public)?;
        // DH3 = DH(SPKb, EKa)
        let dh3 = signed_pre_key.dh(sender_ephemeral_public)?;

        let mut inputs = SharedSecretInputs::new(dh1, dh2, dh3);

        // DH4 = DH(OPKb, EKa)
        if let Some(otpk) = one_time_pre_key {
            inputs.push_one_time(otpk.dh(sender_ephemeral_public)?);
        }

        let encryption_key = derive_session_key(&self.info, &inputs)?;

        Ok(SessionKeys::new(encryption_key, *sender_ephemeral_public))
    }
}
