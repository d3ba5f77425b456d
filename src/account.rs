use crate::{
    AccountConfig, AccountPreKeyBundle, Error, IdentityKey, OneTimePreKeyStore, PreKeyBatch,
    PreKeyBundle, SessionKeys, SignedPreKey, X3dh, X25519PublicKey, encode_to_transport_string,
};

/// Orchestration glue binding the identity, pre-key pool, and X3DH handshake
/// together for one device.
///
/// The account owns its secret key material in memory; persisting it (and the
/// derived [`SessionKeys`]) is the external secure store's job.
pub struct Account {
    ik: IdentityKey,

    spk: SignedPreKey,
    spk_last_rotation: std::time::SystemTime,
    otpk_store: OneTimePreKeyStore,

    config: AccountConfig,
}

impl Account {
    /// Creates an account with a fresh identity, signed pre-key, and an
    /// initial one-time pre-key batch.
    pub fn new(config: Option<AccountConfig>) -> Result<Self, Error> {
        let config = config.unwrap_or_default();

        let ik = IdentityKey::generate()?;
        let spk = SignedPreKey::generate(1, &ik)?;

        let mut otpk_store = OneTimePreKeyStore::new(config.max_one_time_pre_keys);
        otpk_store.generate(config.one_time_pre_key_batch_size)?;

        Ok(Self {
            ik,
            spk,
            spk_last_rotation: std::time::SystemTime::now(),
            otpk_store,
            config,
        })
    }

    pub fn ik_public(&self) -> X25519PublicKey {
        self.ik.dh_key_public()
    }

    pub fn spk_id(&self) -> u32 {
        self.spk.id()
    }

    /// Bundle for a single incoming handshake. `one_time_pre_key_id` selects
    /// a pool key without consuming it; consumption happens when the
    /// handshake actually arrives in [`Account::create_inbound_session`].
    pub fn prekey_bundle(&self, one_time_pre_key_id: Option<u32>) -> Result<PreKeyBundle, Error> {
        let otpk = match one_time_pre_key_id {
            Some(id) => Some(self.otpk_store.get(id).ok_or_else(|| {
                Error::KeyAgreement("unknown one-time pre-key id".to_string())
            })?),
            None => None,
        };

        Ok(PreKeyBundle::new(&self.ik, &self.spk, otpk))
    }

    /// The account's complete public key material in upload form.
    pub fn published_bundle(&self) -> AccountPreKeyBundle {
        AccountPreKeyBundle {
            identity_key: encode_to_transport_string(self.ik.dh_key_public().as_bytes()),
            identity_signing_key: encode_to_transport_string(
                self.ik.signing_key_public().as_bytes(),
            ),
            signed_pre_key: (
                self.spk.id(),
                encode_to_transport_string(self.spk.public_key().as_bytes()),
            ),
            signed_pre_key_signature: encode_to_transport_string(&self.spk.signature().to_bytes()),
            one_time_pre_keys: self
                .otpk_store
                .public_keys()
                .iter()
                .map(|(id, otpk)| (*id, encode_to_transport_string(otpk.as_bytes())))
                .collect(),
        }
    }

    /// Establishes a session with another party from their fetched bundle.
    ///
    /// The caller transmits the returned ephemeral public key (plus the
    /// bundle's key ids) alongside the first message and hands the keys to
    /// the session store.
    pub fn create_outbound_session(
        &self,
        their_bundle: &PreKeyBundle,
    ) -> Result<SessionKeys, Error> {
        let x3dh = X3dh::new(&self.config.protocol_info);
        x3dh.initiate(&self.ik, their_bundle)
    }

    /// Processes an incoming session initiation.
    ///
    /// The referenced one-time pre-key is removed from the pool before use,
    /// so a second initiation naming the same key id fails rather than
    /// silently reusing it.
    pub fn create_inbound_session(
        &mut self,
        their_ik_public: &X25519PublicKey,
        their_ephemeral_public: &X25519PublicKey,
        spk_id: u32,
        one_time_pre_key_id: Option<u32>,
    ) -> Result<SessionKeys, Error> {
        if self.spk.id() != spk_id {
            return Err(Error::KeyAgreement("unknown signed pre-key id".to_string()));
        }

        let one_time_pre_key = match one_time_pre_key_id {
            Some(id) => Some(self.otpk_store.take(id).ok_or_else(|| {
                Error::KeyAgreement("one-time pre-key not found or already consumed".to_string())
            })?),
            None => None,
        };

        let x3dh = X3dh::new(&self.config.protocol_info);
        x3dh.accept(
            &self.ik,
            &self.spk,
            one_time_pre_key,
            their_ik_public,
            their_ephemeral_public,
        )
    }

    /// Rotates the signed pre-key once the configured interval has elapsed.
    /// Returns the new key's id and public half when rotation occurred.
    pub fn rotate_spk(&mut self) -> Result<Option<(u32, X25519PublicKey)>, Error> {
        let now = std::time::SystemTime::now();
        let elapsed = now
            .duration_since(self.spk_last_rotation)
            .unwrap_or_default();
        if elapsed < self.config.spk_rotation_interval {
            return Ok(None);
        }

        let new_id = self.spk.id() + 1;
        self.spk = SignedPreKey::generate(new_id, &self.ik)?;
        self.spk_last_rotation = now;

        Ok(Some((new_id, self.spk.public_key())))
    }

    /// Tops the one-time pre-key pool back up when it has dropped below the
    /// configured minimum. `None` means no replenishment was needed.
    pub fn replenish_otpks(&mut self) -> Result<Option<PreKeyBatch>, Error> {
        if self.otpk_store.count() >= self.config.min_one_time_pre_keys {
            return Ok(None);
        }
        self.otpk_store.replenish().map(Some)
    }

    pub fn one_time_pre_key_count(&self) -> usize {
        self.otpk_store.count()
    }

    pub fn one_time_pre_key_ids(&self) -> Vec<u32> {
        self.otpk_store.public_keys().keys().copied().collect()
    }
}
