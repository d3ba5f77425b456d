use std::collections::HashMap;

use crate::{Error, X25519PublicKey, X25519Secret, generate_random_seed};

/// A single-use pre-key as defined in Signal's X3DH protocol.
///
/// Consumed by at most one handshake; the store removes it from the pool the
/// moment it is handed out.
#[derive(Clone)]
pub struct OneTimePreKey {
    pre_key: X25519Secret,
    id: u32,
    created_at: std::time::SystemTime,
    used: bool,
}

impl OneTimePreKey {
    pub fn generate(id: u32) -> Result<Self, Error> {
        Ok(Self {
            pre_key: X25519Secret::from(generate_random_seed()?),
            id,
            created_at: std::time::SystemTime::now(),
            used: false,
        })
    }

    pub fn public_key(&self) -> X25519PublicKey {
        self.pre_key.public_key()
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn mark_as_used(&mut self) {
        self.used = true;
    }

    /// Performs DH with the sender's ephemeral key, consuming the pre-key.
    pub fn dh(self, public_key: &X25519PublicKey) -> Result<[u8; 32], Error> {
        if self.used {
            return Err(Error::KeyAgreement(
                "one-time pre-key already used".to_string(),
            ));
        }

        self.pre_key.dh(public_key)
    }

    /// Serializes this pre-key for the external secure store.
    ///
    /// The format is:
    /// - 4 bytes: ID (big-endian u32)
    /// - 8 bytes: creation timestamp (big-endian u64 seconds since UNIX epoch)
    /// - 1 byte: used flag
    /// - 32 bytes: X25519 key
    pub fn to_bytes(&self) -> [u8; 45] {
        let mut result = [0u8; 45];

        result[0..4].copy_from_slice(&self.id.to_be_bytes());

        let timestamp = self
            .created_at
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        result[4..12].copy_from_slice(&timestamp.to_be_bytes());

        result[12..13].copy_from_slice(if self.used { &[0x1] } else { &[0] });

        result[13..45].copy_from_slice(self.pre_key.as_bytes());

        result
    }
}

impl From<[u8; 45]> for OneTimePreKey {
    fn from(bytes: [u8; 45]) -> Self {
        let mut id_bytes = [0u8; 4];
        id_bytes.copy_from_slice(&bytes[0..4]);
        let id = u32::from_be_bytes(id_bytes);

        let mut timestamp_bytes = [0u8; 8];
        timestamp_bytes.copy_from_slice(&bytes[4..12]);
        let timestamp = u64::from_be_bytes(timestamp_bytes);
        let created_at = std::time::UNIX_EPOCH + std::time::Duration::from_secs(timestamp);

        let used = bytes[12] != 0;

        let mut key_bytes = [0u8; 32];
        key_bytes.copy_from_slice(&bytes[13..45]);

        Self {
            pre_key: X25519Secret::from(key_bytes),
            id,
            created_at,
            used,
        }
    }
}

/// Outcome of a batch generation request.
///
/// A batch can come back short when individual key generations fail; the
/// requested and generated counts are both visible so callers decide how to
/// handle a partial batch instead of keys silently going missing.
#[derive(Clone, Debug)]
pub struct PreKeyBatch {
    requested: usize,
    generated_ids: Vec<u32>,
}

impl PreKeyBatch {
    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn generated(&self) -> usize {
        self.generated_ids.len()
    }

    pub fn ids(&self) -> &[u32] {
        &self.generated_ids
    }

    pub fn is_complete(&self) -> bool {
        self.generated_ids.len() == self.requested
    }
}

/// Pool of unused one-time pre-keys, indexed by id.
pub struct OneTimePreKeyStore {
    keys: HashMap<u32, OneTimePreKey>,
    next_id: u32,
    max_keys: usize,
}

impl OneTimePreKeyStore {
    pub fn new(max_keys: usize) -> Self {
        Self {
            keys: HashMap::new(),
            next_id: 1,
            max_keys,
        }
    }

    /// Generates `count` fresh pre-keys and adds them to the pool.
    ///
    /// Fails only when not a single key could be generated; otherwise returns
    /// a [`PreKeyBatch`] which may be shorter than requested.
    pub fn generate(&mut self, count: usize) -> Result<PreKeyBatch, Error> {
        let mut generated_ids = Vec::with_capacity(count);
        let mut last_failure = None;

        for _ in 0..count {
            let id = self.next_id;
            match OneTimePreKey::generate(id) {
                Ok(key) => {
                    self.next_id += 1;
                    self.keys.insert(id, key);
                    generated_ids.push(id);
                }
                Err(err) => last_failure = Some(err),
            }
        }

        if generated_ids.is_empty() && count > 0 {
            return Err(last_failure.unwrap_or_else(|| {
                Error::KeyGeneration("one-time pre-key batch produced no keys".to_string())
            }));
        }

        Ok(PreKeyBatch {
            requested: count,
            generated_ids,
        })
    }

    pub fn get(&self, id: u32) -> Option<&OneTimePreKey> {
        self.keys.get(&id)
    }

    /// Exports the public halves of the pool for upload.
    pub fn public_keys(&self) -> HashMap<u32, X25519PublicKey> {
        let mut indexed_pks = HashMap::new();
        self.keys.iter().for_each(|(idx, otpk)| {
            indexed_pks.insert(*idx, otpk.public_key());
        });

        indexed_pks
    }

    /// Removes and returns a pre-key, making it unavailable to any later
    /// handshake. `None` means the key was never here or already consumed.
    pub fn take(&mut self, id: u32) -> Option<OneTimePreKey> {
        self.keys.remove(&id)
    }

    pub fn count(&self) -> usize {
        self.keys.len()
    }

    /// Tops the pool back up to its configured maximum.
    pub fn replenish(&mut self) -> Result<PreKeyBatch, Error> {
        let needed = self.max_keys.saturating_sub(self.keys.len());
        self.generate(needed)
    }
}
