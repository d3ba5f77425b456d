use std::collections::HashMap;

use zeroize::Zeroize;

use crate::{Error, X25519PublicKey};

/// A 32-byte symmetric session key. Wiped on drop; `Debug` is redacted.
#[derive(Clone)]
pub struct SessionKey([u8; 32]);

impl SessionKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Zeroize for SessionKey {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// The per-conversation secrets produced by a completed handshake: the
/// symmetric encryption key and the initiator's ephemeral public key, which
/// the responder needs to mirror the agreement.
#[derive(Clone, Debug)]
pub struct SessionKeys {
    encryption_key: SessionKey,
    sender_ephemeral_public: X25519PublicKey,
}

impl SessionKeys {
    pub fn new(encryption_key: SessionKey, sender_ephemeral_public: X25519PublicKey) -> Self {
        Self {
            encryption_key,
            sender_ephemeral_public,
        }
    }

    pub fn encryption_key(&self) -> &SessionKey {
        &self.encryption_key
    }

    /// The ephemeral public key the initiator must transmit alongside the
    /// first message.
    pub fn sender_ephemeral_public(&self) -> X25519PublicKey {
        self.sender_ephemeral_public
    }
}

/// Contract for the external secure store holding per-conversation keys.
///
/// Implementations own persistence and transactional guarantees; this core
/// only ever calls these three operations and assumes nothing about the
/// storage medium.
pub trait SessionStore {
    fn get(&self, conversation_id: &str) -> Result<Option<SessionKeys>, Error>;

    fn put(&mut self, conversation_id: &str, keys: SessionKeys) -> Result<(), Error>;

    /// Stores `keys` only when no session exists for the conversation yet,
    /// returning whether the insert happened. Concurrent establishment
    /// attempts for one conversation must resolve to a single persisted key;
    /// losers of the race discard their derivation and re-read the winner's.
    fn put_if_absent(&mut self, conversation_id: &str, keys: SessionKeys) -> Result<bool, Error>;
}

/// HashMap-backed reference implementation of [`SessionStore`].
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: HashMap<String, SessionKeys>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, conversation_id: &str) -> Result<Option<SessionKeys>, Error> {
        Ok(self.sessions.get(conversation_id).cloned())
    }

    fn put(&mut self, conversation_id: &str, keys: SessionKeys) -> Result<(), Error> {
        self.sessions.insert(conversation_id.to_string(), keys);
        Ok(())
    }

    fn put_if_absent(&mut self, conversation_id: &str, keys: SessionKeys) -> Result<bool, Error> {
        if self.sessions.contains_key(conversation_id) {
            return Ok(false);
        }
        self.sessions.insert(conversation_id.to_string(), keys);
        Ok(true)
    }
}
