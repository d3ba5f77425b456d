use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::{Error, SessionKey, decode_from_transport_string, encode_to_transport_string};

// XChaCha20-Poly1305: 24-byte nonces are wide enough to draw at random per
// message without meaningful collision risk.
const NONCE_SIZE: usize = 24;
const TAG_SIZE: usize = 16;

/// An opaque encrypted message: `nonce || ciphertext || tag` in one buffer,
/// self-describing so decryption needs only the bytes and the session key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedMessage(Vec<u8>);

impl EncryptedMessage {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Encodes the message for the wire payload's `ciphertext` field.
    pub fn to_transport_string(&self) -> String {
        encode_to_transport_string(&self.0)
    }

    pub fn from_transport_string(encoded: &str) -> Result<Self, Error> {
        Ok(Self(decode_from_transport_string(encoded)?))
    }
}

/// Authenticated encryption of message text under a derived session key.
///
/// Stateless and cheap to construct.
#[derive(Default)]
pub struct MessageCipher;

impl MessageCipher {
    pub fn new() -> Self {
        Self
    }

    /// Encrypts UTF-8 text with a fresh random nonce.
    ///
    /// The nonce is generated internally per call and never reused or
    /// caller-supplied. Never returns partially encrypted output.
    pub fn encrypt(&self, plaintext: &str, key: &SessionKey) -> Result<EncryptedMessage, Error> {
        let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut nonce_bytes)
            .map_err(|err| Error::Encryption(err.to_string()))?;
        let nonce = XNonce::from(nonce_bytes);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| Error::Encryption("AEAD encryption failed".to_string()))?;

        let mut message = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        message.extend_from_slice(&nonce_bytes);
        message.extend_from_slice(&ciphertext);

        Ok(EncryptedMessage(message))
    }

    /// Decrypts a message, verifying its authentication tag before any
    /// plaintext is released.
    ///
    /// A tag mismatch is [`Error::Authentication`] — tampering, the wrong
    /// session key, or desynchronized parties — and is distinct from framing
    /// problems ([`Error::Decoding`]: truncated buffer, non-UTF-8 plaintext).
    pub fn decrypt(&self, message: &EncryptedMessage, key: &SessionKey) -> Result<String, Error> {
        let bytes = message.as_bytes();
        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(Error::Decoding(
                "message shorter than nonce and tag".to_string(),
            ));
        }

        let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
        let nonce = XNonce::from_slice(&bytes[..NONCE_SIZE]);

        let plaintext = cipher
            .decrypt(nonce, &bytes[NONCE_SIZE..])
            .map_err(|_| Error::Authentication)?;

        String::from_utf8(plaintext).map_err(|err| Error::Decoding(err.to_string()))
    }
}
