/// Errors that can occur during session establishment and message encryption.
///
/// Every fallible operation in this crate surfaces one of these kinds to its
/// immediate caller. The crate never retries, logs, or substitutes default
/// values; retry and re-keying policy belongs to the layer above.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// RNG or primitive failure while creating a key pair.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Signature creation over a pre-key failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// A mandatory Diffie-Hellman step or bundle check failed.
    #[error("Key agreement failed: {0}")]
    KeyAgreement(String),

    /// The key-derivation primitive failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// AEAD encryption failed; no ciphertext was produced.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// AEAD tag verification failed. Tampering, the wrong session key, or key
    /// desynchronization between the parties; never a recoverable condition.
    #[error("Message authentication failed")]
    Authentication,

    /// A well-authenticated payload could not be interpreted (wrong length,
    /// invalid UTF-8). A framing bug, not a security event.
    #[error("Decoding failed: {0}")]
    Decoding(String),

    /// Transport (base64) encoding or decoding failed.
    #[error("Transport encoding failed: {0}")]
    Encoding(String),

    /// The external session store reported a failure.
    #[error("Session store failure: {0}")]
    Store(String),
}
