use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{Error, SessionKey, SharedSecretInputs};

/// Domain-separation salt for session-key derivation. Fixed for the lifetime
/// of the protocol; changing it breaks agreement with every existing peer.
const SALT: &[u8] = b"Sanctum-E2E-Session-v1";

/// Collapses the ordered DH outputs into a single 32-byte session key.
///
/// Deterministic: both parties call this with bit-identical input material
/// and the same `info` and obtain the same key. Fails only on underlying
/// primitive failure; no fallback key is ever substituted.
pub fn derive_session_key(info: &[u8], inputs: &SharedSecretInputs) -> Result<SessionKey, Error> {
    let mut key_material = inputs.concat();
    let hkdf = Hkdf::<Sha256>::new(Some(SALT), &key_material);
    key_material.zeroize();

    let mut session_key = [0u8; 32];
    hkdf.expand(info, &mut session_key)
        .map_err(|_| Error::KeyDerivation("HKDF expansion failed".to_string()))?;

    Ok(SessionKey::from_bytes(session_key))
}
