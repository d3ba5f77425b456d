use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::Error;

/// Encodes raw bytes for transport as standard base64 with padding.
pub fn encode_to_transport_string(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes a transport string produced by [`encode_to_transport_string`].
pub fn decode_from_transport_string(encoded: &str) -> Result<Vec<u8>, Error> {
    STANDARD
        .decode(encoded)
        .map_err(|err| Error::Encoding(err.to_string()))
}
