//! Codec seam between Rust types and wire text.
//!
//! The protocol layer doesn't care how messages are serialized; anything
//! implementing [`Codec`] will do. Voltgrid speaks JSON text frames, so
//! [`JsonCodec`] is the implementation everything uses today; a binary
//! codec could be swapped in without touching the bridge or the actors.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes Rust types to wire text and decodes wire text back.
///
/// `Send + Sync + 'static` because codecs are carried into long-lived
/// connection tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a wire frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a wire frame back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the text is malformed,
    /// truncated, or doesn't match the expected shape.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Envelope, MessageType};

    #[test]
    fn test_json_codec_round_trip() {
        let codec = JsonCodec;
        let env = Envelope::bare(MessageType::Pong);
        let text = codec.encode(&env).unwrap();
        let decoded: Envelope = codec.decode(&text).unwrap();
        assert_eq!(decoded, env);
    }

    #[test]
    fn test_json_codec_decode_garbage_fails() {
        let codec = JsonCodec;
        let result: Result<Envelope, _> = codec.decode("{{{{");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
