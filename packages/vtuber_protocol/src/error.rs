//! Error types for encoding and decoding wire frames.

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame is not JSON, has no usable `type`, or a known type has a malformed body.
    #[error("malformed frame: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode {kind}: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
