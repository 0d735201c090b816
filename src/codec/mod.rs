//! Pluggable encode/decode strategies for the on-disk image.
//!
//! A codec turns the whole [`Table`] into bytes and back. The store never
//! looks inside the bytes, so any self-describing format works.

mod json;
mod msgpack;

pub use json::JsonCodec;
pub use msgpack::MessagePackCodec;

use crate::types::Table;
use thiserror::Error;

/// Errors raised by a codec.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MessagePack encode error: {0}")]
    MessagePackEncode(#[from] rmp_serde::encode::Error),

    #[error("MessagePack decode error: {0}")]
    MessagePackDecode(#[from] rmp_serde::decode::Error),

    #[error("{0}")]
    Custom(String),
}

/// Encode/decode pair for the whole table.
pub trait Codec: Send + Sync {
    /// Short name used in logs and `Debug` output.
    fn name(&self) -> &'static str;

    /// Encode the table. `indent_width` is a formatting hint; binary codecs
    /// ignore it.
    fn encode(&self, table: &Table, indent_width: usize) -> Result<Vec<u8>, CodecError>;

    /// Decode a full file image back into a table.
    fn decode(&self, bytes: &[u8]) -> Result<Table, CodecError>;
}
