//! MessagePack codec.

use super::{Codec, CodecError};
use crate::types::Table;

/// Binary MessagePack image. Map keys are written as strings, so the file
/// decodes back into the same table.
#[derive(Clone, Copy, Debug, Default)]
pub struct MessagePackCodec;

impl Codec for MessagePackCodec {
    fn name(&self) -> &'static str {
        "msgpack"
    }

    fn encode(&self, table: &Table, _indent_width: usize) -> Result<Vec<u8>, CodecError> {
        Ok(rmp_serde::to_vec_named(table)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Table, CodecError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
