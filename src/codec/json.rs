//! JSON codec (the default).

use super::{Codec, CodecError};
use crate::types::Table;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Standard JSON. An indent width of zero produces compact output.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, table: &Table, indent_width: usize) -> Result<Vec<u8>, CodecError> {
        if indent_width == 0 {
            return Ok(serde_json::to_vec(table)?);
        }

        let indent = vec![b' '; indent_width];
        let mut out = Vec::new();
        let mut serializer =
            Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&indent));
        table.serialize(&mut serializer)?;
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Table, CodecError> {
        // Top level must be an object; arrays and scalars are rejected here.
        Ok(serde_json::from_slice(bytes)?)
    }
}
