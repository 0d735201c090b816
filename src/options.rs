//! Store configuration.

use crate::codec::{Codec, JsonCodec};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Default indentation of the JSON image.
pub const DEFAULT_INDENT_WIDTH: usize = 4;

/// Options snapshotted by [`Store::open_with`](crate::Store::open_with).
///
/// Unspecified fields take their defaults through struct-update syntax:
///
/// ```ignore
/// let options = StoreOptions {
///     indent_width: 2,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Hand writes to a background thread instead of blocking the caller.
    ///
    /// Failures of detached writes are not reported by `sync` or by the
    /// mutation that issued them. Call [`Store::flush`](crate::Store::flush)
    /// to observe them.
    pub async_write: bool,

    /// Sync after every `set`, `remove` and `clear`.
    pub sync_on_write: bool,

    /// Indentation passed to the codec. Zero means compact.
    pub indent_width: usize,

    /// Write to a sibling temporary file and rename it over the target.
    pub atomic_writes: bool,

    /// Encode/decode strategy for the file image.
    #[serde(skip, default = "default_codec")]
    pub codec: Arc<dyn Codec>,
}

fn default_codec() -> Arc<dyn Codec> {
    Arc::new(JsonCodec)
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            async_write: false,
            sync_on_write: true,
            indent_width: DEFAULT_INDENT_WIDTH,
            atomic_writes: true,
            codec: default_codec(),
        }
    }
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("async_write", &self.async_write)
            .field("sync_on_write", &self.sync_on_write)
            .field("indent_width", &self.indent_width)
            .field("atomic_writes", &self.atomic_writes)
            .field("codec", &self.codec.name())
            .finish()
    }
}
