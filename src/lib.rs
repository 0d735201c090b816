//! # jsondb
//!
//! An embedded, single-file, write-through key-value store. String keys map
//! to arbitrary JSON values held in memory and mirrored to one file on disk.
//!
//! ## Core Concepts
//!
//! - **Table**: the in-memory mapping, replaced wholesale from the file at open
//! - **Write-through**: with `sync_on_write` every mutation rewrites the file
//! - **Detached writes**: with `async_write` the rewrite happens on a
//!   background thread, in issue order, and failures are only visible
//!   through [`Store::flush`]
//! - **Codec**: the pluggable encode/decode pair (JSON by default)
//!
//! ## Example
//!
//! ```ignore
//! use jsondb::{Store, StoreOptions};
//! use serde_json::json;
//!
//! let mut store = Store::open_with("db.json", StoreOptions {
//!     indent_width: 2,
//!     ..Default::default()
//! })?;
//!
//! store.set("a", 1)?;
//! store.set("x", json!({"a": [1, 2, 3]}))?;
//!
//! let picked = store.get(["a", "missing"]);
//! assert_eq!(picked["a"], Some(json!(1)));
//! assert_eq!(picked["missing"], None);
//! ```

pub mod codec;
mod disk;
pub mod error;
pub mod options;
pub mod store;
pub mod types;
mod writer;

// Re-exports
pub use codec::{Codec, CodecError, JsonCodec, MessagePackCodec};
pub use error::{Result, StoreError};
pub use options::{StoreOptions, DEFAULT_INDENT_WIDTH};
pub use store::{SharedStore, Store};
pub use types::{Selection, Table};
