//! Core types for the store.

use serde_json::Value;
use std::collections::BTreeMap;

/// The in-memory mapping mirrored to disk.
pub type Table = serde_json::Map<String, Value>;

/// Result of a keyed lookup.
///
/// Every requested key is present in the selection. `None` means the key is
/// absent from the table, `Some(Value::Null)` means a null is stored under it.
pub type Selection = BTreeMap<String, Option<Value>>;
