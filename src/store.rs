//! Main Store struct tying the table, codec and file together.

use crate::disk::{self, Probe};
use crate::error::{Result, StoreError};
use crate::options::StoreOptions;
use crate::types::{Selection, Table};
use crate::writer::DetachedWriter;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A store shared between threads, every operation behind one lock.
pub type SharedStore = Arc<Mutex<Store>>;

/// An in-memory table mirrored to a single file.
///
/// The store assumes a single owner. Mutations take `&mut self`; to share one
/// store between threads use [`Store::into_shared`].
///
/// Nothing is flushed on drop. The last state is durable only if a sync was
/// issued for it (and, with `async_write`, has been applied by the background
/// writer, which is joined when the store is dropped).
pub struct Store {
    /// Backing file.
    path: PathBuf,

    /// Options snapshot taken at open.
    options: StoreOptions,

    /// Current contents.
    table: Table,

    /// Present only when `async_write` is set.
    writer: Option<DetachedWriter>,
}

impl Store {
    /// Open the store at `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, StoreOptions::default())
    }

    /// Open the store at `path`.
    ///
    /// A missing or empty file yields an empty table. A non-empty file that
    /// does not decode fails with [`StoreError::CorruptStore`] and is left as
    /// it is. Opening never writes to disk.
    pub fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(StoreError::InvalidArgument("missing file path".into()));
        }
        let path = path.to_path_buf();

        let table = match disk::probe(&path)? {
            Probe::Missing => {
                debug!(path = %path.display(), "no store file yet, starting empty");
                Table::new()
            }
            Probe::Empty => {
                debug!(path = %path.display(), "store file is empty, starting empty");
                Table::new()
            }
            Probe::Contents(bytes) => {
                let table = options.codec.decode(&bytes).map_err(|source| {
                    warn!(path = %path.display(), error = %source, "store file failed to decode");
                    StoreError::CorruptStore {
                        path: path.clone(),
                        source,
                    }
                })?;
                info!(path = %path.display(), keys = table.len(), "loaded store");
                table
            }
        };

        let writer = if options.async_write {
            Some(DetachedWriter::spawn(path.clone(), options.atomic_writes)?)
        } else {
            None
        };

        Ok(Self {
            path,
            options,
            table,
            writer,
        })
    }

    /// Move the store behind a mutex for use from several threads.
    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    // --- Reads ---

    /// The whole table.
    pub fn get_all(&self) -> &Table {
        &self.table
    }

    /// Look up several keys at once.
    ///
    /// Every requested key appears in the result; keys missing from the table
    /// map to `None`.
    pub fn get<I, K>(&self, keys: I) -> Selection
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter()
            .map(|key| {
                let key = key.as_ref();
                (key.to_string(), self.table.get(key).cloned())
            })
            .collect()
    }

    /// Value stored under a single key.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.table.get(key)
    }

    /// Value under `key` deserialized into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.table
            .get(key)
            .map(|value| {
                <T as Deserialize>::deserialize(value).map_err(|source| StoreError::Decode {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Whether `key` is stored.
    pub fn contains_key(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    /// Stored keys in table order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table has no keys.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Backing file path as given to open.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Options snapshot taken at open.
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    // --- Mutations ---

    /// Insert or overwrite `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        self.table.insert(key.into(), value.into());
        self.after_write()
    }

    /// Remove each listed key. Absent keys are ignored.
    pub fn remove<I, K>(&mut self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        for key in keys {
            self.table.remove(key.as_ref());
        }
        self.after_write()
    }

    /// Drop every key.
    pub fn clear(&mut self) -> Result<()> {
        self.table = Table::new();
        self.after_write()
    }

    fn after_write(&mut self) -> Result<()> {
        if self.options.sync_on_write {
            self.sync()
        } else {
            Ok(())
        }
    }

    // --- Persistence ---

    /// Write the current table to disk.
    ///
    /// In synchronous mode encode and write failures are returned. With
    /// `async_write` the write is handed to the background writer and this
    /// returns `Ok(())` right away; failures are logged and only surface
    /// through [`Store::flush`].
    pub fn sync(&self) -> Result<()> {
        let encoded = self
            .options
            .codec
            .encode(&self.table, self.options.indent_width)
            .map_err(StoreError::Encode);

        match &self.writer {
            None => disk::write_image(&self.path, &encoded?, self.options.atomic_writes),
            Some(writer) => {
                match encoded {
                    Ok(image) => writer.submit(image),
                    Err(e) => {
                        warn!(path = %self.path.display(), error = %e, "detached sync failed to encode");
                        writer.record_failure(e);
                    }
                }
                Ok(())
            }
        }
    }

    /// Wait for all detached writes issued so far and report the first
    /// failure among them that has not been reported yet.
    ///
    /// Without `async_write` every sync already completed, so this returns
    /// `Ok(())` immediately.
    pub fn flush(&self) -> Result<()> {
        match &self.writer {
            Some(writer) => writer.wait(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("options", &self.options)
            .field("keys", &self.table.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn gated() -> StoreOptions {
        StoreOptions {
            sync_on_write: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_path_rejected() {
        let result = Store::open("");
        assert!(matches!(result, Err(StoreError::InvalidArgument(_))));
    }

    #[test]
    fn test_set_get_remove() {
        let dir = TempDir::new().unwrap();
        let mut store = Store::open_with(dir.path().join("db.json"), gated()).unwrap();

        store.set("a", 1).unwrap();
        store.set("b", "two").unwrap();
        store.set("a", json!([1, 2])).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get_value("a"), Some(&json!([1, 2])));

        store.remove(["a", "nope"]).unwrap();
        assert!(!store.contains_key("a"));
        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_get_marks_absent_keys() {
        let dir = TempDir::new().unwrap();
        let mut store = Store::open_with(dir.path().join("db.json"), gated()).unwrap();
        store.set("a", 1).unwrap();
        store.set("n", Value::Null).unwrap();

        let selection = store.get(["a", "n", "missing"]);
        assert_eq!(selection.len(), 3);
        assert_eq!(selection["a"], Some(json!(1)));
        assert_eq!(selection["n"], Some(Value::Null));
        assert_eq!(selection["missing"], None);
    }

    #[test]
    fn test_get_as_typed() {
        let dir = TempDir::new().unwrap();
        let mut store = Store::open_with(dir.path().join("db.json"), gated()).unwrap();
        store.set("ports", json!([80, 443])).unwrap();

        let ports: Option<Vec<u16>> = store.get_as("ports").unwrap();
        assert_eq!(ports, Some(vec![80, 443]));

        let missing: Option<String> = store.get_as("missing").unwrap();
        assert!(missing.is_none());

        let wrong = store.get_as::<String>("ports");
        assert!(matches!(wrong, Err(StoreError::Decode { .. })));
    }

    #[test]
    fn test_open_does_not_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");

        let store = Store::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_sync_on_write_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");

        let mut store = Store::open(&path).unwrap();
        store.set("k", true).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\n    \"k\": true\n}"
        );
    }

    #[test]
    fn test_flush_is_noop_when_synchronous() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("db.json")).unwrap();
        assert!(store.flush().is_ok());
    }

    #[test]
    fn test_debug_output() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path().join("db.json")).unwrap();
        let rendered = format!("{store:?}");
        assert!(rendered.contains("keys: 0"));
    }
}
