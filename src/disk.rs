//! Filesystem access for the backing file.

use crate::error::{Result, StoreError};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// What a probe of the backing path found.
#[derive(Debug, PartialEq, Eq)]
pub enum Probe {
    /// Nothing at the path yet.
    Missing,
    /// File exists, is accessible and has zero length.
    Empty,
    /// File exists, is accessible and has these contents.
    Contents(Vec<u8>),
}

/// Stat the path, check read/write access and read the contents if any.
///
/// Never creates or modifies the file.
pub fn probe(path: &Path) -> Result<Probe> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Probe::Missing),
        Err(e) => return Err(classify(path, e)),
    };

    // Opening read+write without create/truncate checks both permissions
    // against the real process credentials and leaves the file untouched.
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| classify(path, e))?;

    if metadata.len() == 0 {
        return Ok(Probe::Empty);
    }

    let mut contents = Vec::with_capacity(usize::try_from(metadata.len()).unwrap_or(0));
    file.read_to_end(&mut contents)
        .map_err(|e| StoreError::io(path, e))?;

    // The file may have been truncated between stat and read.
    if contents.is_empty() {
        return Ok(Probe::Empty);
    }
    Ok(Probe::Contents(contents))
}

/// Replace the contents of `path` with `bytes`.
///
/// With `atomic` set, the bytes go to a uniquely named temporary file in the
/// target's directory that is fsynced and renamed over the target, so readers
/// never see a half-written image. Symlinks are followed and the existing
/// file's permissions are carried over, so the file keeps its identity.
pub fn write_image(path: &Path, bytes: &[u8], atomic: bool) -> Result<()> {
    if !atomic {
        fs::write(path, bytes).map_err(|e| StoreError::io(path, e))?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote store file in place");
        return Ok(());
    }

    let target = resolve_target(path);
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // A missing target is created empty first so it gets the same default
    // permissions a plain write would give it; an empty file loads as fresh.
    let existing = match fs::metadata(&target) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => OpenOptions::new()
            .write(true)
            .create(true)
            .open(&target)
            .and_then(|file| file.metadata())
            .map_err(|e| StoreError::io(path, e))?,
        Err(e) => return Err(StoreError::io(path, e)),
    };

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| StoreError::io(path, e))?;
    tmp.write_all(bytes).map_err(|e| StoreError::io(path, e))?;
    tmp.as_file()
        .set_permissions(existing.permissions())
        .map_err(|e| StoreError::io(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(path, e))?;
    // On failure the temporary file is removed when the handle drops.
    tmp.persist(&target)
        .map_err(|e| StoreError::io(path, e.error))?;

    debug!(path = %target.display(), bytes = bytes.len(), "replaced store file");
    Ok(())
}

/// The file a write to `path` should land in: symlinks resolved, including a
/// dangling one whose target does not exist yet.
fn resolve_target(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    match fs::read_link(path) {
        Ok(link) if link.is_relative() => path
            .parent()
            .map(|parent| parent.join(&link))
            .unwrap_or(link),
        Ok(link) => link,
        Err(_) => path.to_path_buf(),
    }
}

fn classify(path: &Path, e: std::io::Error) -> StoreError {
    if e.kind() == ErrorKind::PermissionDenied {
        StoreError::AccessDenied {
            path: path.to_path_buf(),
        }
    } else {
        StoreError::io(path, e)
    }
}
