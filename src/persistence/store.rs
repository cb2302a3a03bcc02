//! Key-value buckets backing listener persistence.
//!
//! [`MemoryStore`] keeps everything in process; [`FsStore`] maps each bucket
//! to a directory and each key to a file, writing through a temp file and a
//! rename so a reader never sees a partial record.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// A named collection of key/value records.
pub trait Bucket: Send + Sync {
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    /// Keys in sorted order.
    fn keys(&self) -> Result<Vec<String>>;
}

/// Hands out buckets by name, creating them on first use.
pub trait KvStore: Send + Sync {
    fn bucket(&self, name: &str) -> Result<Arc<dyn Bucket>>;
}

#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<HashMap<String, Arc<MemoryBucket>>>,
}

#[derive(Default)]
pub struct MemoryBucket {
    records: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn bucket(&self, name: &str) -> Result<Arc<dyn Bucket>> {
        let bucket = Arc::clone(self.buckets.lock().entry(name.to_string()).or_default());
        Ok(bucket)
    }
}

impl Bucket for MemoryBucket {
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.records.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.records.lock().get(key).cloned())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.records.lock().keys().cloned().collect())
    }
}

/// Directory-backed store rooted at `root`.
#[derive(Clone, Debug)]
pub struct FsStore {
    root: PathBuf,
}

#[derive(Clone, Debug)]
pub struct FsBucket {
    dir: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl KvStore for FsStore {
    fn bucket(&self, name: &str) -> Result<Arc<dyn Bucket>> {
        check_name(name)?;
        let dir = self.root.join(name);
        fs::create_dir_all(&dir).map_err(|err| {
            Error::persistence("open bucket", format!("{}: {err}", dir.display()))
        })?;
        Ok(Arc::new(FsBucket { dir }))
    }
}

impl Bucket for FsBucket {
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        check_name(key)?;
        let target = self.dir.join(key);
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .map_err(|err| Error::persistence("write record", err))?;
        tmp.write_all(value)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|err| Error::persistence("write record", err))?;
        tmp.persist(&target).map_err(|err| {
            Error::persistence("write record", format!("{}: {}", target.display(), err.error))
        })?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        check_name(key)?;
        match fs::read(self.dir.join(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::persistence("read record", err)),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries =
            fs::read_dir(&self.dir).map_err(|err| Error::persistence("list records", err))?;
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| Error::persistence("list records", err))?;
            if !entry.path().is_file() {
                continue;
            }
            // Leftover temp files from interrupted writes start with '.'.
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Bucket names and keys become file names, so they must stay a single path component.
fn check_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
    {
        return Err(Error::persistence(
            "validate key",
            format!("'{name}' is not usable as a record name"),
        ));
    }
    Ok(())
}
