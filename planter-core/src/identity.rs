use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use data_encoding::HEXLOWER;
use log::debug;
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

use crate::config::Config;

pub const IDENTITY_KEY: &str = "cattle-id";
pub const DEFAULT_AGENT_DIR: &str = "/etc/rancher/agent";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("creating state directory {}: {}", .path.display(), .source)]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("reading {}: {}", .path.display(), .source)]
    Read { path: PathBuf, source: io::Error },
    #[error("writing {}: {}", .path.display(), .source)]
    Write { path: PathBuf, source: io::Error },
}

/// Durable key-value persistence for per-node state. The filesystem
/// implementation is the real one; tests inject [`MemoryStorage`].
pub trait Storage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Stores each key as a file under `root` with owner-only permissions.
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl Default for FsStorage {
    fn default() -> Self {
        Self::new(DEFAULT_AGENT_DIR)
    }
}

impl Storage for FsStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.key_path(key);

        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read { path, source }),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).map_err(|source| StorageError::CreateDir {
            path: self.root.clone(),
            source,
        })?;
        set_permissions(&self.root, 0o700).map_err(|source| StorageError::CreateDir {
            path: self.root.clone(),
            source,
        })?;

        let path = self.key_path(key);
        fs::write(&path, value).map_err(|source| StorageError::Write {
            path: path.clone(),
            source,
        })?;
        set_permissions(&path, 0o400).map_err(|source| StorageError::Write { path, source })?;

        Ok(())
    }
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// In-memory storage for tests. Counts writes so idempotency is observable.
#[derive(Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
    pub writes: usize,
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        self.writes += 1;

        Ok(())
    }
}

/// 32 bytes from the OS entropy source, hex encoded.
pub fn generate_token() -> String {
    let mut raw = [0u8; 32];
    OsRng.fill_bytes(&mut raw);

    HEXLOWER.encode(&raw)
}

/// Reads the persisted node identity, generating and persisting one on first
/// use. Once written the identity is never regenerated.
pub fn get_or_create_node_identity(store: &mut impl Storage) -> Result<String, StorageError> {
    if let Some(id) = store.read(IDENTITY_KEY)? {
        let id = id.trim();
        if !id.is_empty() {
            return Ok(id.to_owned());
        }
    }

    let id = generate_token();
    store.write(IDENTITY_KEY, &id)?;
    debug!("Generated a new node identity");

    Ok(id)
}

/// A non-empty configured token is the join case and is returned unchanged.
/// An empty one is the first-node case and yields a fresh token per call;
/// only the cluster state secret makes it durable.
pub fn resolve_join_token(config: &Config) -> String {
    if !config.token.is_empty() {
        return config.token.clone();
    }

    generate_token()
}
