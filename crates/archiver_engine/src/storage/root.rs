use std::sync::Arc;

use bytes::Bytes;

use super::{StorageError, StoragePath};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// Not decided yet; asking may grant it.
    Prompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail with [`StorageError::AlreadyExists`] instead of replacing.
    CreateNew,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// Permission-gated handle to a writable directory tree.
#[async_trait::async_trait]
pub trait StorageRoot: Send + Sync {
    /// Human-readable location, used in messages.
    fn describe(&self) -> String;

    async fn permission(&self) -> Permission;

    async fn request_permission(&self) -> Permission;

    async fn exists(&self, path: &StoragePath) -> Result<bool, StorageError>;

    /// Create one directory. Succeeds if it already exists.
    async fn create_dir(&self, path: &StoragePath) -> Result<(), StorageError>;

    async fn list(&self, path: &StoragePath) -> Result<Vec<DirEntry>, StorageError>;

    /// Write the whole file atomically: readers see the old state or the new
    /// contents, never a partial file.
    async fn write_file(
        &self,
        path: &StoragePath,
        contents: Bytes,
        mode: WriteMode,
    ) -> Result<(), StorageError>;

    async fn read_file(&self, path: &StoragePath) -> Result<Bytes, StorageError>;

    async fn delete(&self, path: &StoragePath) -> Result<(), StorageError>;
}

/// Supplies the storage root the user picked.
#[async_trait::async_trait]
pub trait RootProvider: Send + Sync {
    async fn provide(&self) -> Result<Arc<dyn StorageRoot>, StorageError>;
}
