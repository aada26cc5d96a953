use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use engine_logging::engine_debug;
use tempfile::NamedTempFile;

use super::{
    DirEntry, EntryKind, Permission, RootProvider, StorageError, StoragePath, StorageRoot,
    WriteMode,
};

/// [`StorageRoot`] over a native directory. Blocking file system calls run
/// on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct FsStorageRoot {
    base: PathBuf,
}

impl FsStorageRoot {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn native_path(&self, path: &StoragePath) -> PathBuf {
        path.to_native(&self.base)
    }

    async fn blocking<T, F>(&self, path: &StoragePath, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(PathBuf) -> Result<T, StorageError> + Send + 'static,
    {
        let native = self.native_path(path);
        let display = path.to_string();
        tokio::task::spawn_blocking(move || op(native))
            .await
            .map_err(|err| StorageError::Io {
                path: display,
                source: io::Error::other(err),
            })?
    }
}

fn probe_permission(base: &Path) -> Permission {
    match fs::metadata(base) {
        Ok(meta) if meta.is_dir() => match NamedTempFile::new_in(base) {
            Ok(_) => Permission::Granted,
            Err(_) => Permission::Denied,
        },
        Ok(_) => Permission::Denied,
        Err(err) if err.kind() == io::ErrorKind::NotFound => Permission::Prompt,
        Err(_) => Permission::Denied,
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait::async_trait]
impl StorageRoot for FsStorageRoot {
    fn describe(&self) -> String {
        self.base.display().to_string()
    }

    async fn permission(&self) -> Permission {
        let base = self.base.clone();
        tokio::task::spawn_blocking(move || probe_permission(&base))
            .await
            .unwrap_or(Permission::Denied)
    }

    /// A missing root directory is created; an existing one is only probed.
    async fn request_permission(&self) -> Permission {
        let base = self.base.clone();
        tokio::task::spawn_blocking(move || {
            if probe_permission(&base) == Permission::Prompt {
                if let Err(err) = fs::create_dir_all(&base) {
                    engine_debug!("could not create storage root {}: {}", base.display(), err);
                    return Permission::Denied;
                }
            }
            probe_permission(&base)
        })
        .await
        .unwrap_or(Permission::Denied)
    }

    async fn exists(&self, path: &StoragePath) -> Result<bool, StorageError> {
        self.blocking(path, |native| {
            native.try_exists().map_err(io_error(&native))
        })
        .await
    }

    async fn create_dir(&self, path: &StoragePath) -> Result<(), StorageError> {
        let display = path.to_string();
        self.blocking(path, move |native| match fs::create_dir(&native) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && native.is_dir() => Ok(()),
            Err(err) => Err(StorageError::CreateFailed {
                path: display,
                message: err.to_string(),
            }),
        })
        .await
    }

    async fn list(&self, path: &StoragePath) -> Result<Vec<DirEntry>, StorageError> {
        self.blocking(path, |native| {
            let mut entries = Vec::new();
            for entry in fs::read_dir(&native).map_err(io_error(&native))? {
                let entry = entry.map_err(io_error(&native))?;
                let kind = match entry.file_type() {
                    Ok(ft) if ft.is_dir() => EntryKind::Directory,
                    _ => EntryKind::File,
                };
                entries.push(DirEntry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    kind,
                });
            }
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(entries)
        })
        .await
    }

    async fn write_file(
        &self,
        path: &StoragePath,
        contents: Bytes,
        mode: WriteMode,
    ) -> Result<(), StorageError> {
        let display = path.to_string();
        self.blocking(path, move |target| {
            let dir = target
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StorageError::InvalidPath {
                    path: display.clone(),
                    reason: "cannot write to the root itself",
                })?;

            let mut tmp = NamedTempFile::new_in(&dir).map_err(io_error(&dir))?;
            tmp.write_all(&contents).map_err(io_error(&target))?;
            tmp.flush().map_err(io_error(&target))?;
            tmp.as_file_mut().sync_all().map_err(io_error(&target))?;

            let persisted = match mode {
                WriteMode::CreateNew => tmp.persist_noclobber(&target),
                WriteMode::Replace => tmp.persist(&target),
            };
            persisted.map_err(|err| {
                if err.error.kind() == io::ErrorKind::AlreadyExists {
                    StorageError::AlreadyExists { path: display }
                } else {
                    StorageError::Io {
                        path: target.display().to_string(),
                        source: err.error,
                    }
                }
            })?;
            Ok(())
        })
        .await
    }

    async fn read_file(&self, path: &StoragePath) -> Result<Bytes, StorageError> {
        self.blocking(path, |native| {
            fs::read(&native).map(Bytes::from).map_err(io_error(&native))
        })
        .await
    }

    async fn delete(&self, path: &StoragePath) -> Result<(), StorageError> {
        self.blocking(path, |native| {
            let meta = fs::metadata(&native).map_err(io_error(&native))?;
            if meta.is_dir() {
                fs::remove_dir_all(&native).map_err(io_error(&native))
            } else {
                fs::remove_file(&native).map_err(io_error(&native))
            }
        })
        .await
    }
}

/// Provides an [`FsStorageRoot`] for a configured directory.
#[derive(Debug, Clone, Default)]
pub struct FsRootProvider {
    path: Option<PathBuf>,
}

impl FsRootProvider {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl RootProvider for FsRootProvider {
    async fn provide(&self) -> Result<Arc<dyn StorageRoot>, StorageError> {
        let path = self.path.clone().ok_or(StorageError::NoRootSelected)?;
        Ok(Arc::new(FsStorageRoot::new(path)))
    }
}
