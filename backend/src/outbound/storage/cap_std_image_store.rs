//! `ImageStore` backed by a capability-scoped directory.
//!
//! All paths resolve inside the root `Dir`, so a key can never escape it even
//! if validation upstream were bypassed. Writes land in a staging file next
//! to the target and are renamed into place, so readers never observe a
//! partially written object.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ObjectKey;
use crate::domain::ports::{ImageStore, ImageStoreError};

#[derive(Clone)]
pub struct CapStdImageStore {
    root: Arc<Dir>,
}

impl CapStdImageStore {
    /// Open (creating if needed) the storage root at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageStoreError> {
        let path = path.as_ref();
        Dir::create_ambient_dir_all(path, ambient_authority())
            .map_err(|err| io_error(path, &err))?;
        let root =
            Dir::open_ambient_dir(path, ambient_authority()).map_err(|err| io_error(path, &err))?;
        Ok(Self::from_dir(root))
    }

    pub fn from_dir(root: Dir) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, ImageStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Dir) -> Result<T, ImageStoreError> + Send + 'static,
    {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || op(&root))
            .await
            .map_err(|err| ImageStoreError::io(format!("storage task failed: {err}")))?
    }
}

fn io_error(path: &Path, error: &io::Error) -> ImageStoreError {
    ImageStoreError::io(format!("{}: {error}", path.display()))
}

fn write_object(root: &Dir, key: &Path, bytes: &[u8]) -> Result<(), ImageStoreError> {
    let file_name = key
        .file_name()
        .ok_or_else(|| ImageStoreError::invalid_key(key.display().to_string()))?;
    let parent = key.parent().unwrap_or_else(|| Path::new(""));
    if !parent.as_os_str().is_empty() {
        root.create_dir_all(parent)
            .map_err(|err| io_error(parent, &err))?;
    }

    let staged: PathBuf = parent.join(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        Uuid::new_v4().simple()
    ));
    let outcome = root
        .write(&staged, bytes)
        .and_then(|()| root.rename(&staged, root, key));
    if let Err(err) = outcome {
        let _cleanup = root.remove_file(&staged);
        return Err(io_error(key, &err));
    }
    Ok(())
}

fn read_object(root: &Dir, key: &Path) -> Result<Option<Vec<u8>>, ImageStoreError> {
    match root.read(key) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_error(key, &err)),
    }
}

#[async_trait]
impl ImageStore for CapStdImageStore {
    async fn put(&self, key: &ObjectKey, bytes: Vec<u8>) -> Result<(), ImageStoreError> {
        let path = PathBuf::from(key.as_str());
        let size = bytes.len();
        self.blocking(move |root| write_object(root, &path, &bytes))
            .await?;
        debug!(key = %key, size, "stored object");
        Ok(())
    }

    async fn get(&self, key: &ObjectKey) -> Result<Option<Vec<u8>>, ImageStoreError> {
        let path = PathBuf::from(key.as_str());
        self.blocking(move |root| read_object(root, &path)).await
    }
}
