//! Sources and the storage collaborator.
//!
//! A source is either *named* (read through a [`Storage`] by its relative
//! name, so its thumbnails have a stable identity) or *remote* (bytes handed in
//! directly, with no identity a cache could rely on).

use crate::core::error::{ThumbnailError, ThumbnailResult};
use std::fmt;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Storage backend contract. The core only ever reads sources through it;
/// saving artifacts is left to callers.
pub trait Storage: Send + Sync {
    /// Open a stored file for reading.
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>>;

    /// Persist bytes under `name`, returning the stored reference.
    fn save(&self, name: &str, data: &[u8]) -> io::Result<String>;

    /// Whether `name` exists.
    fn exists(&self, name: &str) -> bool;
}

/// Storage rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative storage name, refusing anything that escapes the root.
    fn path(&self, name: &str) -> io::Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("storage name '{}' is not a relative path", name),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl Storage for FileSystemStorage {
    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>> {
        let file = std::fs::File::open(self.path(name)?)?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    fn save(&self, name: &str, data: &[u8]) -> io::Result<String> {
        let path = self.path(name)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, data)?;
        Ok(name.to_string())
    }

    fn exists(&self, name: &str) -> bool {
        self.path(name).map(|p| p.is_file()).unwrap_or(false)
    }
}

/// Where a source's bytes come from.
#[derive(Clone)]
pub enum SourceData {
    /// Read by relative name through a storage backend.
    Storage(Arc<dyn Storage>),
    /// Bytes supplied directly.
    Bytes(Arc<[u8]>),
    /// Nothing readable; generation fails with `MissingSource`.
    Unavailable,
}

impl fmt::Debug for SourceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceData::Storage(_) => f.write_str("Storage(<storage>)"),
            SourceData::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            SourceData::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// A source image: a logical relative name plus a way to read it.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    name: String,
    data: SourceData,
    remote: bool,
}

impl SourceDescriptor {
    /// A named source read through `storage`.
    pub fn named(name: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        Self {
            name: name.into(),
            data: SourceData::Storage(storage),
            remote: false,
        }
    }

    /// A remote source whose bytes are already in memory.
    pub fn remote(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            data: SourceData::Bytes(bytes.into()),
            remote: true,
        }
    }

    /// A named source with nothing behind it. Naming still works; generation
    /// fails with `MissingSource`.
    pub fn name_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: SourceData::Unavailable,
            remote: false,
        }
    }

    /// Logical relative name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remote sources have no cache identity.
    pub fn is_remote(&self) -> bool {
        self.remote
    }

    pub fn data(&self) -> &SourceData {
        &self.data
    }

    /// Read the full source. This is the only blocking read in generation.
    pub fn read(&self) -> ThumbnailResult<Vec<u8>> {
        let missing = || ThumbnailError::MissingSource {
            name: self.name.clone(),
        };
        match &self.data {
            SourceData::Bytes(bytes) => Ok(bytes.to_vec()),
            SourceData::Storage(storage) => {
                let mut reader = storage.open(&self.name).map_err(|e| match e.kind() {
                    io::ErrorKind::NotFound => missing(),
                    _ => ThumbnailError::Io(e),
                })?;
                let mut buffer = Vec::new();
                reader.read_to_end(&mut buffer)?;
                Ok(buffer)
            }
            SourceData::Unavailable => Err(missing()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filesystem_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());

        let stored = storage.save("nested/a.bin", b"hello").unwrap();
        assert_eq!(stored, "nested/a.bin");
        assert!(storage.exists("nested/a.bin"));

        let mut contents = String::new();
        storage
            .open("nested/a.bin")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "hello");
    }

    #[test]
    fn test_storage_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());
        assert!(storage.save("../evil.bin", b"x").is_err());
        assert!(!storage.exists("/etc/passwd"));
    }

    #[test]
    fn test_source_read() {
        let remote = SourceDescriptor::remote("upload.png", vec![1u8, 2, 3]);
        assert!(remote.is_remote());
        assert_eq!(remote.read().unwrap(), vec![1, 2, 3]);

        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(FileSystemStorage::new(dir.path()));
        let missing = SourceDescriptor::named("absent.jpg", storage);
        assert!(!missing.is_remote());
        assert!(matches!(
            missing.read(),
            Err(ThumbnailError::MissingSource { .. })
        ));

        let nothing = SourceDescriptor::name_only("a.jpg");
        assert!(matches!(
            nothing.read(),
            Err(ThumbnailError::MissingSource { name }) if name == "a.jpg"
        ));
    }
}
