use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, warn};
use zdl_types::{ToolchainError, VersionId};

use crate::metadata::Metadata;
use crate::pointer::{ActivePointer, default_pointer};

/// Extraction area used before an installation is moved into place.
pub const STAGING_DIR: &str = ".tmp";
/// Pin record inside the install root.
pub const METADATA_FILE: &str = "metadata.json";

/// The on-disk set of installed versions under one root.
///
/// `list()` is cached for the lifetime of the instance; anything that adds
/// or removes version directories must call [`InstallationStore::invalidate`].
pub struct InstallationStore {
    root: PathBuf,
    pointer: Box<dyn ActivePointer>,
    cache: Mutex<Option<Vec<VersionId>>>,
}

impl InstallationStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let pointer = default_pointer(&root);
        Self::with_pointer(root, pointer)
    }

    #[must_use]
    pub fn with_pointer(root: impl Into<PathBuf>, pointer: Box<dyn ActivePointer>) -> Self {
        Self {
            root: root.into(),
            pointer,
            cache: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn pointer(&self) -> &dyn ActivePointer {
        self.pointer.as_ref()
    }

    #[must_use]
    pub fn version_dir(&self, version: &VersionId) -> PathBuf {
        self.root.join(version.to_string())
    }

    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    #[must_use]
    pub fn metadata_file(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    /// # Errors
    /// Returns an error if the root directory cannot be created.
    pub fn ensure_root(&self) -> Result<(), ToolchainError> {
        std::fs::create_dir_all(&self.root).map_err(|error| {
            ToolchainError::io("failed to create install root", &self.root, error)
        })
    }

    /// Whether the final directory for `version` exists, bypassing the cache.
    #[must_use]
    pub fn contains(&self, version: &VersionId) -> bool {
        self.version_dir(version).is_dir()
    }

    /// Installed versions in ascending order.
    ///
    /// # Errors
    /// Returns an error if the root cannot be scanned or if it holds a
    /// directory whose name is not a version id.
    pub fn list(&self) -> Result<Vec<VersionId>, ToolchainError> {
        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(ref versions) = *cache {
            return Ok(versions.clone());
        }

        let versions = self.scan()?;
        *cache = Some(versions.clone());
        Ok(versions)
    }

    pub fn invalidate(&self) {
        *self
            .cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }

    fn scan(&self) -> Result<Vec<VersionId>, ToolchainError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!("install root {} does not exist yet", self.root.display());
                return Ok(Vec::new());
            }
            Err(error) => {
                return Err(ToolchainError::io(
                    "failed to read install root",
                    &self.root,
                    error,
                ));
            }
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| {
                ToolchainError::io("failed to read install root entry", &self.root, error)
            })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();

            if name.starts_with('.')
                || name == self.pointer.entry_name()
                || name == METADATA_FILE
            {
                continue;
            }

            let is_dir = entry.file_type().is_ok_and(|file_type| file_type.is_dir());
            if !is_dir {
                continue;
            }

            versions.push(name.parse::<VersionId>()?);
        }

        versions.sort();
        Ok(versions)
    }

    #[must_use]
    pub fn load_metadata(&self) -> Metadata {
        Metadata::load_from_path(&self.metadata_file())
    }

    /// # Errors
    /// Returns an error if the install root or the record cannot be written.
    pub fn save_metadata(&self, metadata: &Metadata) -> Result<(), ToolchainError> {
        self.ensure_root()?;
        metadata.save_to_path(&self.metadata_file())
    }

    /// The version the active pointer names, if any.
    ///
    /// # Errors
    /// Returns an error if the pointer exists but cannot be read.
    pub fn read_active(&self) -> Result<Option<VersionId>, ToolchainError> {
        let Some(target) = self.pointer.read()? else {
            return Ok(None);
        };

        match target.parse() {
            Ok(version) => Ok(Some(version)),
            Err(error) => {
                warn!("active pointer names {target:?}, which is not a version: {error}");
                Ok(None)
            }
        }
    }
}
