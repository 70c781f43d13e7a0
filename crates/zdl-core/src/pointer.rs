//! The single "active" selection inside the install root.

use std::path::{Path, PathBuf};

use log::debug;
use zdl_types::ToolchainError;

use crate::atomic::{remove_entry, write_atomic};

/// Name of the pointer entry inside the install root.
pub const ACTIVE_ENTRY: &str = "active";

#[cfg(unix)]
const POINTER_TEMP: &str = ".active.tmp";

/// A reference to one installed version that can be swapped in one step.
///
/// `replace` must never leave a moment where the entry is missing or names
/// something other than the old or the new target.
pub trait ActivePointer: Send + Sync {
    /// File name of the pointer inside the install root.
    fn entry_name(&self) -> &str;

    /// # Errors
    /// Returns an error if the pointer exists but cannot be read.
    fn read(&self) -> Result<Option<String>, ToolchainError>;

    /// # Errors
    /// Returns an error if the new pointer cannot be created or moved into
    /// place.
    fn replace(&self, target: &str) -> Result<(), ToolchainError>;
}

/// Relative symlink `active -> <version>`.
#[cfg(unix)]
#[derive(Debug, Clone)]
pub struct SymlinkPointer {
    root: PathBuf,
}

#[cfg(unix)]
impl SymlinkPointer {
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

#[cfg(unix)]
impl ActivePointer for SymlinkPointer {
    fn entry_name(&self) -> &str {
        ACTIVE_ENTRY
    }

    fn read(&self) -> Result<Option<String>, ToolchainError> {
        let path = self.root.join(ACTIVE_ENTRY);
        match std::fs::read_link(&path) {
            Ok(target) => Ok(target
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(ToolchainError::io(
                "failed to read active symlink",
                &path,
                error,
            )),
        }
    }

    fn replace(&self, target: &str) -> Result<(), ToolchainError> {
        let tmp = self.root.join(POINTER_TEMP);
        let path = self.root.join(ACTIVE_ENTRY);

        remove_entry(&tmp)
            .map_err(|error| ToolchainError::io("failed to remove stale pointer", &tmp, error))?;
        std::os::unix::fs::symlink(target, &tmp)
            .map_err(|error| ToolchainError::io("failed to create pointer", &tmp, error))?;
        std::fs::rename(&tmp, &path)
            .map_err(|error| ToolchainError::io("failed to swap active pointer", &path, error))?;

        debug!("{} -> {target}", path.display());
        Ok(())
    }
}

/// Plain file holding the active version on its first line.
///
/// Works on any filesystem that supports rename, including ones without
/// symlinks.
#[derive(Debug, Clone)]
pub struct FilePointer {
    root: PathBuf,
}

impl FilePointer {
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl ActivePointer for FilePointer {
    fn entry_name(&self) -> &str {
        ACTIVE_ENTRY
    }

    fn read(&self) -> Result<Option<String>, ToolchainError> {
        let path = self.root.join(ACTIVE_ENTRY);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(content
                .lines()
                .next()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(ToolchainError::io(
                "failed to read active pointer",
                &path,
                error,
            )),
        }
    }

    fn replace(&self, target: &str) -> Result<(), ToolchainError> {
        let path = self.root.join(ACTIVE_ENTRY);
        write_atomic(&path, format!("{target}\n").as_bytes())
            .map_err(|error| ToolchainError::io("failed to swap active pointer", &path, error))?;
        debug!("{} = {target}", path.display());
        Ok(())
    }
}

/// The pointer flavour used when none is configured explicitly.
#[must_use]
pub fn default_pointer(root: &Path) -> Box<dyn ActivePointer> {
    #[cfg(unix)]
    {
        Box::new(SymlinkPointer::new(root))
    }

    #[cfg(not(unix))]
    {
        Box::new(FilePointer::new(root))
    }
}
