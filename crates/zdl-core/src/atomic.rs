//! Filesystem primitives that make a change visible in a single step.
//!
//! Everything here relies on `rename` within one directory being atomic,
//! which holds on every filesystem the install root is expected to live on.

use std::io::Write;
use std::path::Path;

/// Write `data` to `path` so readers see either the old or the new
/// contents, never a truncated file.
///
/// # Errors
/// Returns an error if the temporary file cannot be created, written or
/// renamed over `path`.
pub fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent")
    })?;

    let file_name = path
        .file_name()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("entry");
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let pid = std::process::id();

    let mut tmp_path = None;
    for attempt in 0..16_u8 {
        let candidate = parent.join(format!(".{file_name}.{pid}.{timestamp}.{attempt}.tmp"));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                file.write_all(data)?;
                file.sync_all()?;
                tmp_path = Some(candidate);
                break;
            }
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(error),
        }
    }

    let Some(tmp_path) = tmp_path else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "failed to create unique temp file",
        ));
    };

    if let Err(error) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(error);
    }

    Ok(())
}

/// Move a fully populated entry to its final location.
///
/// Refuses to overwrite: an existing `dst` is reported as `AlreadyExists`.
///
/// # Errors
/// Returns an error if `dst` already exists or the rename fails (for
/// example when `src` and `dst` are on different filesystems).
pub fn rename_into_place(src: &Path, dst: &Path) -> std::io::Result<()> {
    if dst.symlink_metadata().is_ok() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} already exists", dst.display()),
        ));
    }
    std::fs::rename(src, dst)
}

/// Remove a file, symlink or directory tree; a missing path is not an error.
///
/// # Errors
/// Returns an error if the entry exists but cannot be removed.
pub fn remove_entry(path: &Path) -> std::io::Result<()> {
    let metadata = match path.symlink_metadata() {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(error) => return Err(error),
    };

    if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}
