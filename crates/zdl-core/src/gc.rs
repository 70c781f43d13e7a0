use std::collections::BTreeSet;

use log::{debug, info};
use zdl_types::{ToolchainError, VersionId};

use crate::atomic::remove_entry;
use crate::store::InstallationStore;

/// Default number of installations kept after an activation.
pub const DEFAULT_AUTO_GC_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcMode {
    /// Runs after an activation and keeps the newest `limit` versions.
    Auto { limit: usize },
    /// Explicit request: removes every unprotected version.
    Manual,
}

impl GcMode {
    fn limit(self) -> usize {
        match self {
            Self::Auto { limit } => limit,
            Self::Manual => 0,
        }
    }
}

/// Remove installations that are neither active nor pinned, oldest first.
///
/// Candidates are removed while the store holds more than the mode's limit;
/// protected versions count towards the total but are never removed, so
/// more than `limit` may remain. Returns the removed versions in removal
/// order.
///
/// # Errors
/// Returns an error if the store cannot be listed or a directory cannot be
/// removed. Versions removed before the failure stay removed.
pub fn collect_garbage(
    store: &InstallationStore,
    mode: GcMode,
) -> Result<Vec<VersionId>, ToolchainError> {
    let installed = store.list()?;
    let limit = mode.limit();
    if installed.len() <= limit {
        debug!(
            "{} installation(s), limit {limit}: nothing to collect",
            installed.len()
        );
        return Ok(Vec::new());
    }

    let mut protected: BTreeSet<VersionId> = store.load_metadata().pins;
    if let Some(active) = store.read_active()? {
        protected.insert(active);
    }

    let excess = installed.len() - limit;
    let doomed: Vec<VersionId> = installed
        .into_iter()
        .filter(|version| !protected.contains(version))
        .take(excess)
        .collect();

    let mut removed = Vec::with_capacity(doomed.len());
    for version in doomed {
        let dir = store.version_dir(&version);
        if let Err(error) = remove_entry(&dir) {
            store.invalidate();
            return Err(ToolchainError::io(
                "failed to remove installation",
                &dir,
                error,
            ));
        }
        info!("removed {version}");
        removed.push(version);
    }

    if !removed.is_empty() {
        store.invalidate();
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use zdl_types::VersionId;

    use super::{GcMode, collect_garbage};
    use crate::pointer::FilePointer;
    use crate::store::InstallationStore;

    fn v(s: &str) -> VersionId {
        s.parse().expect("valid version in test")
    }

    fn names(versions: &[VersionId]) -> Vec<String> {
        versions.iter().map(ToString::to_string).collect()
    }

    fn store_with(root: &Path, versions: &[&str]) -> InstallationStore {
        for version in versions {
            std::fs::create_dir(root.join(version)).expect("dir should be created");
        }
        InstallationStore::with_pointer(root, Box::new(FilePointer::new(root)))
    }

    #[test]
    fn manual_removes_everything_unprotected() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let store = store_with(temp.path(), &["0.9.0", "0.10.0", "0.11.0", "0.12.0"]);
        store.pointer().replace("0.11.0").expect("activate");
        let mut metadata = store.load_metadata();
        metadata.pins.insert(v("0.9.0"));
        store.save_metadata(&metadata).expect("pin");

        let removed = collect_garbage(&store, GcMode::Manual).expect("gc");

        assert_eq!(names(&removed), ["0.10.0", "0.12.0"]);
        assert_eq!(store.list().expect("list"), vec![v("0.9.0"), v("0.11.0")]);
    }

    #[test]
    fn auto_keeps_newest_up_to_limit() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let store = store_with(temp.path(), &["0.8.0", "0.9.0", "0.10.0", "0.11.0"]);
        store.pointer().replace("0.11.0").expect("activate");

        let removed = collect_garbage(&store, GcMode::Auto { limit: 2 }).expect("gc");

        assert_eq!(names(&removed), ["0.8.0", "0.9.0"]);
        assert_eq!(store.list().expect("list"), vec![v("0.10.0"), v("0.11.0")]);
    }

    #[test]
    fn auto_under_limit_is_a_noop() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let store = store_with(temp.path(), &["0.9.0", "0.10.0"]);

        let removed = collect_garbage(&store, GcMode::Auto { limit: 10 }).expect("gc");

        assert!(removed.is_empty());
        assert_eq!(store.list().expect("list").len(), 2);
    }

    #[test]
    fn protected_versions_may_exceed_limit() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let store = store_with(temp.path(), &["0.8.0", "0.9.0", "0.10.0"]);
        store.pointer().replace("0.10.0").expect("activate");
        let mut metadata = store.load_metadata();
        metadata.pins.extend([v("0.8.0"), v("0.9.0")]);
        store.save_metadata(&metadata).expect("pin");

        let removed = collect_garbage(&store, GcMode::Auto { limit: 1 }).expect("gc");

        assert!(removed.is_empty());
        assert_eq!(store.list().expect("list").len(), 3);
    }

    #[test]
    fn empty_store_collects_nothing() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let store = store_with(temp.path(), &[]);

        assert!(collect_garbage(&store, GcMode::Manual).expect("gc").is_empty());
    }
}
