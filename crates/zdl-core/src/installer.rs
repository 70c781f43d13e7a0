use std::path::Path;

use log::{debug, info, warn};
use zdl_types::{ArchiveExtractor, Fetcher, ToolchainError, VersionId};

use crate::atomic::{remove_entry, rename_into_place};
use crate::store::InstallationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    AlreadyInstalled,
    Installed,
}

/// Downloads a release and moves it into the store.
///
/// The final `<root>/<version>` directory only ever appears through a
/// single rename of a fully extracted tree, so an interrupted install
/// leaves nothing but the staging directory behind.
pub struct Installer<'a> {
    store: &'a InstallationStore,
    fetcher: &'a dyn Fetcher,
    extractor: &'a dyn ArchiveExtractor,
}

impl<'a> Installer<'a> {
    #[must_use]
    pub fn new(
        store: &'a InstallationStore,
        fetcher: &'a dyn Fetcher,
        extractor: &'a dyn ArchiveExtractor,
    ) -> Self {
        Self {
            store,
            fetcher,
            extractor,
        }
    }

    /// Make `version` present in the store.
    ///
    /// # Errors
    /// Returns [`ToolchainError::NoDownloadUrl`] if the version is missing
    /// and `url` is `None`, a network error if the download fails,
    /// [`ToolchainError::UnexpectedArchiveLayout`] if the archive does not
    /// unpack to exactly one top-level entry, and I/O errors from staging.
    pub async fn install(
        &self,
        version: &VersionId,
        url: Option<&str>,
    ) -> Result<InstallOutcome, ToolchainError> {
        if self.store.contains(version) {
            debug!("{version} already installed");
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        let url = url.ok_or_else(|| ToolchainError::NoDownloadUrl {
            version: version.to_string(),
        })?;

        self.store.ensure_root()?;

        info!("downloading {version} from {url}");
        let archive = self.fetcher.fetch(url).await?;

        let staging = self.store.staging_dir();
        reset_staging(&staging)?;

        let result = self.unpack_and_commit(&archive, &staging, version);
        if let Err(error) = remove_entry(&staging) {
            warn!(
                "failed to clean staging directory {}: {error}",
                staging.display()
            );
        }
        self.store.invalidate();
        result?;

        info!("installed {version}");
        Ok(InstallOutcome::Installed)
    }

    fn unpack_and_commit(
        &self,
        archive: &[u8],
        staging: &Path,
        version: &VersionId,
    ) -> Result<(), ToolchainError> {
        self.extractor.extract(archive, staging)?;

        let entry = single_top_level_entry(staging)?;
        let target = self.store.version_dir(version);
        debug!("moving {} to {}", entry.display(), target.display());

        rename_into_place(&entry, &target).map_err(|error| {
            ToolchainError::io("failed to move installation into place", &target, error)
        })
    }
}

fn reset_staging(staging: &Path) -> Result<(), ToolchainError> {
    remove_entry(staging).map_err(|error| {
        ToolchainError::io("failed to remove stale staging directory", staging, error)
    })?;
    std::fs::create_dir(staging)
        .map_err(|error| ToolchainError::io("failed to create staging directory", staging, error))
}

fn single_top_level_entry(staging: &Path) -> Result<std::path::PathBuf, ToolchainError> {
    let mut entries = std::fs::read_dir(staging)
        .map_err(|error| ToolchainError::io("failed to read staging directory", staging, error))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| ToolchainError::io("failed to read staging entry", staging, error))?;

    if entries.len() != 1 {
        entries.sort();
        return Err(ToolchainError::UnexpectedArchiveLayout {
            entries: entries
                .iter()
                .filter_map(|path| path.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .collect(),
        });
    }

    Ok(entries.remove(0))
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use zdl_types::{ArchiveExtractor, Fetcher, ToolchainError, VersionId};

    use super::{InstallOutcome, Installer};
    use crate::pointer::FilePointer;
    use crate::store::InstallationStore;

    /// Writes the given top-level directories, each holding a `zig` file.
    struct DirExtractor(&'static [&'static str]);

    impl ArchiveExtractor for DirExtractor {
        fn extract(&self, _archive: &[u8], dest: &Path) -> Result<(), ToolchainError> {
            for dir in self.0 {
                std::fs::create_dir_all(dest.join(dir)).expect("dir should be created");
                std::fs::write(dest.join(dir).join("zig"), b"bin").expect("file written");
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for CountingFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, ToolchainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(b"archive".to_vec())
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl Fetcher for FailingFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, ToolchainError> {
            Err(ToolchainError::network_status("download", "HTTP 404"))
        }
    }

    fn v(s: &str) -> VersionId {
        s.parse().expect("valid version in test")
    }

    fn store_in(root: &Path) -> InstallationStore {
        InstallationStore::with_pointer(root, Box::new(FilePointer::new(root)))
    }

    #[tokio::test]
    async fn installs_single_top_level_directory_under_version_name() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let store = store_in(temp.path());
        let fetcher = CountingFetcher::default();
        let extractor = DirExtractor(&["zig-linux-x86_64-0.11.0"]);

        let outcome = Installer::new(&store, &fetcher, &extractor)
            .install(&v("0.11.0"), Some("https://example.invalid/0.11.0.tar.xz"))
            .await
            .expect("install succeeds");

        assert_eq!(outcome, InstallOutcome::Installed);
        assert!(temp.path().join("0.11.0/zig").is_file());
        assert!(!temp.path().join(".tmp").exists());
        assert_eq!(store.list().expect("list"), vec![v("0.11.0")]);
    }

    #[tokio::test]
    async fn second_install_does_not_download() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let store = store_in(temp.path());
        let fetcher = CountingFetcher::default();
        let extractor = DirExtractor(&["zig-dir"]);
        let installer = Installer::new(&store, &fetcher, &extractor);

        installer
            .install(&v("0.11.0"), Some("u"))
            .await
            .expect("first install");
        let outcome = installer
            .install(&v("0.11.0"), Some("u"))
            .await
            .expect("second install");

        assert_eq!(outcome, InstallOutcome::AlreadyInstalled);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn installed_version_needs_no_url() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        std::fs::create_dir(temp.path().join("0.10.0")).expect("dir should be created");
        let store = store_in(temp.path());
        let fetcher = CountingFetcher::default();
        let extractor = DirExtractor(&["zig-dir"]);

        let outcome = Installer::new(&store, &fetcher, &extractor)
            .install(&v("0.10.0"), None)
            .await
            .expect("noop install");

        assert_eq!(outcome, InstallOutcome::AlreadyInstalled);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_url_for_absent_version_fails() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let store = store_in(temp.path());
        let fetcher = CountingFetcher::default();
        let extractor = DirExtractor(&["zig-dir"]);

        let result = Installer::new(&store, &fetcher, &extractor)
            .install(&v("0.10.0"), None)
            .await;

        assert!(matches!(result, Err(ToolchainError::NoDownloadUrl { .. })));
    }

    #[tokio::test]
    async fn multiple_top_level_entries_are_rejected() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let store = store_in(temp.path());
        let fetcher = CountingFetcher::default();
        let extractor = DirExtractor(&["b", "a"]);

        let result = Installer::new(&store, &fetcher, &extractor)
            .install(&v("0.11.0"), Some("u"))
            .await;

        match result {
            Err(ToolchainError::UnexpectedArchiveLayout { entries }) => {
                assert_eq!(entries, ["a", "b"]);
            }
            other => panic!("expected layout error, got {other:?}"),
        }
        assert!(!store.contains(&v("0.11.0")));
        assert!(!temp.path().join(".tmp").exists());
    }

    #[tokio::test]
    async fn empty_archive_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let store = store_in(temp.path());
        let fetcher = CountingFetcher::default();
        let extractor = DirExtractor(&[]);

        let result = Installer::new(&store, &fetcher, &extractor)
            .install(&v("0.11.0"), Some("u"))
            .await;

        assert!(matches!(
            result,
            Err(ToolchainError::UnexpectedArchiveLayout { ref entries }) if entries.is_empty()
        ));
    }

    #[tokio::test]
    async fn failed_download_leaves_store_untouched() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let store = store_in(temp.path());
        let extractor = DirExtractor(&["zig-dir"]);

        let result = Installer::new(&store, &FailingFetcher, &extractor)
            .install(&v("0.11.0"), Some("u"))
            .await;

        assert!(matches!(result, Err(ToolchainError::NetworkError { .. })));
        assert!(store.list().expect("list").is_empty());
    }

    #[tokio::test]
    async fn stale_staging_directory_is_replaced() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        std::fs::create_dir_all(temp.path().join(".tmp/leftover-from-crash"))
            .expect("dir should be created");
        let store = store_in(temp.path());
        let fetcher = CountingFetcher::default();
        let extractor = DirExtractor(&["zig-dir"]);

        Installer::new(&store, &fetcher, &extractor)
            .install(&v("0.11.0"), Some("u"))
            .await
            .expect("install succeeds despite stale staging");

        assert!(store.contains(&v("0.11.0")));
        assert!(!temp.path().join(".tmp").exists());
    }
}
