use log::{debug, warn};
use tokio::sync::mpsc;
use zdl_types::{ArchiveExtractor, Fetcher, Index, Specifier, ToolchainError, VersionId};

use crate::activation::{Activation, activate};
use crate::gc::{DEFAULT_AUTO_GC_LIMIT, GcMode, collect_garbage};
use crate::index::{INDEX_URL, fetch_index};
use crate::installer::{InstallOutcome, Installer};
use crate::pins::{pin, unpin};
use crate::resolver::{Resolved, VersionResolver};
use crate::store::InstallationStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    pub index_url: String,
    pub platform: String,
    /// Download URL pattern with a `{version}` slot.
    pub fallback_url_template: String,
    pub auto_gc_limit: usize,
}

impl ManagerConfig {
    #[must_use]
    pub fn new(platform: impl Into<String>, fallback_url_template: impl Into<String>) -> Self {
        Self {
            index_url: INDEX_URL.to_string(),
            platform: platform.into(),
            fallback_url_template: fallback_url_template.into(),
            auto_gc_limit: DEFAULT_AUTO_GC_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Downloading { version: VersionId, url: String },
    Installed { version: VersionId },
    Activating { version: VersionId },
    UpToDate { version: VersionId },
    Removed { version: VersionId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateReport {
    pub version: VersionId,
    pub install: InstallOutcome,
    pub activation: Activation,
    /// Versions removed by the automatic collection that follows.
    pub removed: Vec<VersionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub version: VersionId,
    pub active: bool,
    pub pinned: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListReport {
    pub entries: Vec<ListEntry>,
    /// Set when a filter resolved to a version that is not installed.
    pub missing: Option<VersionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinChange {
    pub version: VersionId,
    pub changed: bool,
}

/// Runs the top-level operations against one installation root.
pub struct ToolchainManager {
    config: ManagerConfig,
    store: InstallationStore,
    fetcher: Box<dyn Fetcher>,
    extractor: Box<dyn ArchiveExtractor>,
    progress: Option<mpsc::UnboundedSender<Progress>>,
}

impl ToolchainManager {
    #[must_use]
    pub fn new(
        config: ManagerConfig,
        store: InstallationStore,
        fetcher: Box<dyn Fetcher>,
        extractor: Box<dyn ArchiveExtractor>,
    ) -> Self {
        Self {
            config,
            store,
            fetcher,
            extractor,
            progress: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: mpsc::UnboundedSender<Progress>) -> Self {
        self.progress = Some(progress);
        self
    }

    #[must_use]
    pub fn store(&self) -> &InstallationStore {
        &self.store
    }

    fn report(&self, event: Progress) {
        if let Some(progress) = &self.progress {
            let _ = progress.send(event);
        }
    }

    /// Resolve `spec`, fetching the index only when the specifier needs it.
    ///
    /// # Errors
    /// Propagates index fetch failures and resolution errors.
    pub async fn resolve(&self, spec: &Specifier) -> Result<Resolved, ToolchainError> {
        let index = if spec.needs_index() {
            fetch_index(self.fetcher.as_ref(), &self.config.index_url).await?
        } else {
            Index::default()
        };
        let installed = match spec {
            Specifier::Position(_) => self.store.list()?,
            _ => Vec::new(),
        };

        let resolver =
            VersionResolver::new(&self.config.platform, &self.config.fallback_url_template);
        let resolved = resolver.resolve(spec, &index, &installed)?;
        debug!("{spec} resolved to {}", resolved.version);
        Ok(resolved)
    }

    /// Resolve `spec` to a version id without a download location. The index is only
    /// fetched for `master` and `stable`.
    async fn resolve_version(&self, spec: &Specifier) -> Result<VersionId, ToolchainError> {
        let index = if spec.names_version_via_index() {
            fetch_index(self.fetcher.as_ref(), &self.config.index_url).await?
        } else {
            Index::default()
        };
        let installed = match spec {
            Specifier::Position(_) => self.store.list()?,
            _ => Vec::new(),
        };

        VersionResolver::resolve_version(spec, &index, &installed)
    }

    /// Resolve, install if needed, activate, then collect old versions.
    ///
    /// # Errors
    /// Aborts on the first failing step. A failed install leaves the active
    /// pointer and the installed set untouched.
    pub async fn activate(&self, spec: &Specifier) -> Result<ActivateReport, ToolchainError> {
        let Resolved { version, url, .. } = self.resolve(spec).await?;

        if !self.store.contains(&version)
            && let Some(url) = &url
        {
            self.report(Progress::Downloading {
                version: version.clone(),
                url: url.clone(),
            });
        }

        let installer = Installer::new(&self.store, self.fetcher.as_ref(), self.extractor.as_ref());
        let install = installer.install(&version, url.as_deref()).await?;
        if install == InstallOutcome::Installed {
            self.report(Progress::Installed {
                version: version.clone(),
            });
        }

        let activation = activate(&self.store, &version)?;
        self.report(match activation {
            Activation::Activated => Progress::Activating {
                version: version.clone(),
            },
            Activation::AlreadyActive => Progress::UpToDate {
                version: version.clone(),
            },
        });
        self.store.invalidate();

        let removed = collect_garbage(
            &self.store,
            GcMode::Auto {
                limit: self.config.auto_gc_limit,
            },
        )?;
        for removed_version in &removed {
            self.report(Progress::Removed {
                version: removed_version.clone(),
            });
        }

        Ok(ActivateReport {
            version,
            install,
            activation,
            removed,
        })
    }

    /// Installed versions with their active and pinned flags.
    ///
    /// With a filter, only the resolved version is listed. A filter naming
    /// a version that is not installed is reported through
    /// [`ListReport::missing`] rather than as an error, unless nothing is
    /// installed at all.
    ///
    /// # Errors
    /// Returns [`ToolchainError::NotInstalled`] when filtering an empty
    /// store, and propagates listing and resolution errors.
    pub async fn list(&self, filter: Option<&Specifier>) -> Result<ListReport, ToolchainError> {
        let installed = self.store.list()?;
        let active = self.store.read_active()?;
        let pins = self.store.load_metadata().pins;

        let entry = |version: VersionId| ListEntry {
            active: active.as_ref() == Some(&version),
            pinned: pins.contains(&version),
            version,
        };

        let Some(spec) = filter else {
            return Ok(ListReport {
                entries: installed.into_iter().map(entry).collect(),
                missing: None,
            });
        };

        let version = self.resolve_version(spec).await?;
        if installed.contains(&version) {
            return Ok(ListReport {
                entries: vec![entry(version)],
                missing: None,
            });
        }

        if installed.is_empty() {
            return Err(ToolchainError::not_installed(&version));
        }

        warn!("{version} is not installed");
        Ok(ListReport {
            entries: Vec::new(),
            missing: Some(version),
        })
    }

    /// # Errors
    /// Returns [`ToolchainError::NotInstalled`] if the resolved version is
    /// not installed, and propagates resolution and save errors.
    pub async fn pin(&self, spec: &Specifier) -> Result<PinChange, ToolchainError> {
        let version = self.resolve_version(spec).await?;
        let changed = pin(&self.store, &version)?;
        Ok(PinChange { version, changed })
    }

    /// # Errors
    /// Returns [`ToolchainError::NotInstalled`] if the resolved version is
    /// not installed, and propagates resolution and save errors.
    pub async fn unpin(&self, spec: &Specifier) -> Result<PinChange, ToolchainError> {
        let version = self.resolve_version(spec).await?;
        let changed = unpin(&self.store, &version)?;
        Ok(PinChange { version, changed })
    }

    /// Remove every version that is neither active nor pinned.
    ///
    /// # Errors
    /// Propagates listing and removal errors.
    pub fn gc(&self) -> Result<Vec<VersionId>, ToolchainError> {
        let removed = collect_garbage(&self.store, GcMode::Manual)?;
        for version in &removed {
            self.report(Progress::Removed {
                version: version.clone(),
            });
        }
        Ok(removed)
    }
}
