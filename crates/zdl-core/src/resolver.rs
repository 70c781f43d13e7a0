use log::warn;
use zdl_types::{Index, MASTER_KEY, ReleaseDescriptor, Specifier, ToolchainError, VersionId};

/// Outcome of resolving a [`Specifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub version: VersionId,
    /// `None` for positional specifiers, which only ever name installed
    /// versions.
    pub url: Option<String>,
}

pub struct VersionResolver {
    platform: String,
    fallback_url_template: String,
}

impl VersionResolver {
    #[must_use]
    pub fn new(platform: impl Into<String>, fallback_url_template: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            fallback_url_template: fallback_url_template.into(),
        }
    }

    /// Turn `spec` into a concrete version and download location.
    ///
    /// `index` is only consulted for specifiers where
    /// [`Specifier::needs_index`] holds; `installed` only for positional ones.
    ///
    /// # Errors
    /// Returns an error if the index lacks the requested entry or platform,
    /// if a position is out of range, or if a literal is not a version id.
    pub fn resolve(
        &self,
        spec: &Specifier,
        index: &Index,
        installed: &[VersionId],
    ) -> Result<Resolved, ToolchainError> {
        match spec {
            Specifier::Master => {
                let master = index
                    .master
                    .as_ref()
                    .ok_or(ToolchainError::MissingIndexEntry { key: MASTER_KEY })?;
                self.resolve_descriptor(master)
            }
            Specifier::Stable => {
                let latest = index
                    .latest_release()
                    .ok_or(ToolchainError::MissingIndexEntry { key: "stable" })?;
                self.resolve_descriptor(latest)
            }
            Specifier::Position(position) => {
                let mut sorted = installed.to_vec();
                sorted.sort();
                let version = select_position(&sorted, *position)?;
                Ok(Resolved { version, url: None })
            }
            Specifier::Literal(literal) => {
                let version: VersionId = literal.parse()?;
                if let Some(descriptor) = index.get(&version) {
                    return self.resolve_descriptor(descriptor);
                }

                let url = self.fallback_url_template.replace("{version}", literal);
                warn!("version {literal} is not in the index, attempting {url} anyway");
                Ok(Resolved {
                    version,
                    url: Some(url),
                })
            }
        }
    }

    fn resolve_descriptor(
        &self,
        descriptor: &ReleaseDescriptor,
    ) -> Result<Resolved, ToolchainError> {
        let url = descriptor.tarball(&self.platform).ok_or_else(|| {
            ToolchainError::PlatformUnavailable {
                version: descriptor.version.to_string(),
                platform: self.platform.clone(),
            }
        })?;

        Ok(Resolved {
            version: descriptor.version.clone(),
            url: Some(url.to_string()),
        })
    }

    /// Resolve `spec` to a version id only, without a download location.
    ///
    /// A literal is parsed on its own and `index` is ignored for it; a
    /// release lacking an artifact for this platform still resolves.
    ///
    /// # Errors
    /// Returns an error if the index lacks the requested entry, if a
    /// position is out of range, or if a literal is not a version id.
    pub fn resolve_version(
        spec: &Specifier,
        index: &Index,
        installed: &[VersionId],
    ) -> Result<VersionId, ToolchainError> {
        match spec {
            Specifier::Master => index
                .master
                .as_ref()
                .map(|master| master.version.clone())
                .ok_or(ToolchainError::MissingIndexEntry { key: MASTER_KEY }),
            Specifier::Stable => index
                .latest_release()
                .map(|latest| latest.version.clone())
                .ok_or(ToolchainError::MissingIndexEntry { key: "stable" }),
            Specifier::Position(position) => {
                let mut sorted = installed.to_vec();
                sorted.sort();
                select_position(&sorted, *position)
            }
            Specifier::Literal(literal) => Ok(literal.parse()?),
        }
    }
}

/// Negative positions count from the end: `-1` is the last element.
fn select_position(sorted: &[VersionId], position: i64) -> Result<VersionId, ToolchainError> {
    let out_of_range = || ToolchainError::IndexOutOfRange {
        index: position,
        len: sorted.len(),
    };

    let len = i64::try_from(sorted.len()).map_err(|_| out_of_range())?;
    let absolute = if position < 0 {
        len + position
    } else {
        position
    };

    usize::try_from(absolute)
        .ok()
        .and_then(|i| sorted.get(i))
        .cloned()
        .ok_or_else(out_of_range)
}
