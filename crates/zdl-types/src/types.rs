use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A toolchain version identifier.
///
/// Releases look like `0.11.0`; nightly builds look like
/// `0.12.0-dev.100+abc123`. Parsing is strict, so `to_string()` always
/// reproduces the text that was parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionId {
    Release {
        major: u64,
        minor: u64,
        patch: u64,
    },
    PreRelease {
        major: u64,
        minor: u64,
        patch: u64,
        dev: u64,
        build: String,
    },
}

impl VersionId {
    #[must_use]
    pub fn release(major: u64, minor: u64, patch: u64) -> Self {
        Self::Release {
            major,
            minor,
            patch,
        }
    }

    #[must_use]
    pub fn pre_release(major: u64, minor: u64, patch: u64, dev: u64, build: &str) -> Self {
        Self::PreRelease {
            major,
            minor,
            patch,
            dev,
            build: build.to_string(),
        }
    }

    #[must_use]
    pub fn triple(&self) -> (u64, u64, u64) {
        match *self {
            Self::Release {
                major,
                minor,
                patch,
            }
            | Self::PreRelease {
                major,
                minor,
                patch,
                ..
            } => (major, minor, patch),
        }
    }
}

impl Ord for VersionId {
    fn cmp(&self, other: &Self) -> Ordering {
        // A release sorts before any nightly sharing its numeric triple.
        self.triple()
            .cmp(&other.triple())
            .then_with(|| match (self, other) {
                (Self::Release { .. }, Self::Release { .. }) => Ordering::Equal,
                (Self::Release { .. }, Self::PreRelease { .. }) => Ordering::Less,
                (Self::PreRelease { .. }, Self::Release { .. }) => Ordering::Greater,
                (
                    Self::PreRelease {
                        dev: a, build: ab, ..
                    },
                    Self::PreRelease {
                        dev: b, build: bb, ..
                    },
                ) => a.cmp(b).then_with(|| ab.cmp(bb)),
            })
    }
}

impl PartialOrd for VersionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release {
                major,
                minor,
                patch,
            } => write!(f, "{major}.{minor}.{patch}"),
            Self::PreRelease {
                major,
                minor,
                patch,
                dev,
                build,
            } => write!(f, "{major}.{minor}.{patch}-dev.{dev}+{build}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComponent {
    Major,
    Minor,
    Patch,
    Dev,
    Build,
}

impl fmt::Display for VersionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
            Self::Dev => write!(f, "dev"),
            Self::Build => write!(f, "build"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("Expected X.Y.Z or X.Y.Z-dev.N+HASH, got: {input}")]
    InvalidFormat { input: String },
    #[error("Invalid {component} component in {input}: {value:?}")]
    InvalidComponent {
        component: VersionComponent,
        input: String,
        value: String,
    },
}

fn parse_number(
    value: &str,
    component: VersionComponent,
    input: &str,
) -> Result<u64, VersionParseError> {
    let invalid = || VersionParseError::InvalidComponent {
        component,
        input: input.to_string(),
        value: value.to_string(),
    };

    if value.is_empty()
        || !value.bytes().all(|b| b.is_ascii_digit())
        || (value.len() > 1 && value.starts_with('0'))
    {
        return Err(invalid());
    }
    value.parse().map_err(|_| invalid())
}

impl FromStr for VersionId {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid_format = || VersionParseError::InvalidFormat {
            input: s.to_string(),
        };

        let (core, pre) = match s.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (s, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(invalid_format());
        };
        let major = parse_number(major, VersionComponent::Major, s)?;
        let minor = parse_number(minor, VersionComponent::Minor, s)?;
        let patch = parse_number(patch, VersionComponent::Patch, s)?;

        let Some(pre) = pre else {
            return Ok(Self::release(major, minor, patch));
        };

        let (dev, build) = pre
            .strip_prefix("dev.")
            .and_then(|rest| rest.split_once('+'))
            .ok_or_else(invalid_format)?;
        let dev = parse_number(dev, VersionComponent::Dev, s)?;

        if build.is_empty() || build.contains(['.', '+', '-']) {
            return Err(VersionParseError::InvalidComponent {
                component: VersionComponent::Build,
                input: s.to_string(),
                value: build.to_string(),
            });
        }

        Ok(Self::pre_release(major, minor, patch, dev, build))
    }
}

impl Serialize for VersionId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse every id and return them in ascending order.
///
/// # Errors
/// Returns the first parse failure encountered.
pub fn sort_versions<I, S>(ids: I) -> Result<Vec<VersionId>, VersionParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = ids
        .into_iter()
        .map(|id| id.as_ref().parse())
        .collect::<Result<Vec<VersionId>, _>>()?;
    parsed.sort();
    Ok(parsed)
}

/// User input naming the version an operation should act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Specifier {
    Master,
    Stable,
    /// Index into the ascending installed list; negative values count from
    /// the end.
    Position(i64),
    Literal(String),
}

impl Specifier {
    #[must_use]
    pub fn parse(input: Option<&str>) -> Self {
        match input.map(str::trim) {
            None | Some("master") => Self::Master,
            Some("stable") => Self::Stable,
            Some(other) => other
                .parse::<i64>()
                .map_or_else(|_| Self::Literal(other.to_string()), Self::Position),
        }
    }

    /// Whether resolving this specifier requires the remote index.
    #[must_use]
    pub fn needs_index(&self) -> bool {
        !matches!(self, Self::Position(_))
    }

    /// Whether the version id alone requires the remote index. Literals
    /// already name their version; only the download location needs it.
    #[must_use]
    pub fn names_version_via_index(&self) -> bool {
        matches!(self, Self::Master | Self::Stable)
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Master => write!(f, "master"),
            Self::Stable => write!(f, "stable"),
            Self::Position(index) => write!(f, "{index}"),
            Self::Literal(version) => write!(f, "{version}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub tarball: String,
    #[serde(default)]
    pub shasum: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    pub version: VersionId,
    pub date: Option<String>,
    pub artifacts: BTreeMap<String, Artifact>,
}

impl ReleaseDescriptor {
    #[must_use]
    pub fn tarball(&self, platform: &str) -> Option<&str> {
        self.artifacts.get(platform).map(|a| a.tarball.as_str())
    }
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(flatten)]
    rest: BTreeMap<String, serde_json::Value>,
}

pub const MASTER_KEY: &str = "master";

/// The remote release index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    pub master: Option<ReleaseDescriptor>,
    pub releases: BTreeMap<VersionId, ReleaseDescriptor>,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexParseError {
    #[error("index is not a valid JSON object: {0}")]
    Json(#[from] serde_json::Error),
    #[error("index entry {key:?} has no version field")]
    MissingVersion { key: String },
    #[error(transparent)]
    Version(#[from] VersionParseError),
}

impl Index {
    /// Parse the JSON index document.
    ///
    /// # Errors
    /// Returns an error if the document is not a JSON object of release
    /// entries, or if a key (or the `master` version field) is not a valid
    /// version id.
    pub fn from_json(bytes: &[u8]) -> Result<Self, IndexParseError> {
        let raw: BTreeMap<String, RawEntry> = serde_json::from_slice(bytes)?;
        let mut index = Index::default();

        for (key, entry) in raw {
            let version: VersionId = if key == MASTER_KEY {
                entry
                    .version
                    .as_deref()
                    .ok_or_else(|| IndexParseError::MissingVersion { key: key.clone() })?
                    .parse()?
            } else {
                key.parse()?
            };

            let artifacts = entry
                .rest
                .into_iter()
                .filter_map(|(platform, value)| {
                    serde_json::from_value::<Artifact>(value)
                        .ok()
                        .map(|artifact| (platform, artifact))
                })
                .collect();

            let descriptor = ReleaseDescriptor {
                version: version.clone(),
                date: entry.date,
                artifacts,
            };

            if key == MASTER_KEY {
                index.master = Some(descriptor);
            } else {
                index.releases.insert(version, descriptor);
            }
        }

        Ok(index)
    }

    #[must_use]
    pub fn latest_release(&self) -> Option<&ReleaseDescriptor> {
        self.releases.values().next_back()
    }

    #[must_use]
    pub fn get(&self, version: &VersionId) -> Option<&ReleaseDescriptor> {
        self.releases.get(version)
    }
}
