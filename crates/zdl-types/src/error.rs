use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::{IndexParseError, VersionParseError};

#[derive(Error, Debug)]
pub enum ToolchainError {
    #[error("Network error during {operation} ({stage}): {details}")]
    NetworkError {
        operation: &'static str,
        stage: NetworkStage,
        details: String,
    },

    #[error(transparent)]
    ParseError(#[from] VersionParseError),

    #[error(
        "Archive must contain exactly one top-level entry, found {}: {entries:?}",
        .entries.len()
    )]
    UnexpectedArchiveLayout { entries: Vec<String> },

    #[error("Version {version} is not installed")]
    NotInstalled { version: String },

    #[error("Index {index} is out of range for {len} installed version(s)")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("Release index has no {key:?} entry")]
    MissingIndexEntry { key: &'static str },

    #[error("Version {version} has no download for platform {platform}")]
    PlatformUnavailable { version: String, platform: String },

    #[error("Version {version} is not installed and has no download URL")]
    NoDownloadUrl { version: String },

    #[error("Failed to extract archive: {details}")]
    Extract { details: String },

    #[error("{context} ({}): {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStage {
    #[error("request")]
    Request,
    #[error("status")]
    Status,
    #[error("response parse")]
    ResponseParse,
}

impl ToolchainError {
    pub fn network_request(operation: &'static str, details: impl Into<String>) -> Self {
        Self::NetworkError {
            operation,
            stage: NetworkStage::Request,
            details: details.into(),
        }
    }

    pub fn network_request_from<E>(operation: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::network_request(operation, error.to_string())
    }

    pub fn network_status(operation: &'static str, details: impl Into<String>) -> Self {
        Self::NetworkError {
            operation,
            stage: NetworkStage::Status,
            details: details.into(),
        }
    }

    pub fn network_parse(operation: &'static str, details: impl Into<String>) -> Self {
        Self::NetworkError {
            operation,
            stage: NetworkStage::ResponseParse,
            details: details.into(),
        }
    }

    pub fn network_parse_from<E>(operation: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::network_parse(operation, error.to_string())
    }

    pub fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn not_installed(version: impl ToString) -> Self {
        Self::NotInstalled {
            version: version.to_string(),
        }
    }
}

impl From<IndexParseError> for ToolchainError {
    fn from(err: IndexParseError) -> Self {
        match err {
            IndexParseError::Version(inner) => Self::ParseError(inner),
            other => Self::network_parse_from("fetch index", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{NetworkStage, ToolchainError};
    use crate::types::{Index, VersionId};

    #[test]
    fn io_error_display_includes_context_and_path() {
        let error = ToolchainError::io(
            "failed to create staging directory",
            Path::new("/tmp/zig/.tmp"),
            std::io::Error::other("permission denied"),
        );

        let message = error.to_string();
        assert!(message.starts_with("failed to create staging directory (/tmp/zig/.tmp)"));
        assert!(message.contains("permission denied"));
    }

    #[test]
    fn network_helpers_set_expected_stage() {
        let request = ToolchainError::network_request("download", "timed out");
        assert!(matches!(
            request,
            ToolchainError::NetworkError {
                operation: "download",
                stage: NetworkStage::Request,
                ..
            }
        ));

        let parse = ToolchainError::network_parse("fetch index", "invalid json");
        assert!(matches!(
            parse,
            ToolchainError::NetworkError {
                stage: NetworkStage::ResponseParse,
                ..
            }
        ));
    }

    #[test]
    fn version_parse_failure_converts_to_parse_error() {
        let err = "0.1".parse::<VersionId>().expect_err("too few segments");
        assert!(matches!(
            ToolchainError::from(err),
            ToolchainError::ParseError(_)
        ));
    }

    #[test]
    fn malformed_index_maps_to_network_parse() {
        let err = Index::from_json(b"[1, 2, 3]").expect_err("not an object");
        assert!(matches!(
            ToolchainError::from(err),
            ToolchainError::NetworkError {
                stage: NetworkStage::ResponseParse,
                ..
            }
        ));
    }

    #[test]
    fn archive_layout_display_lists_entries() {
        let error = ToolchainError::UnexpectedArchiveLayout {
            entries: vec!["zig-a".to_string(), "zig-b".to_string()],
        };
        assert_eq!(
            error.to_string(),
            r#"Archive must contain exactly one top-level entry, found 2: ["zig-a", "zig-b"]"#
        );
    }

    #[test]
    fn not_installed_display_names_version() {
        let error = ToolchainError::not_installed("0.10.1");
        assert_eq!(error.to_string(), "Version 0.10.1 is not installed");
    }
}
