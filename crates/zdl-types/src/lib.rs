mod error;
mod traits;
mod types;

pub use error::{NetworkStage, ToolchainError};
pub use traits::{ArchiveExtractor, Fetcher};
pub use types::{
    Artifact, Index, IndexParseError, MASTER_KEY, ReleaseDescriptor, Specifier, VersionComponent,
    VersionId, VersionParseError, sort_versions,
};
