use std::path::Path;

use log::debug;
use xz2::read::XzDecoder;
use zdl_types::{ArchiveExtractor, ToolchainError};

/// Unpacks `.tar.xz` payloads, the format every upstream build ships in.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarXzExtractor;

impl ArchiveExtractor for TarXzExtractor {
    fn extract(&self, archive: &[u8], dest: &Path) -> Result<(), ToolchainError> {
        let mut tar = tar::Archive::new(XzDecoder::new(archive));
        tar.set_preserve_permissions(true);
        tar.set_overwrite(false);
        tar.unpack(dest).map_err(|error| ToolchainError::Extract {
            details: error.to_string(),
        })?;

        debug!("Extraction complete to {}", dest.display());
        Ok(())
    }
}
