use log::info;
use zdl_types::{ToolchainError, VersionId};

use crate::store::InstallationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Activated,
    AlreadyActive,
}

/// Point the active pointer at `version`.
///
/// The pointer is only rewritten when it names something else. Readers see
/// either the old target or the new one, never a missing entry.
///
/// # Errors
/// Returns [`ToolchainError::NotInstalled`] if `version` has no directory in
/// the store, or an I/O error if the pointer cannot be read or replaced.
pub fn activate(
    store: &InstallationStore,
    version: &VersionId,
) -> Result<Activation, ToolchainError> {
    if !store.contains(version) {
        return Err(ToolchainError::not_installed(version));
    }

    if store.read_active()?.as_ref() == Some(version) {
        return Ok(Activation::AlreadyActive);
    }

    store.pointer().replace(&version.to_string())?;
    info!("active version is now {version}");
    Ok(Activation::Activated)
}
