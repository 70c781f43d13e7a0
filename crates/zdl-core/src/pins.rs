use log::info;
use zdl_types::{ToolchainError, VersionId};

use crate::store::InstallationStore;

/// Protect an installed version from garbage collection.
///
/// Returns `true` if the pin set changed. The record is written either way.
///
/// # Errors
/// Returns [`ToolchainError::NotInstalled`] if `version` is not in the store,
/// leaving the record untouched, or an error if it cannot be saved.
pub fn pin(store: &InstallationStore, version: &VersionId) -> Result<bool, ToolchainError> {
    update_pins(store, version, |pins| pins.insert(version.clone()))
}

/// Drop the garbage-collection protection for `version`.
///
/// Returns `true` if the pin set changed. The record is written either way.
///
/// # Errors
/// Returns [`ToolchainError::NotInstalled`] if `version` is not in the store,
/// leaving the record untouched, or an error if it cannot be saved.
pub fn unpin(store: &InstallationStore, version: &VersionId) -> Result<bool, ToolchainError> {
    update_pins(store, version, |pins| pins.remove(version))
}

fn update_pins(
    store: &InstallationStore,
    version: &VersionId,
    change: impl FnOnce(&mut std::collections::BTreeSet<VersionId>) -> bool,
) -> Result<bool, ToolchainError> {
    if !store.list()?.contains(version) {
        return Err(ToolchainError::not_installed(version));
    }

    let mut metadata = store.load_metadata();
    let changed = change(&mut metadata.pins);
    store.save_metadata(&metadata)?;

    if changed {
        info!("pins: {}", display_pins(&metadata.pins));
    }
    Ok(changed)
}

fn display_pins(pins: &std::collections::BTreeSet<VersionId>) -> String {
    if pins.is_empty() {
        return "<none>".to_string();
    }
    pins.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
