//! Lifecycle engine for locally installed Zig toolchains.
//!
//! Everything here operates on one installation root:
//! - [`InstallationStore`] lists versions and owns the active pointer.
//! - [`Installer`] downloads and atomically places a release.
//! - [`activate`], [`collect_garbage`], [`pin`] and [`unpin`] mutate it.
//! - [`ToolchainManager`] composes them into the top-level operations.

mod activation;
mod atomic;
mod extract;
mod gc;
mod http;
mod index;
mod installer;
mod manager;
mod metadata;
mod pins;
mod pointer;
mod resolver;
mod store;

pub use activation::{Activation, activate};
pub use atomic::{remove_entry, rename_into_place, write_atomic};
pub use extract::TarXzExtractor;
pub use gc::{DEFAULT_AUTO_GC_LIMIT, GcMode, collect_garbage};
pub use http::HttpFetcher;
pub use index::{INDEX_URL, fetch_index};
pub use installer::{InstallOutcome, Installer};
pub use manager::{
    ActivateReport, ListEntry, ListReport, ManagerConfig, PinChange, Progress, ToolchainManager,
};
pub use metadata::Metadata;
pub use pins::{pin, unpin};
pub use pointer::{ACTIVE_ENTRY, ActivePointer, FilePointer, default_pointer};
#[cfg(unix)]
pub use pointer::SymlinkPointer;
pub use resolver::{Resolved, VersionResolver};
pub use store::{InstallationStore, METADATA_FILE, STAGING_DIR};
