use thiserror::Error;
use zdl_platform::AppPathsError;
use zdl_types::ToolchainError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    Paths(#[from] AppPathsError),

    #[error("no Zig builds are published for this host; pass --platform or set `platform` in {settings}")]
    UnsupportedHost { settings: String },

    #[error("failed to encode settings: {0}")]
    Settings(#[from] serde_json::Error),
}
