mod paths;
mod platform;

pub use paths::{AppPaths, AppPathsError};
pub use platform::{fallback_url_template, host_platform};
