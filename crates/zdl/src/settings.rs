use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zdl_core::{DEFAULT_AUTO_GC_LIMIT, INDEX_URL, ManagerConfig};
use zdl_platform::{AppPaths, fallback_url_template, host_platform};

use crate::cli::GlobalArgs;
use crate::error::CliError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_index_url")]
    pub index_url: String,

    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    #[serde(default)]
    pub platform: Option<String>,

    #[serde(default)]
    pub fallback_url_template: Option<String>,

    #[serde(default = "default_auto_gc_limit")]
    pub auto_gc_limit: usize,

    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_index_url() -> String {
    INDEX_URL.to_string()
}

fn default_auto_gc_limit() -> usize {
    DEFAULT_AUTO_GC_LIMIT
}

fn default_download_timeout() -> u64 {
    600
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_url: default_index_url(),
            install_dir: None,
            platform: None,
            fallback_url_template: None,
            auto_gc_limit: default_auto_gc_limit(),
            download_timeout_secs: default_download_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

/// Settings after applying command-line overrides and host defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveSettings {
    pub install_dir: PathBuf,
    pub platform: String,
    pub index_url: String,
    pub fallback_url_template: String,
    pub auto_gc_limit: usize,
    pub download_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Settings {
    /// Read the settings file. A missing or malformed file yields defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Layer `overrides` over these settings and fill host defaults.
    ///
    /// # Errors
    /// Returns an error if no platform is configured and the host has no
    /// published builds.
    pub fn effective(
        &self,
        overrides: &GlobalArgs,
        paths: &AppPaths,
    ) -> Result<EffectiveSettings, CliError> {
        let platform = overrides
            .platform
            .clone()
            .or_else(|| self.platform.clone())
            .or_else(|| host_platform().map(str::to_string))
            .ok_or_else(|| CliError::UnsupportedHost {
                settings: paths.settings_file().display().to_string(),
            })?;

        let install_dir = overrides
            .install_dir
            .clone()
            .or_else(|| self.install_dir.clone())
            .unwrap_or_else(|| paths.install_root.clone());

        let fallback_url_template = self
            .fallback_url_template
            .clone()
            .unwrap_or_else(|| fallback_url_template(&platform));

        Ok(EffectiveSettings {
            install_dir,
            platform,
            index_url: self.index_url.clone(),
            fallback_url_template,
            auto_gc_limit: self.auto_gc_limit,
            download_timeout_secs: self.download_timeout_secs,
            connect_timeout_secs: self.connect_timeout_secs,
        })
    }
}

impl EffectiveSettings {
    #[must_use]
    pub fn manager_config(&self) -> ManagerConfig {
        let mut config = ManagerConfig::new(&self.platform, &self.fallback_url_template);
        config.index_url.clone_from(&self.index_url);
        config.auto_gc_limit = self.auto_gc_limit;
        config
    }
}
