//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use nr_core::NamingScheme;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory containing the NINA log files.
    pub log_path: PathBuf,

    /// Image file naming scheme used to recover target names.
    pub pattern: NamingScheme,

    /// Pushover application token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushover_token: Option<String>,

    /// Pushover user key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushover_user: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("log_path", &self.log_path)
            .field("pattern", &self.pattern)
            .field(
                "pushover_token",
                &self.pushover_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "pushover_user",
                &self.pushover_user.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_path: default_log_path().unwrap_or_else(|| PathBuf::from(".")),
            pattern: NamingScheme::default(),
            pushover_token: None,
            pushover_user: None,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // NR_LOG_PATH, NR_PATTERN, NR_PUSHOVER_TOKEN, NR_PUSHOVER_USER
        figment = figment.merge(Env::prefixed("NR_"));

        figment.extract()
    }

    /// Pushover credentials, if both are set and non-blank.
    pub fn pushover_credentials(&self) -> Option<(&str, &str)> {
        let token = self.pushover_token.as_deref().map(str::trim)?;
        let user = self.pushover_user.as_deref().map(str::trim)?;
        (!token.is_empty() && !user.is_empty()).then_some((token, user))
    }
}

/// Returns the platform-specific config directory for nina-report.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("nina-report"))
}

/// Returns the directory NINA writes its logs to.
///
/// On Windows: `%LOCALAPPDATA%\NINA\Logs`
pub fn default_log_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("NINA").join("Logs"))
}
