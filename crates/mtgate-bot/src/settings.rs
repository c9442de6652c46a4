//! Bot configuration.
//!
//! Settings load from an optional JSON file, then environment variables
//! override the sensitive fields so tokens never have to live on disk.
//! `validate` runs once at startup and fails fast on anything the bot
//! cannot run without.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const TOKEN_ENV: &str = "MTGATE_BOT_TOKEN";
const CHANNEL_ENV: &str = "MTGATE_CHANNEL_ID";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting {field}: {detail}")]
    Invalid {
        field: &'static str,
        detail: String,
    },

    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Chat platform bot token. Usually supplied via `MTGATE_BOT_TOKEN`.
    #[serde(default)]
    pub bot_token: String,

    /// Channel whose membership gates proxy access. Accepts an
    /// `@username`, bare username, t.me URL, or numeric id.
    #[serde(default)]
    pub channel_id: String,

    /// User allowed to run the stats command. Zero means nobody.
    #[serde(default)]
    pub admin_user_id: i64,

    /// Language code for user-facing messages ("en" or "fa").
    #[serde(default = "default_language")]
    pub language: String,

    /// Path of the proxy daemon's systemd unit file.
    #[serde(default = "default_unit_path")]
    pub service_unit_path: PathBuf,

    /// Path of the user registry JSON file.
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,

    /// Seconds to wait between daemon restarts.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_seconds: u64,

    /// Public address advertised in connection links. Falls back to the
    /// built-in address when unset.
    #[serde(default)]
    pub public_ip: Option<String>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_unit_path() -> PathBuf {
    PathBuf::from("/etc/systemd/system/MTProxy.service")
}

fn default_cooldown_secs() -> u64 {
    mtgate_core::DEFAULT_RESTART_COOLDOWN.as_secs()
}

fn default_registry_path() -> PathBuf {
    ProjectDirs::from("", "", "mtgate").map_or_else(
        || PathBuf::from("users.json"),
        |dirs| dirs.data_dir().join("users.json"),
    )
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            channel_id: String::new(),
            admin_user_id: 0,
            language: default_language(),
            service_unit_path: default_unit_path(),
            registry_path: default_registry_path(),
            cooldown_seconds: default_cooldown_secs(),
            public_ip: None,
        }
    }
}

impl Settings {
    /// Load settings from `path` (if given and present), then apply
    /// environment overrides and normalize the channel id.
    ///
    /// # Errors
    ///
    /// Fails on an unreadable or unparseable settings file, or when
    /// [`Self::validate`] rejects the result.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(p) if p.exists() => {
                debug!("Loading settings from {}", p.display());
                let content = std::fs::read_to_string(p)?;
                serde_json::from_str(&content)?
            }
            Some(p) => {
                warn!("Settings file {} not found, using defaults", p.display());
                Self::default()
            }
            None => Self::default(),
        };

        if let Ok(token) = std::env::var(TOKEN_ENV) {
            settings.bot_token = token;
        }
        if let Ok(channel) = std::env::var(CHANNEL_ENV) {
            settings.channel_id = channel;
        }

        settings.channel_id = normalize_channel_id(&settings.channel_id);
        settings.validate()?;
        Ok(settings)
    }

    /// # Errors
    ///
    /// Rejects a missing token or channel id and unknown language codes.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.bot_token.is_empty() {
            return Err(SettingsError::Missing("botToken"));
        }
        if self.channel_id.is_empty() {
            return Err(SettingsError::Missing("channelId"));
        }
        if !matches!(self.language.as_str(), "en" | "fa") {
            return Err(SettingsError::Invalid {
                field: "language",
                detail: format!("unsupported language code {:?}", self.language),
            });
        }
        Ok(())
    }
}

/// Normalize a channel reference to `@username` form.
///
/// URLs and bare usernames all collapse to `@username`; numeric ids
/// (a leading `-` followed by digits) pass through untouched.
#[must_use]
pub fn normalize_channel_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Some(digits) = trimmed.strip_prefix('-')
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
    {
        return trimmed.to_string();
    }

    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let without_host = without_scheme
        .strip_prefix("t.me/")
        .unwrap_or(without_scheme);
    let bare = without_host.strip_prefix('@').unwrap_or(without_host);

    format!("@{bare}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_channel_id_variants() {
        assert_eq!(normalize_channel_id("https://t.me/my_channel"), "@my_channel");
        assert_eq!(normalize_channel_id("t.me/my_channel"), "@my_channel");
        assert_eq!(normalize_channel_id("@my_channel"), "@my_channel");
        assert_eq!(normalize_channel_id("my_channel"), "@my_channel");
        assert_eq!(normalize_channel_id("  my_channel  "), "@my_channel");
    }

    #[test]
    fn test_normalize_keeps_numeric_ids() {
        assert_eq!(normalize_channel_id("-1001234567890"), "-1001234567890");
    }

    #[test]
    fn test_normalize_empty_stays_empty() {
        assert_eq!(normalize_channel_id(""), "");
        assert_eq!(normalize_channel_id("   "), "");
    }

    #[test]
    fn test_validate_requires_token_and_channel() {
        let mut settings = Settings {
            bot_token: "123:abc".to_string(),
            channel_id: "@c".to_string(),
            ..Settings::default()
        };
        assert!(settings.validate().is_ok());

        settings.bot_token.clear();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Missing("botToken"))
        ));

        settings.bot_token = "123:abc".to_string();
        settings.channel_id.clear();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Missing("channelId"))
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_language() {
        let settings = Settings {
            bot_token: "123:abc".to_string(),
            channel_id: "@c".to_string(),
            language: "de".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Invalid { field: "language", .. })
        ));
    }

    #[test]
    fn test_settings_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"botToken":"123:abc","channelId":"t.me/gate","adminUserId":7,"language":"fa"}"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.bot_token, "123:abc");
        assert_eq!(settings.channel_id, "@gate");
        assert_eq!(settings.admin_user_id, 7);
        assert_eq!(settings.language, "fa");
        assert_eq!(settings.service_unit_path, default_unit_path());
    }
}
