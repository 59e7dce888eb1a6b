//! Settings from `~/.config/geekcalendar/config.yml`.

use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use serde::Deserialize;

use crate::error::{SyncError, SyncResult};
use crate::remote::github::DEFAULT_API_URL;

const APP_DIR: &str = "geekcalendar";
const CONFIG_FILE: &str = "config.yml";

/// Overrides `github.token` from the settings file.
pub const TOKEN_ENV: &str = "GEEKCAL_GITHUB_TOKEN";

/// Settings as read from disk. Every field is optional so that local-only
/// commands work without any configuration.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub github: Option<GithubSection>,
    pub calendar_file: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    pub metadata_file: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct GithubSection {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub path: Option<String>,
    pub token: Option<String>,
    pub api_url: Option<String>,
}

/// Validated remote settings. Only built through [`Settings::remote`].
#[derive(Clone)]
pub struct RemoteConfig {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub token: String,
    pub api_url: String,
}

impl RemoteConfig {
    /// Key used to file this remote's history in the sync metadata.
    pub fn key(&self) -> String {
        format!("{}/{}:{}", self.owner, self.repo, self.path)
    }
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("path", &self.path)
            .field("token", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Settings {
    pub fn config_dir() -> SyncResult<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?
            .join(APP_DIR);
        Ok(dir)
    }

    pub fn config_path() -> SyncResult<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load settings from the default location, applying the token override
    /// from the environment.
    pub fn load() -> SyncResult<Self> {
        let token = std::env::var(TOKEN_ENV).ok();
        Self::load_from(&Self::config_path()?, token)
    }

    /// Load settings from `path` (which may be absent). A non-empty
    /// `token_override` takes precedence over the file's token.
    pub fn load_from(path: &Path, token_override: Option<String>) -> SyncResult<Self> {
        let mut settings: Settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml).required(false))
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        if let Some(token) = token_override.filter(|t| !t.trim().is_empty()) {
            settings.github.get_or_insert_with(GithubSection::default).token = Some(token);
        }

        Ok(settings)
    }

    /// Validate the GitHub section, naming every missing field.
    pub fn remote(&self) -> SyncResult<RemoteConfig> {
        let github = self.github.clone().unwrap_or_default();

        let mut missing = Vec::new();
        let mut required = |value: Option<String>, name: &'static str| {
            let value = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
            if value.is_none() {
                missing.push(name);
            }
            value.unwrap_or_default()
        };
        let owner = required(github.owner, "github.owner");
        let repo = required(github.repo, "github.repo");
        let path = required(github.path, "github.path");
        let token = required(github.token, "github.token");

        if !missing.is_empty() {
            return Err(SyncError::Config(format!(
                "Missing {} in {} (the token may also be set with {TOKEN_ENV})",
                missing.join(", "),
                Self::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| CONFIG_FILE.to_string()),
            )));
        }

        let api_url = github
            .api_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(RemoteConfig {
            owner,
            repo,
            path: path.trim_matches('/').to_string(),
            token,
            api_url,
        })
    }

    pub fn calendar_file(&self) -> SyncResult<PathBuf> {
        self.path_or_default(self.calendar_file.as_deref(), "calendar.json")
    }

    pub fn backup_dir(&self) -> SyncResult<PathBuf> {
        self.path_or_default(self.backup_dir.as_deref(), "backups")
    }

    pub fn metadata_file(&self) -> SyncResult<PathBuf> {
        self.path_or_default(self.metadata_file.as_deref(), "sync_metadata.json")
    }

    fn path_or_default(&self, configured: Option<&Path>, default_name: &str) -> SyncResult<PathBuf> {
        match configured {
            Some(path) => Ok(expand_path(path)),
            None => Ok(Self::config_dir()?.join(default_name)),
        }
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
