//! Persistent settings model, file-backed manager and the single write accessor.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::estimate::EstimateStrategy;
use crate::rounding::RoundingStrategy;
use crate::ticket::TicketPattern;

pub const CONFIG_PATH_ENV: &str = "TEMPO_SYNC_CONFIG";
pub const DEFAULT_ACCOUNT_ATTRIBUTE_KEY: &str = "_Account_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {} is not valid: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

fn default_interval_minutes() -> u32 {
    15
}

fn default_threshold_minutes() -> u32 {
    5
}

fn default_account_attribute_key() -> String {
    DEFAULT_ACCOUNT_ATTRIBUTE_KEY.to_string()
}

fn default_post_concurrency() -> usize {
    4
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialSettings {
    pub toggl_token: Option<String>,
    pub tempo_token: Option<String>,
    pub tempo_author: Option<String>,
    pub jira_url: Option<String>,
    pub jira_email: Option<String>,
    pub jira_token: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RoundingSettings {
    pub enabled: bool,
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
    #[serde(default = "default_threshold_minutes")]
    pub round_up_threshold_minutes: u32,
    #[serde(default = "default_threshold_minutes")]
    pub round_down_threshold_minutes: u32,
    pub strategy: RoundingStrategy,
    pub blacklist: BTreeSet<String>,
    pub whitelist: BTreeSet<String>,
    pub min_entry_minutes: u32,
}

impl Default for RoundingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: default_interval_minutes(),
            round_up_threshold_minutes: default_threshold_minutes(),
            round_down_threshold_minutes: default_threshold_minutes(),
            strategy: RoundingStrategy::default(),
            blacklist: BTreeSet::new(),
            whitelist: BTreeSet::new(),
            min_entry_minutes: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AccountSettings {
    pub use_accounts: bool,
    #[serde(default = "default_account_attribute_key")]
    pub account_attribute_key: String,
    pub project_accounts: BTreeMap<String, String>,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            use_accounts: false,
            account_attribute_key: default_account_attribute_key(),
            project_accounts: BTreeMap::new(),
        }
    }
}

/// Everything persisted in `config.json`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub credentials: CredentialSettings,
    pub rounding: RoundingSettings,
    pub accounts: AccountSettings,
    pub remaining_estimate: EstimateStrategy,
    /// Regex for ticket keys, matched at the start of a description as written. A named group
    /// `project` marks the project prefix; without it the prefix is everything before the first `-`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_pattern: Option<String>,
    #[serde(default = "default_post_concurrency")]
    pub post_concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credentials: CredentialSettings::default(),
            rounding: RoundingSettings::default(),
            accounts: AccountSettings::default(),
            remaining_estimate: EstimateStrategy::default(),
            ticket_pattern: None,
            post_concurrency: default_post_concurrency(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rounding.interval_minutes == 0 {
            return Err(ConfigError::Invalid(
                "rounding interval must be at least 1 minute".into(),
            ));
        }
        if self.post_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "post concurrency must be at least 1".into(),
            ));
        }
        self.ticket_pattern()?;
        Ok(())
    }

    pub fn ticket_pattern(&self) -> Result<TicketPattern, ConfigError> {
        match &self.ticket_pattern {
            Some(pattern) => TicketPattern::new(pattern)
                .map_err(|err| ConfigError::Invalid(format!("ticket pattern: {err}"))),
            None => Ok(TicketPattern::default_pattern().clone()),
        }
    }
}

/// Manages loading and saving of settings as JSON in the platform config directory.
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Binds to `TEMPO_SYNC_CONFIG` when set, otherwise to the platform config path.
    pub fn new() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|value| !value.is_empty()) {
            return Ok(Self::at(PathBuf::from(path)));
        }
        let dirs = directories::ProjectDirs::from("io", "tempo-sync", "tempo-sync")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::at(dirs.config_dir().join("config.json")))
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads settings; a missing file yields defaults, a malformed one is an error.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }
        let settings: Settings =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Persists settings, creating parent directories when needed.
    pub fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        let io_error = |source: std::io::Error| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = serde_json::to_string_pretty(settings).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, content).map_err(io_error)?;
        Ok(())
    }
}

/// A change to one writable setting.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingUpdate {
    TogglToken(String),
    TempoToken(String),
    TempoAuthor(String),
    JiraUrl(String),
    JiraEmail(String),
    JiraToken(String),
    RoundingEnabled(bool),
    RoundingInterval(u32),
    RoundUpThreshold(u32),
    RoundDownThreshold(u32),
    MinEntryTime(u32),
    Strategy(RoundingStrategy),
    ToggleBlacklist(String),
    ToggleWhitelist(String),
    UseAccounts(bool),
    AccountAttributeKey(String),
    ProjectAccount { project: String, account: String },
    RemainingEstimate(EstimateStrategy),
}

impl SettingUpdate {
    fn apply_to(self, settings: &mut Settings) {
        let credentials = &mut settings.credentials;
        let rounding = &mut settings.rounding;
        match self {
            SettingUpdate::TogglToken(value) => credentials.toggl_token = Some(value),
            SettingUpdate::TempoToken(value) => credentials.tempo_token = Some(value),
            SettingUpdate::TempoAuthor(value) => credentials.tempo_author = Some(value),
            SettingUpdate::JiraUrl(value) => credentials.jira_url = Some(value),
            SettingUpdate::JiraEmail(value) => credentials.jira_email = Some(value),
            SettingUpdate::JiraToken(value) => credentials.jira_token = Some(value),
            SettingUpdate::RoundingEnabled(value) => rounding.enabled = value,
            SettingUpdate::RoundingInterval(value) => rounding.interval_minutes = value,
            SettingUpdate::RoundUpThreshold(value) => rounding.round_up_threshold_minutes = value,
            SettingUpdate::RoundDownThreshold(value) => {
                rounding.round_down_threshold_minutes = value
            }
            SettingUpdate::MinEntryTime(value) => rounding.min_entry_minutes = value,
            SettingUpdate::Strategy(value) => rounding.strategy = value,
            SettingUpdate::ToggleBlacklist(project) => toggle(&mut rounding.blacklist, project),
            SettingUpdate::ToggleWhitelist(project) => toggle(&mut rounding.whitelist, project),
            SettingUpdate::UseAccounts(value) => settings.accounts.use_accounts = value,
            SettingUpdate::AccountAttributeKey(value) => {
                settings.accounts.account_attribute_key = value
            }
            SettingUpdate::ProjectAccount { project, account } => {
                settings.accounts.project_accounts.insert(project, account);
            }
            SettingUpdate::RemainingEstimate(value) => settings.remaining_estimate = value,
        }
    }
}

fn toggle(set: &mut BTreeSet<String>, project: String) {
    if !set.remove(&project) {
        set.insert(project);
    }
}

/// Settings snapshot for one run plus the only path through which settings are written.
pub struct ConfigStore {
    manager: Option<ConfigManager>,
    settings: Settings,
}

impl ConfigStore {
    pub fn load(manager: ConfigManager) -> Result<Self, ConfigError> {
        let settings = manager.load()?;
        Ok(Self {
            manager: Some(manager),
            settings,
        })
    }

    /// Store that never touches the filesystem.
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            manager: None,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> Option<&Path> {
        self.manager.as_ref().map(ConfigManager::path)
    }

    /// Applies `update` to the snapshot and writes the whole file back.
    pub fn apply(&mut self, update: SettingUpdate) -> Result<(), ConfigError> {
        let mut next = self.settings.clone();
        update.apply_to(&mut next);
        next.validate()?;
        if let Some(manager) = &self.manager {
            manager.save(&next)?;
        }
        self.settings = next;
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), ConfigError> {
        let defaults = Settings::default();
        if let Some(manager) = &self.manager {
            manager.save(&defaults)?;
        }
        self.settings = defaults;
        Ok(())
    }
}
