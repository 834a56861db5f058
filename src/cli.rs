//! Command-line surface and command dispatch.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use once_cell::sync::Lazy;
use regex::Regex;
use worklog_api::{ApiConfig, JiraClient, TempoClient, TogglClient};

use crate::config::{ConfigManager, ConfigStore, SettingUpdate, Settings};
use crate::credentials::{ensure_credentials, CredentialField, Credentials};
use crate::error::{Result, SyncError};
use crate::estimate::EstimateStrategy;
use crate::format::parse_sync_date;
use crate::listing::{self, DeleteOutcome};
use crate::prompt::ConsoleTerminal;
use crate::rounding::RoundingStrategy;
use crate::sync::{run_sync, SyncOutcome, SyncServices};

static PROJECT_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]+$").expect("project key regex is valid"));

#[derive(Parser, Debug)]
#[command(name = "tempo-sync", version)]
#[command(about = "Sync Toggl Track time entries into Tempo worklogs")]
pub struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Post the day's time entries as worklogs
    Sync(DateArgs),
    /// List the worklogs logged on a day
    Show(DateArgs),
    /// Delete all worklogs logged on a day
    Delete(DateArgs),
    /// Show or change settings
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct DateArgs {
    /// `today`, `yesterday` or `YYYY-MM-DD`
    #[arg(short, long, default_value = "today")]
    pub date: String,
}

#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Print the current settings with tokens masked
    #[arg(long)]
    pub list: bool,
    /// Restore default settings
    #[arg(long)]
    pub reset: bool,
    #[arg(long, value_name = "TOKEN")]
    pub toggl: Option<String>,
    #[arg(long, value_name = "TOKEN")]
    pub tempo: Option<String>,
    #[arg(long, value_name = "ACCOUNT_ID")]
    pub tempo_author: Option<String>,
    #[arg(long, value_name = "URL")]
    pub jira_url: Option<String>,
    #[arg(long, value_name = "EMAIL")]
    pub jira_email: Option<String>,
    #[arg(long, value_name = "TOKEN")]
    pub jira_token: Option<String>,
    #[arg(long, value_name = "BOOL")]
    pub rounding: Option<bool>,
    /// Rounding interval in minutes
    #[arg(long, value_name = "MINUTES")]
    pub round_to: Option<u32>,
    #[arg(long, value_name = "MINUTES")]
    pub round_up_at: Option<u32>,
    #[arg(long, value_name = "MINUTES")]
    pub round_down_at: Option<u32>,
    #[arg(long, value_name = "MINUTES")]
    pub min_entry_time: Option<u32>,
    #[arg(long, value_enum)]
    pub strategy: Option<RoundingStrategy>,
    /// Project keys to toggle on the blacklist
    #[arg(long, value_delimiter = ',', value_name = "KEYS")]
    pub blacklist: Option<Vec<String>>,
    /// Project keys to toggle on the whitelist
    #[arg(long, value_delimiter = ',', value_name = "KEYS")]
    pub whitelist: Option<Vec<String>>,
    #[arg(long, value_name = "BOOL")]
    pub use_accounts: Option<bool>,
    /// Work attribute key accounts are stored under
    #[arg(long, value_name = "KEY")]
    pub account_key: Option<String>,
    #[arg(long, value_enum)]
    pub remaining_estimate: Option<EstimateStrategy>,
}

/// How a successful command ended; errors map to exit code 1 separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    NothingToDo,
    PartialFailure,
}

impl RunStatus {
    pub fn exit_code(self) -> ExitCode {
        match self {
            RunStatus::Success | RunStatus::NothingToDo => ExitCode::SUCCESS,
            RunStatus::PartialFailure => ExitCode::from(2),
        }
    }
}

pub async fn dispatch(cli: Cli) -> Result<RunStatus> {
    let manager = match cli.config {
        Some(path) => ConfigManager::at(path),
        None => ConfigManager::new()?,
    };
    let mut store = ConfigStore::load(manager)?;
    log::debug!("Using config {:?}", store.path());

    match cli.command {
        Command::Sync(args) => sync_command(&mut store, &args).await,
        Command::Show(args) => show_command(&mut store, &args).await,
        Command::Delete(args) => delete_command(&mut store, &args).await,
        Command::Config(args) => config_command(&mut store, &args),
    }
}

fn parse_date(args: &DateArgs) -> Result<NaiveDate> {
    let today = Local::now().date_naive();
    parse_sync_date(&args.date, today).ok_or_else(|| SyncError::InvalidDate(args.date.clone()))
}

struct Clients {
    toggl: TogglClient,
    tempo: TempoClient,
    jira: JiraClient,
}

fn build_clients(credentials: &Credentials) -> Result<Clients> {
    let toggl = TogglClient::new(ApiConfig::toggl(credentials.toggl_token.as_str()))
        .map_err(|err| SyncError::api("Failed to create Toggl client", err))?;
    let tempo = TempoClient::new(ApiConfig::tempo(credentials.tempo_token.as_str()))
        .map_err(|err| SyncError::api("Failed to create Tempo client", err))?;
    let jira = JiraClient::new(ApiConfig::jira(
        &credentials.jira_url,
        credentials.jira_email.as_str(),
        credentials.jira_token.as_str(),
    ))
    .map_err(|err| SyncError::api("Failed to create Jira client", err))?;
    Ok(Clients { toggl, tempo, jira })
}

async fn sync_command(store: &mut ConfigStore, args: &DateArgs) -> Result<RunStatus> {
    let date = parse_date(args)?;
    let terminal = ConsoleTerminal;
    let credentials = ensure_credentials(store, &terminal).await?;
    let clients = build_clients(&credentials)?;
    let services = SyncServices {
        time_tracker: &clients.toggl,
        issues: &clients.jira,
        worklogs: &clients.tempo,
        terminal: &terminal,
    };

    log::info!("Syncing time entries for {}", date);
    match run_sync(&services, store, &credentials.tempo_author, date, Local::now()).await? {
        SyncOutcome::Completed(summary) => {
            summary.log();
            if summary.has_failures() {
                Ok(RunStatus::PartialFailure)
            } else {
                Ok(RunStatus::Success)
            }
        }
        SyncOutcome::NothingToDo(reason) => {
            log::info!("{}", reason);
            Ok(RunStatus::NothingToDo)
        }
    }
}

async fn show_command(store: &mut ConfigStore, args: &DateArgs) -> Result<RunStatus> {
    let date = parse_date(args)?;
    let credentials = ensure_credentials(store, &ConsoleTerminal).await?;
    let clients = build_clients(&credentials)?;
    listing::show(&clients.tempo, &clients.jira, &credentials.tempo_author, date).await?;
    Ok(RunStatus::Success)
}

async fn delete_command(store: &mut ConfigStore, args: &DateArgs) -> Result<RunStatus> {
    let date = parse_date(args)?;
    let terminal = ConsoleTerminal;
    let credentials = ensure_credentials(store, &terminal).await?;
    let clients = build_clients(&credentials)?;
    let outcome = listing::delete(
        &clients.tempo,
        &clients.jira,
        &terminal,
        &credentials.tempo_author,
        date,
        store.settings().post_concurrency,
    )
    .await?;
    Ok(match outcome {
        DeleteOutcome::Done(report) if !report.failed.is_empty() => RunStatus::PartialFailure,
        DeleteOutcome::Done(_) => RunStatus::Success,
        DeleteOutcome::NothingToDo | DeleteOutcome::Cancelled => RunStatus::NothingToDo,
    })
}

fn config_command(store: &mut ConfigStore, args: &ConfigArgs) -> Result<RunStatus> {
    if args.reset {
        store.reset()?;
        log::info!("✓ Settings reset to defaults");
    }

    let updates = updates_from_args(args);
    let changed = !updates.is_empty();
    for update in updates {
        let description = describe_update(&update);
        store.apply(update)?;
        log::info!("✓ {}", description);
    }

    if args.list {
        for line in describe_settings(store.settings()) {
            println!("{}", line);
        }
    } else if !changed && !args.reset {
        log::info!("Nothing to change, use --list to print the current settings");
    }
    Ok(RunStatus::Success)
}

/// Letters-only project keys, upper-cased; anything else is reported and dropped.
fn project_keys(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .filter_map(|value| {
            if PROJECT_KEY.is_match(value) {
                Some(value.to_uppercase())
            } else {
                log::warn!("Invalid project key {}, expected letters only", value);
                None
            }
        })
        .collect()
}

pub fn updates_from_args(args: &ConfigArgs) -> Vec<SettingUpdate> {
    let mut updates = Vec::new();
    let text = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let credential_args = [
        (CredentialField::TogglToken, &args.toggl),
        (CredentialField::TempoToken, &args.tempo),
        (CredentialField::TempoAuthor, &args.tempo_author),
        (CredentialField::JiraUrl, &args.jira_url),
        (CredentialField::JiraEmail, &args.jira_email),
        (CredentialField::JiraToken, &args.jira_token),
    ];
    for (field, value) in credential_args {
        match text(value) {
            Some(value) if field.is_valid(&value) => updates.push(field.update(value)),
            Some(_) => log::warn!("Ignoring invalid {}", field.label()),
            None => {}
        }
    }

    if let Some(enabled) = args.rounding {
        updates.push(SettingUpdate::RoundingEnabled(enabled));
    }
    if let Some(minutes) = args.round_to {
        updates.push(SettingUpdate::RoundingInterval(minutes));
    }
    if let Some(minutes) = args.round_up_at {
        updates.push(SettingUpdate::RoundUpThreshold(minutes));
    }
    if let Some(minutes) = args.round_down_at {
        updates.push(SettingUpdate::RoundDownThreshold(minutes));
    }
    if let Some(minutes) = args.min_entry_time {
        updates.push(SettingUpdate::MinEntryTime(minutes));
    }
    if let Some(strategy) = args.strategy {
        updates.push(SettingUpdate::Strategy(strategy));
    }
    if let Some(keys) = &args.blacklist {
        updates.extend(project_keys(keys).into_iter().map(SettingUpdate::ToggleBlacklist));
    }
    if let Some(keys) = &args.whitelist {
        updates.extend(project_keys(keys).into_iter().map(SettingUpdate::ToggleWhitelist));
    }
    if let Some(enabled) = args.use_accounts {
        updates.push(SettingUpdate::UseAccounts(enabled));
    }
    if let Some(key) = text(&args.account_key) {
        updates.push(SettingUpdate::AccountAttributeKey(key));
    }
    if let Some(strategy) = args.remaining_estimate {
        updates.push(SettingUpdate::RemainingEstimate(strategy));
    }
    updates
}

fn describe_update(update: &SettingUpdate) -> String {
    match update {
        SettingUpdate::TogglToken(_) => "Toggl API token updated".to_string(),
        SettingUpdate::TempoToken(_) => "Tempo API token updated".to_string(),
        SettingUpdate::JiraToken(_) => "Jira API token updated".to_string(),
        SettingUpdate::TempoAuthor(value) => format!("Tempo author set to {}", value),
        SettingUpdate::JiraUrl(value) => format!("Jira URL set to {}", value),
        SettingUpdate::JiraEmail(value) => format!("Jira email set to {}", value),
        SettingUpdate::RoundingEnabled(value) => format!("Rounding enabled: {}", value),
        SettingUpdate::RoundingInterval(value) => format!("Rounding to {} minutes", value),
        SettingUpdate::RoundUpThreshold(value) => format!("Rounding up at {} minutes", value),
        SettingUpdate::RoundDownThreshold(value) => format!("Rounding down at {} minutes", value),
        SettingUpdate::MinEntryTime(value) => format!("Minimum entry time set to {} minutes", value),
        SettingUpdate::Strategy(value) => format!("Rounding strategy set to {:?}", value),
        SettingUpdate::ToggleBlacklist(value) => format!("Toggled {} on the blacklist", value),
        SettingUpdate::ToggleWhitelist(value) => format!("Toggled {} on the whitelist", value),
        SettingUpdate::UseAccounts(value) => format!("Use accounts: {}", value),
        SettingUpdate::AccountAttributeKey(value) => format!("Account attribute key set to {}", value),
        SettingUpdate::ProjectAccount { project, account } => {
            format!("Account {} saved for project {}", account, project)
        }
        SettingUpdate::RemainingEstimate(value) => {
            format!("Remaining estimate strategy set to {:?}", value)
        }
    }
}

fn mask(value: &str) -> String {
    let count = value.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = value.chars().skip(count - 4).collect();
    format!("****{}", tail)
}

/// Human-readable settings; tokens are masked.
pub fn describe_settings(settings: &Settings) -> Vec<String> {
    let mut lines = Vec::new();
    for field in CredentialField::ALL {
        let value = match field.stored(&settings.credentials) {
            Some(value) if field.is_secret() => mask(value),
            Some(value) => value.to_string(),
            None => "<not set>".to_string(),
        };
        lines.push(format!("{}: {}", field.label(), value));
    }

    let rounding = &settings.rounding;
    let join = |set: &std::collections::BTreeSet<String>| {
        set.iter().cloned().collect::<Vec<_>>().join(", ")
    };
    lines.push(format!("Rounding enabled: {}", rounding.enabled));
    lines.push(format!("Round to: {} minutes", rounding.interval_minutes));
    lines.push(format!("Round up at: {} minutes", rounding.round_up_threshold_minutes));
    lines.push(format!("Round down at: {} minutes", rounding.round_down_threshold_minutes));
    lines.push(format!("Minimum entry time: {} minutes", rounding.min_entry_minutes));
    lines.push(format!("Rounding strategy: {:?}", rounding.strategy));
    lines.push(format!("Blacklist: {}", join(&rounding.blacklist)));
    lines.push(format!("Whitelist: {}", join(&rounding.whitelist)));

    let accounts = &settings.accounts;
    lines.push(format!("Use accounts: {}", accounts.use_accounts));
    lines.push(format!("Account attribute key: {}", accounts.account_attribute_key));
    for (project, account) in &accounts.project_accounts {
        lines.push(format!("Account for {}: {}", project, account));
    }
    lines.push(format!("Remaining estimate: {:?}", settings.remaining_estimate));
    if let Some(pattern) = &settings.ticket_pattern {
        lines.push(format!("Ticket pattern: {}", pattern));
    }
    lines.push(format!("Post concurrency: {}", settings.post_concurrency));
    lines
}
