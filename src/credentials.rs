//! API credentials: environment overrides, stored values and interactive first-run prompts.

use crate::config::{CredentialSettings, ConfigStore, SettingUpdate};
use crate::error::{Result, SyncError};
use crate::prompt::{LinePrompt, Terminal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub toggl_token: String,
    pub tempo_token: String,
    pub tempo_author: String,
    pub jira_url: String,
    pub jira_email: String,
    pub jira_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    TogglToken,
    TempoToken,
    TempoAuthor,
    JiraUrl,
    JiraEmail,
    JiraToken,
}

impl CredentialField {
    pub const ALL: [CredentialField; 6] = [
        CredentialField::TogglToken,
        CredentialField::TempoToken,
        CredentialField::TempoAuthor,
        CredentialField::JiraUrl,
        CredentialField::JiraEmail,
        CredentialField::JiraToken,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CredentialField::TogglToken => "Toggl API token",
            CredentialField::TempoToken => "Tempo API token",
            CredentialField::TempoAuthor => "Tempo author account id",
            CredentialField::JiraUrl => "Jira URL",
            CredentialField::JiraEmail => "Jira email",
            CredentialField::JiraToken => "Jira API token",
        }
    }

    /// Environment variable that overrides the stored value for one run.
    pub fn env_var(self) -> Option<&'static str> {
        match self {
            CredentialField::TogglToken => Some("TEMPO_SYNC_TOGGL_TOKEN"),
            CredentialField::TempoToken => Some("TEMPO_SYNC_TEMPO_TOKEN"),
            CredentialField::JiraToken => Some("TEMPO_SYNC_JIRA_TOKEN"),
            _ => None,
        }
    }

    pub fn is_secret(self) -> bool {
        matches!(
            self,
            CredentialField::TogglToken | CredentialField::TempoToken | CredentialField::JiraToken
        )
    }

    fn prompt(self) -> &'static str {
        match self {
            CredentialField::TogglToken => "Enter your Toggl API token: ",
            CredentialField::TempoToken => "Enter your Tempo API token: ",
            CredentialField::TempoAuthor => "Enter your Tempo author account id: ",
            CredentialField::JiraUrl => "Enter your Jira URL (https://your-domain.atlassian.net): ",
            CredentialField::JiraEmail => "Enter your Jira email: ",
            CredentialField::JiraToken => "Enter your Jira API token: ",
        }
    }

    fn retry_prompt(self) -> &'static str {
        match self {
            CredentialField::JiraUrl => "Jira URL must start with http: ",
            CredentialField::JiraEmail => "Please enter a valid email address: ",
            _ => "Value must not be empty: ",
        }
    }

    pub fn is_valid(self, value: &str) -> bool {
        match self {
            CredentialField::JiraUrl => value.starts_with("http"),
            CredentialField::JiraEmail => value.contains('@'),
            _ => !value.is_empty(),
        }
    }

    pub fn stored(self, settings: &CredentialSettings) -> Option<&str> {
        let value = match self {
            CredentialField::TogglToken => &settings.toggl_token,
            CredentialField::TempoToken => &settings.tempo_token,
            CredentialField::TempoAuthor => &settings.tempo_author,
            CredentialField::JiraUrl => &settings.jira_url,
            CredentialField::JiraEmail => &settings.jira_email,
            CredentialField::JiraToken => &settings.jira_token,
        };
        value.as_deref().map(str::trim).filter(|value| !value.is_empty())
    }

    pub fn update(self, value: String) -> SettingUpdate {
        match self {
            CredentialField::TogglToken => SettingUpdate::TogglToken(value),
            CredentialField::TempoToken => SettingUpdate::TempoToken(value),
            CredentialField::TempoAuthor => SettingUpdate::TempoAuthor(value),
            CredentialField::JiraUrl => SettingUpdate::JiraUrl(value),
            CredentialField::JiraEmail => SettingUpdate::JiraEmail(value),
            CredentialField::JiraToken => SettingUpdate::JiraToken(value),
        }
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn lookup<F>(field: CredentialField, settings: &CredentialSettings, env: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    field
        .env_var()
        .and_then(env)
        .or_else(|| field.stored(settings).map(str::to_string))
}

impl Credentials {
    /// Builds credentials without prompting; the first missing field is an error.
    pub fn from_settings_with<F>(settings: &CredentialSettings, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |field: CredentialField| {
            lookup(field, settings, &env).ok_or(SyncError::MissingCredential(field.label()))
        };
        Ok(Self {
            toggl_token: get(CredentialField::TogglToken)?,
            tempo_token: get(CredentialField::TempoToken)?,
            tempo_author: get(CredentialField::TempoAuthor)?,
            jira_url: get(CredentialField::JiraUrl)?,
            jira_email: get(CredentialField::JiraEmail)?,
            jira_token: get(CredentialField::JiraToken)?,
        })
    }
}

/// Prompts for and persists every credential that is neither stored nor overridden by the environment.
pub async fn ensure_credentials<T>(store: &mut ConfigStore, terminal: &T) -> Result<Credentials>
where
    T: Terminal + ?Sized,
{
    ensure_credentials_with(store, terminal, env_lookup).await
}

async fn ensure_credentials_with<T, F>(store: &mut ConfigStore, terminal: &T, env: F) -> Result<Credentials>
where
    T: Terminal + ?Sized,
    F: Fn(&str) -> Option<String>,
{
    for field in CredentialField::ALL {
        if lookup(field, &store.settings().credentials, &env).is_some() {
            continue;
        }
        log::warn!("{} is not configured", field.label());
        let value = LinePrompt::new(field.prompt())
            .retry_message(field.retry_prompt())
            .ask(terminal, |input| field.is_valid(input))
            .await?;
        store.apply(field.update(value))?;
        log::info!("✓ Saved {}", field.label());
    }
    Credentials::from_settings_with(&store.settings().credentials, env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::testing::ScriptedTerminal;

    fn complete() -> CredentialSettings {
        CredentialSettings {
            toggl_token: Some("toggl".into()),
            tempo_token: Some("tempo".into()),
            tempo_author: Some("author".into()),
            jira_url: Some("https://acme.atlassian.net".into()),
            jira_email: Some("me@acme.io".into()),
            jira_token: Some("jira".into()),
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn environment_overrides_stored_tokens() {
        let credentials = Credentials::from_settings_with(&complete(), |name| {
            (name == "TEMPO_SYNC_TEMPO_TOKEN").then(|| "from-env".to_string())
        })
        .unwrap();
        assert_eq!(credentials.tempo_token, "from-env");
        assert_eq!(credentials.toggl_token, "toggl");
    }

    #[test]
    fn blank_stored_value_counts_as_missing() {
        let mut settings = complete();
        settings.jira_email = Some("  ".into());
        let err = Credentials::from_settings_with(&settings, no_env).unwrap_err();
        assert!(matches!(err, SyncError::MissingCredential("Jira email")));
    }

    #[test]
    fn field_validation_rules() {
        assert!(CredentialField::JiraUrl.is_valid("https://x.atlassian.net"));
        assert!(!CredentialField::JiraUrl.is_valid("x.atlassian.net"));
        assert!(CredentialField::JiraEmail.is_valid("a@b"));
        assert!(!CredentialField::JiraEmail.is_valid("ab"));
        assert!(!CredentialField::TogglToken.is_valid(""));
    }

    #[tokio::test]
    async fn missing_values_are_prompted_and_persisted() {
        let mut settings = Settings::default();
        settings.credentials = complete();
        settings.credentials.jira_url = None;
        settings.credentials.tempo_author = None;
        let mut store = ConfigStore::in_memory(settings);
        let terminal = ScriptedTerminal::new(["acc-1", "acme.atlassian.net", "https://acme.atlassian.net"]);

        let credentials = ensure_credentials_with(&mut store, &terminal, no_env).await.unwrap();

        assert_eq!(credentials.tempo_author, "acc-1");
        assert_eq!(credentials.jira_url, "https://acme.atlassian.net");
        assert_eq!(
            store.settings().credentials.jira_url.as_deref(),
            Some("https://acme.atlassian.net")
        );
    }

    #[tokio::test]
    async fn exhausted_input_aborts() {
        let mut store = ConfigStore::in_memory(Settings::default());
        let terminal = ScriptedTerminal::new(Vec::<&str>::new());

        let err = ensure_credentials_with(&mut store, &terminal, no_env).await.unwrap_err();
        assert!(matches!(err, SyncError::Prompt(_)));
    }
}
