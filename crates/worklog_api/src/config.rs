use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

pub const TOGGL_API_BASE: &str = "https://api.track.toggl.com/api/v9";
pub const TEMPO_API_BASE: &str = "https://api.tempo.io/4";
pub const JIRA_API_PATH: &str = "rest/api/3";
pub const DEFAULT_USER_AGENT: &str = "tempo-sync";
pub const DEFAULT_COOLDOWN_MS: u64 = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Toggl expects the API token as the basic-auth user with this literal password.
const TOGGL_TOKEN_PASSWORD: &str = "api_token";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    Basic { username: String, password: String },
    Bearer(String),
}

impl AuthMethod {
    /// Renders the `Authorization` header value for this credential.
    pub fn header_value(&self) -> String {
        match self {
            AuthMethod::Basic { username, password } => {
                let encoded = BASE64_STANDARD.encode(format!("{}:{}", username, password));
                format!("Basic {}", encoded)
            }
            AuthMethod::Bearer(token) => format!("Bearer {}", token),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub auth_method: AuthMethod,
    pub user_agent: String,
    pub cooldown: Duration,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, auth_method: AuthMethod) -> Self {
        Self {
            base_url: base_url.into(),
            auth_method,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cooldown: Duration::from_millis(DEFAULT_COOLDOWN_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    pub fn toggl(token: impl Into<String>) -> Self {
        Self::new(
            TOGGL_API_BASE,
            AuthMethod::Basic {
                username: token.into(),
                password: TOGGL_TOKEN_PASSWORD.to_string(),
            },
        )
    }

    pub fn tempo(token: impl Into<String>) -> Self {
        Self::new(TEMPO_API_BASE, AuthMethod::Bearer(token.into()))
    }

    /// Jira Cloud site, e.g. `https://your-domain.atlassian.net`.
    pub fn jira(site_url: &str, email: impl Into<String>, token: impl Into<String>) -> Self {
        let base = format!("{}/{}", site_url.trim_end_matches('/'), JIRA_API_PATH);
        Self::new(
            base,
            AuthMethod::Basic {
                username: email.into(),
                password: token.into(),
            },
        )
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn with_cooldown(mut self, duration: Duration) -> Self {
        self.cooldown = duration;
        self
    }

    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    pub fn with_connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }

    pub fn api_root(&self) -> String {
        format!("{}/", self.base_url.trim_end_matches('/'))
    }
}
