//! Configuration for a Slack app.
//!
//! [`AppConfig`] carries the bot token and Web API endpoint every outbound call
//! uses. [`AppArgs`] is the command-line surface binaries parse via `arrrg`.

use std::env;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::error::{Error, Result};

/// Default Web API base URL.
pub const DEFAULT_API_URL: &str = "https://slack.com/api/";

/// Default timeout for Web API and response-URL requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the bot token.
pub const TOKEN_ENV: &str = "SLACK_BOT_TOKEN";

/// Environment variable overriding the Web API base URL.
pub const API_URL_ENV: &str = "SLACK_API_URL";

/// Command-line arguments for slashkit binaries.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct AppArgs {
    /// Bot token; falls back to SLACK_BOT_TOKEN.
    #[arrrg(optional, "Bot token (default: $SLACK_BOT_TOKEN)", "TOKEN")]
    pub token: Option<String>,

    /// Web API base URL.
    #[arrrg(optional, "Web API base URL (default: https://slack.com/api/)", "URL")]
    pub api_url: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 30)", "SECS")]
    pub timeout_secs: Option<u64>,

    /// Channel the synthetic request originates from.
    #[arrrg(optional, "Channel ID the command is issued in", "CHANNEL")]
    pub channel: Option<String>,

    /// User issuing the synthetic request.
    #[arrrg(optional, "User ID issuing the command", "USER")]
    pub user: Option<String>,

    /// Slash command name, including the leading slash.
    #[arrrg(optional, "Slash command (default: /ops)", "COMMAND")]
    pub command: Option<String>,

    /// Raw command text.
    #[arrrg(optional, "Command text, e.g. \"vlan show --id 7\"", "TEXT")]
    pub text: Option<String>,
}

/// Configuration shared by every component of a Slack app.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    /// The bot token sent as a bearer credential.
    pub token: String,

    /// Base URL of the Web API, ending in a slash.
    pub api_url: String,

    /// Timeout applied to every outbound request.
    pub timeout: Duration,
}

impl AppConfig {
    /// Creates a configuration for the given token with default endpoint and timeout.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reads the configuration from `SLACK_BOT_TOKEN` and `SLACK_API_URL`.
    pub fn from_env() -> Result<Self> {
        let token = env::var(TOKEN_ENV).map_err(|_| {
            Error::authentication(format!(
                "token not provided and {TOKEN_ENV} environment variable not set"
            ))
        })?;
        let mut config = Self::new(token);
        if let Ok(api_url) = env::var(API_URL_ENV) {
            config = config.with_api_url(api_url);
        }
        Ok(config)
    }

    /// Resolves binary arguments, consulting the environment for anything unset.
    pub fn from_args(args: &AppArgs) -> Result<Self> {
        let mut config = match &args.token {
            Some(token) => Self::new(token.clone()),
            None => Self::from_env()?,
        };
        if let Some(api_url) = &args.api_url {
            config = config.with_api_url(api_url.clone());
        }
        if let Some(secs) = args.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// Sets the Web API base URL; a trailing slash is added when missing.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        let mut api_url = api_url.into();
        if !api_url.ends_with('/') {
            api_url.push('/');
        }
        self.api_url = api_url;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
