use crate::core::{CmsError, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

/// Bot credentials for change alerts
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
}

impl TelegramConfig {
    pub fn new(bot_token: &str, chat_id: &str) -> Self {
        Self {
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
            api_base: DEFAULT_TELEGRAM_API.to_string(),
        }
    }

    /// Point at a different API host (tests, proxies)
    pub fn api_base(mut self, base: &str) -> Self {
        self.api_base = base.to_string();
        self
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"***")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Site configuration
///
/// Built with setters or read from `RUSTFOLIO_*` environment variables.
#[derive(Debug, Clone)]
pub struct CmsConfig {
    /// Where the store snapshot lives (CLI and local deployments)
    pub snapshot_path: Option<PathBuf>,

    /// Minimum gap between two public submissions from one session
    pub submission_cooldown: Duration,

    /// Send alerts at all
    pub notifications_enabled: bool,

    /// Alert channel
    pub telegram: Option<TelegramConfig>,

    /// Administrator account the CLI acts as
    pub admin_identifier: Option<String>,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            submission_cooldown: Duration::from_secs(60),
            notifications_enabled: true,
            telegram: None,
            admin_identifier: None,
        }
    }
}

impl CmsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn submission_cooldown(mut self, cooldown: Duration) -> Self {
        self.submission_cooldown = cooldown;
        self
    }

    pub fn notifications_enabled(mut self, enabled: bool) -> Self {
        self.notifications_enabled = enabled;
        self
    }

    pub fn telegram(mut self, telegram: TelegramConfig) -> Self {
        self.telegram = Some(telegram);
        self
    }

    pub fn admin_identifier(mut self, identifier: &str) -> Self {
        self.admin_identifier = Some(identifier.to_string());
        self
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("RUSTFOLIO_SNAPSHOT") {
            config.snapshot_path = Some(PathBuf::from(path));
        }

        if let Some(secs) = lookup("RUSTFOLIO_COOLDOWN_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                CmsError::Config(format!("RUSTFOLIO_COOLDOWN_SECS must be a number, got '{}'", secs))
            })?;
            config.submission_cooldown = Duration::from_secs(secs);
        }

        if let Some(flag) = lookup("RUSTFOLIO_NOTIFY") {
            config.notifications_enabled = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(CmsError::Config(format!(
                        "RUSTFOLIO_NOTIFY must be a boolean, got '{}'",
                        other
                    )));
                }
            };
        }

        match (
            lookup("RUSTFOLIO_TELEGRAM_TOKEN"),
            lookup("RUSTFOLIO_TELEGRAM_CHAT_ID"),
        ) {
            (Some(token), Some(chat)) => {
                let mut telegram = TelegramConfig::new(&token, &chat);
                if let Some(base) = lookup("RUSTFOLIO_TELEGRAM_API") {
                    telegram = telegram.api_base(&base);
                }
                config.telegram = Some(telegram);
            }
            (None, None) => {}
            _ => {
                return Err(CmsError::Config(
                    "RUSTFOLIO_TELEGRAM_TOKEN and RUSTFOLIO_TELEGRAM_CHAT_ID must be set together".into(),
                ));
            }
        }

        config.admin_identifier = lookup("RUSTFOLIO_ADMIN");
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.submission_cooldown.is_zero() {
            return Err(CmsError::Config("submission_cooldown must be > 0".into()));
        }

        if let Some(telegram) = &self.telegram {
            if telegram.bot_token.trim().is_empty() || telegram.chat_id.trim().is_empty() {
                return Err(CmsError::Config(
                    "telegram bot_token and chat_id cannot be empty".into(),
                ));
            }
        }

        Ok(())
    }
}
