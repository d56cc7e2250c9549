use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub accounts: AccountsConfig,
    pub mail: MailConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
    pub unix_socket: Option<PathBuf>,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
}

/// Activation and session behaviour shared by the account components
#[derive(Debug, Clone, Deserialize)]
pub struct AccountsConfig {
    /// Length of the confirmable window in days
    #[serde(default = "default_activation_days")]
    pub activation_days: u32,
    /// Prefix for links embedded in activation emails
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Session lifetime in seconds
    #[serde(default = "default_session_ttl")]
    pub session_ttl: i64,
    /// How often expired sessions are purged, in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            activation_days: default_activation_days(),
            base_url: default_base_url(),
            session_ttl: default_session_ttl(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailBackendKind {
    Smtp,
    Console,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub from_email: String,
    #[serde(default = "default_mail_backend")]
    pub backend: MailBackendKind,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_smtp_tls")]
    pub tls: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_wal_path")]
    pub wal_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            wal_path: default_wal_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub api_key: String,
}

// Default value functions
fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_activation_days() -> u32 {
    7
}

fn default_base_url() -> String {
    "https://www.dabuch.com".to_string()
}

fn default_session_ttl() -> i64 {
    1_209_600 // 2 weeks
}

fn default_cleanup_interval() -> u64 {
    300 // 5 minutes
}

fn default_mail_backend() -> MailBackendKind {
    MailBackendKind::Smtp
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_tls() -> bool {
    true
}

fn default_wal_path() -> PathBuf {
    PathBuf::from("accounts.wal")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate server config
        if self.server.port.is_none() && self.server.unix_socket.is_none() {
            bail!("Either port or unix_socket must be specified in server config");
        }

        if let Some(port) = self.server.port {
            if port == 0 {
                bail!("Server port must be greater than 0");
            }
        }

        if self.server.num_threads == 0 {
            bail!("num_threads must be greater than 0");
        }

        // Validate accounts config
        if self.accounts.activation_days == 0 {
            bail!("activation_days must be greater than 0");
        }

        if !self.accounts.base_url.starts_with("http://")
            && !self.accounts.base_url.starts_with("https://")
        {
            bail!(
                "base_url '{}' must start with http:// or https://",
                self.accounts.base_url
            );
        }

        if self.accounts.session_ttl <= 0 {
            bail!("session_ttl must be greater than 0");
        }

        if self.accounts.cleanup_interval == 0 {
            bail!("cleanup_interval must be greater than 0");
        }

        // Validate mail config
        if self.mail.from_email.is_empty() {
            bail!("from_email must not be empty");
        }

        if self.mail.backend == MailBackendKind::Smtp {
            match &self.mail.smtp {
                None => bail!("mail.smtp section is required when backend is 'smtp'"),
                Some(smtp) if smtp.host.is_empty() => bail!("smtp host must not be empty"),
                Some(smtp) if smtp.username.is_some() != smtp.password.is_some() => {
                    bail!("smtp username and password must be set together")
                }
                Some(_) => {}
            }
        }

        // Validate admin config
        if self.admin.api_key.is_empty() {
            bail!("api_key must not be empty");
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}
