//! Environment-driven configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing_subscriber::filter::LevelFilter;

use crate::alert::render::DEFAULT_SIGNATURE;
use crate::error::AppError;

/// Where outgoing mail goes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MailBackend {
    Smtp,
    /// Writes messages to the log instead of sending them.
    #[default]
    Log,
}

impl FromStr for MailBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "smtp" => Ok(MailBackend::Smtp),
            "log" | "console" => Ok(MailBackend::Log),
            other => Err(format!("unknown mail backend `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SmtpSecurity {
    #[default]
    StartTls,
    Tls,
    None,
}

impl FromStr for SmtpSecurity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "starttls" => Ok(SmtpSecurity::StartTls),
            "tls" => Ok(SmtpSecurity::Tls),
            "none" => Ok(SmtpSecurity::None),
            other => Err(format!("unknown SMTP security mode `{other}`")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub backend: MailBackend,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_security: SmtpSecurity,
    pub from_email: String,
    /// Outgoing messages per minute; `None` means unlimited.
    pub rate_per_minute: Option<u32>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            backend: MailBackend::Log,
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_security: SmtpSecurity::StartTls,
            from_email: "Opportunities Alert System <alerts@localhost>".to_string(),
            rate_per_minute: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AlertConfig {
    /// Upper bound for one mail send.
    pub send_timeout: Duration,
    /// Subscribers processed concurrently within one run.
    pub max_concurrency: usize,
    /// Fixed offset used to derive the local hour and date from UTC.
    pub utc_offset_hours: i32,
    pub signature: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(30),
            max_concurrency: 4,
            utc_offset_hours: 0,
            signature: DEFAULT_SIGNATURE.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    /// Directory for the daily log files.
    pub path: PathBuf,
    /// Level for this crate's own targets. `RUST_LOG` takes precedence when set.
    pub level: LevelFilter,
    /// Daily files kept before the oldest is removed.
    pub retention_days: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("logs"),
            level: LevelFilter::INFO,
            retention_days: 7,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Features {
    pub scheduler: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self { scheduler: true }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub db_url: String,
    pub db_path: String,
    pub log: LogConfig,
    pub mail: MailConfig,
    pub alerts: AlertConfig,
    pub features: Features,
}

impl Config {
    pub fn new() -> Self {
        Self {
            db_url: "sqlite://data/alerts.db".to_string(),
            db_path: "data/alerts.db".to_string(),
            log: LogConfig::default(),
            mail: MailConfig::default(),
            alerts: AlertConfig::default(),
            features: Features::default(),
        }
    }

    /// Overrides defaults with values from the environment.
    pub fn load(&mut self) -> Result<(), AppError> {
        if let Some(v) = env_var("DB_URL") {
            self.db_url = v;
        }
        if let Some(v) = env_var("DB_PATH") {
            self.db_path = v;
        }
        if let Some(v) = env_var("LOGS_PATH") {
            self.log.path = PathBuf::from(v);
        }
        if let Some(level) = parse_var::<LevelFilter>("LOG_LEVEL")? {
            self.log.level = level;
        }
        if let Some(days) = parse_var::<usize>("LOG_RETENTION_DAYS")? {
            self.log.retention_days = days.max(1);
        }

        if let Some(backend) = parse_var::<MailBackend>("MAIL_BACKEND")? {
            self.mail.backend = backend;
        }
        if let Some(v) = env_var("SMTP_HOST") {
            self.mail.smtp_host = v;
        }
        if let Some(port) = parse_var("SMTP_PORT")? {
            self.mail.smtp_port = port;
        }
        self.mail.smtp_username = env_var("SMTP_USERNAME").or(self.mail.smtp_username.take());
        self.mail.smtp_password = env_var("SMTP_PASSWORD").or(self.mail.smtp_password.take());
        if let Some(security) = parse_var("SMTP_SECURITY")? {
            self.mail.smtp_security = security;
        }
        if let Some(v) = env_var("DEFAULT_FROM_EMAIL") {
            self.mail.from_email = v;
        }
        if let Some(rate) = parse_var::<u32>("MAIL_RATE_PER_MINUTE")? {
            self.mail.rate_per_minute = (rate > 0).then_some(rate);
        }

        if let Some(secs) = parse_var::<u64>("SEND_TIMEOUT_SECS")? {
            self.alerts.send_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(n) = parse_var::<usize>("ALERT_CONCURRENCY")? {
            self.alerts.max_concurrency = n.max(1);
        }
        if let Some(offset) = parse_var::<i32>("ALERT_UTC_OFFSET_HOURS")? {
            if !(-23..=23).contains(&offset) {
                return Err(AppError::ConfigurationError {
                    msg: format!("ALERT_UTC_OFFSET_HOURS must be within -23..=23, got {offset}"),
                });
            }
            self.alerts.utc_offset_hours = offset;
        }
        if let Some(v) = env_var("ALERT_SIGNATURE") {
            self.alerts.signature = v;
        }
        if let Some(enabled) = parse_var::<bool>("FEATURE_SCHEDULER")? {
            self.features.scheduler = enabled;
        }

        if self.mail.backend == MailBackend::Smtp && env_var("SMTP_HOST").is_none() {
            return Err(AppError::MissingConfig {
                key: "SMTP_HOST".to_string(),
            });
        }

        Ok(())
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| AppError::ConfigurationError {
                    msg: format!("Invalid value `{raw}` for {key}: {e}"),
                })
        })
        .transpose()
}
