//! Configuration settings and validation.

use crate::monitor::{FirstRunPolicy, ScanInterval, ScanSettings};
use crate::notify::{NotifyTransport, DEFAULT_SENDMAIL};
use crate::scanner::ExclusionSet;
use crate::{Error, Result};
use std::path::PathBuf;

/// Main configuration for sizewatch.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory tree to monitor.
    pub root: PathBuf,

    /// Directory for the `SQLite` database and the default spool.
    pub data_dir: PathBuf,

    /// Root-relative paths to skip, matched exactly.
    pub exclusions: Vec<String>,

    /// Notification recipient.
    pub email: Option<String>,

    /// Notification transport.
    pub notify: NotifyTransport,

    /// Spool directory for the spool transport (defaults under `data_dir`).
    pub spool_dir: Option<PathBuf>,

    /// Sendmail-compatible program for the sendmail transport.
    pub sendmail_path: PathBuf,

    /// Sender address used in notification headers.
    pub mail_from: String,

    /// Scheduler period.
    pub interval: ScanInterval,

    /// First-run detection.
    pub first_run: FirstRunPolicy,

    /// Host address to bind to.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON logs.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            data_dir: PathBuf::from("./data"),
            exclusions: Vec::new(),
            email: None,
            notify: NotifyTransport::Log,
            spool_dir: None,
            sendmail_path: PathBuf::from(DEFAULT_SENDMAIL),
            mail_from: "sizewatch@localhost".to_string(),
            interval: ScanInterval::Daily,
            first_run: FirstRunPolicy::EmptySnapshot,
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(Error::config("root cannot be empty"));
        }

        if self.port == 0 {
            return Err(Error::config("port cannot be 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.host.is_empty() {
            return Err(Error::config("host cannot be empty"));
        }

        if let Some(email) = &self.email {
            if !is_valid_email(email) {
                return Err(Error::config(format!("invalid email address '{email}'")));
            }
        }

        if !is_valid_email(&self.mail_from) {
            return Err(Error::config(format!(
                "invalid sender address '{}'",
                self.mail_from
            )));
        }

        if self.notify != NotifyTransport::Log && self.email.is_none() {
            return Err(Error::config(format!(
                "notify transport '{}' requires an email address",
                self.notify
            )));
        }

        Ok(())
    }

    /// Get the path to the `SQLite` database file.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("sizewatch.db")
    }

    /// Get the server address as a string.
    #[must_use]
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Spool directory, defaulting to `<data_dir>/outbox`.
    #[must_use]
    pub fn spool_dir(&self) -> PathBuf {
        self.spool_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("outbox"))
    }

    /// Normalized exclusion set.
    #[must_use]
    pub fn exclusion_set(&self) -> ExclusionSet {
        ExclusionSet::from_entries(&self.exclusions)
    }

    /// Settings handed to each scan cycle.
    #[must_use]
    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings::new(&self.root)
            .with_exclusions(self.exclusion_set())
            .with_first_run(self.first_run)
    }
}

/// Loose address shape check: one `@`, non-empty local part, dotted domain.
fn is_valid_email(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    let dotted = domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.');

    !local.is_empty()
        && !domain.contains('@')
        && !address.chars().any(char::is_whitespace)
        && (dotted || domain == "localhost")
}
