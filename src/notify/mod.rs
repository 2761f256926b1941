//! Change notification delivery.
//!
//! A [`Notifier`] receives the non-empty change set of one scan cycle.
//! Delivery failures are reported back to the caller, which logs them and
//! carries on; they never abort a cycle.

mod log;
mod message;
mod sendmail;
mod spool;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use self::log::LogNotifier;
pub use message::{Message, SUBJECT};
pub use sendmail::{SendmailNotifier, DEFAULT_SENDMAIL};
pub use spool::SpoolNotifier;

use crate::config::Config;
use crate::error::NotifyError;
use crate::scanner::ChangeRecord;
use crate::{Error, Result};

/// Delivers a change report to an administrator.
pub trait Notifier: Send + Sync {
    /// Short transport name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Deliver one report. Called only with a non-empty change set.
    ///
    /// # Errors
    ///
    /// Returns an error if the report could not be delivered.
    fn notify(&self, changes: &[ChangeRecord]) -> std::result::Result<(), NotifyError>;
}

/// Available notification transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyTransport {
    /// Write the report to the log only.
    #[default]
    Log,
    /// Write `.eml` files into a spool directory.
    Spool,
    /// Pipe the message to a sendmail binary.
    Sendmail,
}

impl NotifyTransport {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Spool => "spool",
            Self::Sendmail => "sendmail",
        }
    }
}

impl fmt::Display for NotifyTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotifyTransport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "spool" => Ok(Self::Spool),
            "sendmail" => Ok(Self::Sendmail),
            other => Err(Error::config(format!(
                "unknown notify transport '{other}', must be one of: log, spool, sendmail"
            ))),
        }
    }
}

/// Build the notifier selected by the configuration.
///
/// # Errors
///
/// Returns an error if the selected transport lacks a recipient.
pub fn from_config(config: &Config) -> Result<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = match config.notify {
        NotifyTransport::Log => Arc::new(LogNotifier),
        NotifyTransport::Spool => Arc::new(SpoolNotifier::new(
            config.spool_dir(),
            &config.mail_from,
            recipient(config, "spool")?,
        )),
        NotifyTransport::Sendmail => Arc::new(SendmailNotifier::new(
            &config.sendmail_path,
            &config.mail_from,
            recipient(config, "sendmail")?,
        )),
    };

    tracing::debug!(transport = notifier.name(), "Notifier configured");
    Ok(notifier)
}

fn recipient<'a>(config: &'a Config, transport: &'static str) -> Result<&'a str> {
    config.email.as_deref().ok_or_else(|| {
        NotifyError::NotConfigured {
            transport,
            reason: "no notification email address set".to_string(),
        }
        .into()
    })
}
