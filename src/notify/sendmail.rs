//! Notifier that pipes messages into a sendmail-compatible program.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use chrono::Utc;

use super::message::Message;
use super::Notifier;
use crate::error::NotifyError;
use crate::scanner::ChangeRecord;

const TRANSPORT: &str = "sendmail";

/// Default sendmail location.
pub const DEFAULT_SENDMAIL: &str = "/usr/sbin/sendmail";

/// Delivers through `sendmail -t -i` (recipients read from the headers).
#[derive(Debug, Clone)]
pub struct SendmailNotifier {
    program: PathBuf,
    args: Vec<String>,
    from: String,
    to: String,
}

impl SendmailNotifier {
    /// Create a notifier invoking `program -t -i`.
    pub fn new(program: impl Into<PathBuf>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["-t".to_string(), "-i".to_string()],
            from: from.into(),
            to: to.into(),
        }
    }

    /// Replace the program arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn deliver(&self, raw: &str) -> Result<(), String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to start {}: {e}", self.program.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(raw.as_bytes()) {
                drop(stdin);
                // Reap the child; it may already have exited.
                let _ = child.kill();
                let _ = child.wait();
                return Err(format!("failed to write message: {e}"));
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| format!("failed to wait for {}: {e}", self.program.display()))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(format!("{}: {}", output.status, stderr.trim()))
        }
    }
}

impl Notifier for SendmailNotifier {
    fn name(&self) -> &'static str {
        TRANSPORT
    }

    fn notify(&self, changes: &[ChangeRecord]) -> Result<(), NotifyError> {
        let raw = Message::for_changes(changes).to_rfc5322(&self.from, &self.to, Utc::now());

        self.deliver(&raw)
            .map_err(|reason| NotifyError::delivery(TRANSPORT, reason))?;

        tracing::info!(to = %self.to, changes = changes.len(), "Sent notification via sendmail");
        Ok(())
    }
}
