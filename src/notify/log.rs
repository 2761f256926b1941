//! Notifier that only writes to the log.

use super::message::Message;
use super::Notifier;
use crate::error::NotifyError;
use crate::scanner::ChangeRecord;

/// Reports changes through `tracing` at WARN level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    fn notify(&self, changes: &[ChangeRecord]) -> Result<(), NotifyError> {
        let message = Message::for_changes(changes);
        tracing::warn!(
            subject = %message.subject,
            changes = changes.len(),
            "{}",
            message.body.trim_end()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_notifier_never_fails() {
        let notifier = LogNotifier;
        assert_eq!(notifier.name(), "log");
        tokio_test::assert_ok!(notifier.notify(&[ChangeRecord::new("a.txt", Some(1), 2)]));
    }
}
