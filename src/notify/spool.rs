//! Notifier that drops messages into a spool directory.
//!
//! Each notification becomes one `.eml` file. The file is written under a
//! temporary name and renamed into place, so a mail pickup process never
//! sees a partial message.

use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use super::message::Message;
use super::Notifier;
use crate::error::NotifyError;
use crate::scanner::ChangeRecord;

const TRANSPORT: &str = "spool";

/// Writes RFC 5322 messages into a directory.
#[derive(Debug, Clone)]
pub struct SpoolNotifier {
    dir: PathBuf,
    from: String,
    to: String,
}

impl SpoolNotifier {
    /// Create a spool notifier. The directory is created on first use.
    pub fn new(dir: impl Into<PathBuf>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// The spool directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write(&self, raw: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let now = Utc::now();
        let name = format!("{}-{}", now.format("%Y%m%dT%H%M%S"), Uuid::new_v4());
        let tmp = self.dir.join(format!(".{name}.tmp"));
        let target = self.dir.join(format!("{name}.eml"));

        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &target)?;
        Ok(target)
    }
}

impl Notifier for SpoolNotifier {
    fn name(&self) -> &'static str {
        TRANSPORT
    }

    fn notify(&self, changes: &[ChangeRecord]) -> Result<(), NotifyError> {
        let raw = Message::for_changes(changes).to_rfc5322(&self.from, &self.to, Utc::now());

        let path = self
            .write(&raw)
            .map_err(|e| NotifyError::delivery(TRANSPORT, format!("{}: {e}", self.dir.display())))?;

        tracing::info!(path = %path.display(), changes = changes.len(), "Spooled notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn spooled(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_spool_writes_one_message() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("outbox");
        let notifier = SpoolNotifier::new(&dir, "sizewatch@localhost", "admin@example.com");

        notifier
            .notify(&[ChangeRecord::new("a.txt", Some(10), 20)])
            .unwrap();

        let files = spooled(&dir);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].extension().unwrap(), "eml");

        let raw = fs::read_to_string(&files[0]).unwrap();
        assert!(raw.contains("To: admin@example.com\r\n"));
        assert!(raw.contains("a.txt: Old Size: 10 bytes, New Size: 20 bytes"));
    }

    #[test]
    fn test_spool_messages_do_not_collide() {
        let tmp = TempDir::new().unwrap();
        let notifier = SpoolNotifier::new(tmp.path(), "a@b.c", "d@e.f");
        let changes = [ChangeRecord::new("x", None, 1)];

        notifier.notify(&changes).unwrap();
        notifier.notify(&changes).unwrap();

        assert_eq!(spooled(tmp.path()).len(), 2);
    }

    #[test]
    fn test_unwritable_spool_is_delivery_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        let notifier = SpoolNotifier::new(blocker.join("outbox"), "a@b.c", "d@e.f");
        let err = notifier
            .notify(&[ChangeRecord::new("x", None, 1)])
            .unwrap_err();

        assert!(matches!(err, NotifyError::Delivery { transport: "spool", .. }));
    }
}
