//! Notification message rendering.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::scanner::ChangeRecord;

/// Fixed subject line for change notifications.
pub const SUBJECT: &str = "File Size Changes Detected";

const INTRO: &str = "The following file sizes have changed:";

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Subject line.
    pub subject: String,
    /// Plain-text body, one line per change.
    pub body: String,
}

impl Message {
    /// Render the notification for a change set.
    #[must_use]
    pub fn for_changes(changes: &[ChangeRecord]) -> Self {
        let mut body = String::with_capacity(INTRO.len() + 2 + changes.len() * 64);
        body.push_str(INTRO);
        body.push_str("\n\n");
        for change in changes {
            // Writing into a String cannot fail.
            let _ = writeln!(body, "{change}");
        }

        Self {
            subject: SUBJECT.to_string(),
            body,
        }
    }

    /// Render as an RFC 5322 message suitable for `sendmail -t` or a spool file.
    #[must_use]
    pub fn to_rfc5322(&self, from: &str, to: &str, date: DateTime<Utc>) -> String {
        format!(
            "From: {from}\r\nTo: {to}\r\nSubject: {}\r\nDate: {}\r\n\
             MIME-Version: 1.0\r\nContent-Type: text/plain; charset=utf-8\r\n\
             Content-Transfer-Encoding: 8bit\r\n\r\n{}",
            self.subject,
            date.to_rfc2822(),
            self.body.replace('\n', "\r\n"),
        )
    }
}
