//! Path exclusion matching.
//!
//! Exclusions are root-relative paths compared by exact string equality.
//! An excluded directory prunes its whole subtree during a scan, so
//! `logs` hides `logs/x.log`, but an entry never matches by prefix:
//! `wp-content/cache` does not exclude `wp-content/cache2`, and
//! `wp-content` written as `wp-content/` matches nothing.

use std::collections::BTreeSet;

/// Immutable set of excluded root-relative paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    entries: BTreeSet<String>,
}

impl ExclusionSet {
    /// Create an empty set (nothing excluded).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated exclusion list.
    ///
    /// Entries are trimmed; entries that are empty after trimming are
    /// dropped rather than treated as "exclude everything".
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self::from_entries(raw.split(','))
    }

    /// Build a set from individual entries, trimming each one.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .filter_map(|entry| {
                let trimmed = entry.as_ref().trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect();

        Self { entries }
    }

    /// Whether `relative_path` is excluded.
    #[must_use]
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        self.entries.contains(relative_path)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set excludes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

/// Whether `relative_path` exactly matches one of `exclusions`.
#[must_use]
pub fn is_excluded(relative_path: &str, exclusions: &ExclusionSet) -> bool {
    exclusions.is_excluded(relative_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_excludes_nothing() {
        let set = ExclusionSet::new();
        assert!(set.is_empty());
        assert!(!is_excluded("", &set));
        assert!(!is_excluded("a.txt", &set));
    }

    #[test]
    fn test_parse_trims_entries() {
        let set = ExclusionSet::parse(" wp-content/uploads/cache , another/folder");
        assert_eq!(set.len(), 2);
        assert!(set.is_excluded("wp-content/uploads/cache"));
        assert!(set.is_excluded("another/folder"));
    }

    #[test]
    fn test_parse_drops_empty_entries() {
        let set = ExclusionSet::parse(",  , logs,,");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["logs"]);
        assert!(!set.is_excluded(""));
        assert!(!set.is_excluded(" "));
    }

    #[test]
    fn test_parse_empty_string() {
        assert!(ExclusionSet::parse("").is_empty());
    }

    #[test]
    fn test_exact_match_only() {
        let set = ExclusionSet::parse("wp-content/cache");

        assert!(is_excluded("wp-content/cache", &set));
        assert!(!is_excluded("wp-content/cache2", &set));
        assert!(!is_excluded("wp-content", &set));
        assert!(!is_excluded("wp-content/cache/page.html", &set));
        assert!(!is_excluded("WP-CONTENT/cache", &set));
    }

    #[test]
    fn test_trailing_slash_is_not_normalized() {
        let set = ExclusionSet::parse("logs/");
        assert!(!set.is_excluded("logs"));
        assert!(set.is_excluded("logs/"));
    }

    #[test]
    fn test_from_entries_dedups() {
        let set = ExclusionSet::from_entries(vec!["logs", " logs ", "tmp"]);
        assert_eq!(set.len(), 2);
    }
}
