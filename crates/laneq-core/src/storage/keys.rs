//! Key naming for the three structures kept per identifier.
//!
//! All keys are `:`-separated strings rooted at the configured identifier:
//! - lane schedule: `{identifier}:queue:{lane}` (sorted set of due timestamps)
//! - timestamp bucket: `{identifier}:timestamp:{lane}:{timestamp}` (list of item ids)
//! - item: `{identifier}:item:{id}` (serialized `QueueItem`)

use std::fmt::Display;

const SEPARATOR: char = ':';

/// Builds store keys under a single identifier prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    identifier: String,
}

impl KeySpace {
    pub const DEFAULT_IDENTIFIER: &'static str = "priority-queue";

    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Sorted set holding every distinct due timestamp of `lane`.
    pub fn schedule_key(&self, lane: &str) -> String {
        format!("{}{SEPARATOR}queue{SEPARATOR}{lane}", self.identifier)
    }

    /// FIFO list of item ids sharing the due timestamp `timestamp` in `lane`.
    ///
    /// `timestamp` is the decimal millisecond string, the same text stored as
    /// the schedule member.
    pub fn bucket_key(&self, lane: &str, timestamp: &str) -> String {
        format!(
            "{}{SEPARATOR}timestamp{SEPARATOR}{lane}{SEPARATOR}{timestamp}",
            self.identifier
        )
    }

    /// Record of a single item.
    pub fn item_key(&self, id: impl Display) -> String {
        format!("{}{SEPARATOR}item{SEPARATOR}{id}", self.identifier)
    }

    /// Glob matching every key under this identifier. Glob metacharacters in
    /// the identifier are backslash-escaped so they match literally.
    pub fn clear_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.identifier.len() + 1);
        for c in self.identifier.chars() {
            if matches!(c, '*' | '?' | '[' | ']' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('*');
        pattern
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new(Self::DEFAULT_IDENTIFIER)
    }
}

/// Render a millisecond timestamp the way it is stored as a schedule member.
pub fn timestamp_member(ts_ms: u64) -> String {
    ts_ms.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn default_identifier_layout() {
        let keys = KeySpace::default();
        let id = Uuid::parse_str("6a1f1c4e-96c3-4d8e-8f4b-0b9a4c1d2e3f").unwrap();

        assert_eq!(keys.schedule_key("emails"), "priority-queue:queue:emails");
        assert_eq!(
            keys.bucket_key("emails", "1700000000000"),
            "priority-queue:timestamp:emails:1700000000000"
        );
        assert_eq!(
            keys.item_key(id),
            "priority-queue:item:6a1f1c4e-96c3-4d8e-8f4b-0b9a4c1d2e3f"
        );
        assert_eq!(keys.clear_pattern(), "priority-queue*");
    }

    #[test]
    fn custom_identifier_prefixes_every_key() {
        let keys = KeySpace::new("testing");
        let id = Uuid::now_v7();

        assert!(keys.schedule_key("high").starts_with("testing:"));
        assert!(keys.bucket_key("high", "5").starts_with("testing:"));
        assert!(keys.item_key(id).starts_with("testing:"));
        assert_eq!(keys.identifier(), "testing");
    }

    #[test]
    fn bucket_keys_differ_per_lane_and_timestamp() {
        let keys = KeySpace::default();
        assert_ne!(keys.bucket_key("a", "100"), keys.bucket_key("b", "100"));
        assert_ne!(keys.bucket_key("a", "100"), keys.bucket_key("a", "101"));
    }

    #[test]
    fn clear_pattern_escapes_glob_metacharacters() {
        assert_eq!(KeySpace::new("q[1]").clear_pattern(), r"q\[1\]*");
        assert_eq!(KeySpace::new("a*b?c").clear_pattern(), r"a\*b\?c*");
        assert_eq!(KeySpace::new(r"x\y").clear_pattern(), r"x\\y*");
    }

    #[test]
    fn timestamp_member_is_plain_decimal() {
        assert_eq!(timestamp_member(0), "0");
        assert_eq!(timestamp_member(1_700_000_000_123), "1700000000123");
    }
}
