//! Cache Entry Module
//!
//! Defines the record stored per key, with an optional wall-clock deadline.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A stored key/value record.
///
/// The deadline is a wall-clock timestamp so that it survives persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<V> {
    /// The key this entry is indexed under
    pub key: String,
    /// The stored value, opaque to the cache
    pub value: V,
    /// Expiration deadline, None = never expires
    pub expiration: Option<DateTime<Utc>>,
}

impl<V> Entry<V> {
    // == Constructor ==
    /// Creates a new entry whose deadline is `now + ttl`, if a TTL is given.
    pub fn new(key: impl Into<String>, value: V, ttl: Option<Duration>) -> Self {
        Self {
            key: key.into(),
            value,
            expiration: deadline_after(Utc::now(), ttl),
        }
    }

    // == Is Expired ==
    /// Checks whether the deadline lies strictly before `now`.
    ///
    /// Entries without a deadline never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expiration, Some(deadline) if deadline < now)
    }

    /// Checks expiration against the current wall clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, or None if no expiration is set.
    ///
    /// Returns `Some(Duration::ZERO)` once the deadline has passed.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expiration
            .map(|deadline| (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }
}

// == Utility Functions ==
/// Computes `now + ttl`, saturating at the far future for absurd TTLs.
pub(crate) fn deadline_after(now: DateTime<Utc>, ttl: Option<Duration>) -> Option<DateTime<Utc>> {
    ttl.map(|ttl| {
        chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = Entry::new("k", "test_value", None);

        assert_eq!(entry.key, "k");
        assert_eq!(entry.value, "test_value");
        assert!(entry.expiration.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = Entry::new("k", 7, Some(Duration::from_secs(60)));

        assert!(entry.expiration.is_some());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = Entry::new("k", 7, Some(Duration::from_millis(50)));

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(80));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Utc::now();
        let entry = Entry {
            key: "k".to_string(),
            value: (),
            expiration: Some(now),
        };

        // Expired only once the deadline is strictly in the past
        assert!(!entry.is_expired_at(now));
        assert!(entry.is_expired_at(now + chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = Entry::new("k", 1, Some(Duration::from_secs(10)));

        let remaining = entry.ttl_remaining().unwrap();
        assert!(remaining <= Duration::from_secs(10));
        assert!(remaining >= Duration::from_secs(9));

        let forever = Entry::new("k", 1, None);
        assert!(forever.ttl_remaining().is_none());
    }

    #[test]
    fn test_ttl_remaining_expired() {
        let entry = Entry {
            key: "k".to_string(),
            value: 1,
            expiration: Some(Utc::now() - chrono::Duration::seconds(5)),
        };

        assert_eq!(entry.ttl_remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_deadline_saturates() {
        let deadline = deadline_after(Utc::now(), Some(Duration::MAX)).unwrap();
        assert_eq!(deadline, DateTime::<Utc>::MAX_UTC);
    }
}
