//! Domain primitives shared by the search and identity layers.
//!
//! Sender ids are foreign keys from message hits into the identity cache, so
//! they get their own newtype instead of travelling around as bare integers.

pub mod events;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric Telegram user id.
///
/// A raw value of `0` is what the search index stores for messages without a
/// sender; [`UserId::is_present`] tells the two apart.
///
/// # Examples
///
/// ```rust
/// use tgsearch::domain::UserId;
///
/// let id = UserId::new(10001);
/// assert_eq!(id.value(), 10001);
/// assert_eq!(id.to_string(), "10001");
/// assert!(!UserId::default().is_present());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UserId(i64);

impl UserId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying i64 value.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// Returns false for the "no sender" placeholder.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self::new(id)
    }
}

impl Serialize for UserId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i64(self.value())
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        i64::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_conversions() {
        let id = UserId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(UserId::from(42), id);
    }

    #[test]
    fn zero_is_not_a_sender() {
        assert!(!UserId::new(0).is_present());
        assert!(UserId::new(-100).is_present());
        assert!(UserId::new(10001).is_present());
    }

    #[test]
    fn user_id_serialization() {
        let id = UserId::new(10002);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "10002");
        let deserialized: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }
}
