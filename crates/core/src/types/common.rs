//! Common types and utilities shared across domain models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp in milliseconds since Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp for the current moment
    ///
    /// If system time is somehow before UNIX_EPOCH (should never happen),
    /// gracefully falls back to timestamp 0 instead of panicking.
    pub fn now() -> Self {
        Self(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_else(|_| std::time::Duration::from_secs(0))
                .as_millis() as i64,
        )
    }

    /// Creates a timestamp from milliseconds since Unix epoch
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Creates a timestamp from seconds since Unix epoch
    pub fn from_seconds(seconds: i64) -> Self {
        Self(seconds * 1000)
    }

    /// Returns the timestamp as milliseconds since Unix epoch
    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns the timestamp as seconds since Unix epoch (floor)
    pub fn as_seconds(&self) -> i64 {
        self.0 / 1000
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Duration in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Duration(u64);

impl Duration {
    /// Zero duration constant
    pub const ZERO: Self = Self(0);

    /// Creates a duration from milliseconds
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Creates a duration from seconds
    pub fn from_seconds(seconds: u64) -> Self {
        Self(seconds * 1000)
    }

    /// Returns the duration in milliseconds
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Returns the duration in seconds
    pub fn as_seconds(&self) -> u64 {
        self.0 / 1000
    }

    /// Returns true if the duration is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Formats as H:MM:SS
    pub fn as_hms(&self) -> String {
        let total_seconds = self.as_seconds();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hms())
    }
}

impl From<std::time::Duration> for Duration {
    fn from(d: std::time::Duration) -> Self {
        Self(d.as_millis() as u64)
    }
}

/// Trait for types that can validate themselves
pub trait Validator {
    /// Validates the instance and returns errors if invalid
    fn validate(&self) -> Result<(), Vec<String>>;

    /// Returns true if the instance is valid
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_now() {
        let t1 = Timestamp::now();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let t2 = Timestamp::now();
        assert!(t2 > t1);
    }

    #[test]
    fn test_timestamp_from_millis() {
        let t = Timestamp::from_millis(1234567890123);
        assert_eq!(t.as_millis(), 1234567890123);
        assert_eq!(t.as_seconds(), 1234567890);
    }

    #[test]
    fn test_timestamp_seconds_roundtrip() {
        let t = Timestamp::from_seconds(1234567890);
        assert_eq!(t.as_millis(), 1234567890000);
    }

    #[test]
    fn test_timestamp_ordering() {
        let t1 = Timestamp::from_millis(1000);
        let t2 = Timestamp::from_millis(2000);
        assert!(t1 < t2);
    }

    #[test]
    fn test_duration_from_seconds() {
        let d = Duration::from_seconds(3665);
        assert_eq!(d.as_seconds(), 3665);
        assert_eq!(d.as_millis(), 3665000);
    }

    #[test]
    fn test_duration_is_zero() {
        assert!(Duration::ZERO.is_zero());
        assert!(!Duration::from_millis(100).is_zero());
    }

    #[test]
    fn test_duration_as_hms() {
        assert_eq!(Duration::from_seconds(3665).as_hms(), "1:01:05");
        assert_eq!(Duration::from_seconds(125).as_hms(), "0:02:05");
        assert_eq!(Duration::ZERO.as_hms(), "0:00:00");
    }

    #[test]
    fn test_duration_from_std_duration() {
        let d: Duration = std::time::Duration::from_secs(42).into();
        assert_eq!(d.as_seconds(), 42);
    }
}
