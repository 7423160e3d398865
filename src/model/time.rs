//! Catalog timestamps.
//!
//! Both binary dialects store times as 32-bit second counts since the
//! Macintosh epoch (1904-01-01 UTC). A zero count means "never" and maps
//! to an absent value rather than a magic date.

use chrono::{DateTime, TimeZone, Utc};

/// Seconds between the Macintosh epoch and the Unix epoch.
pub const MAC_EPOCH_OFFSET: i64 = -2_082_844_800;

/// A raw 32-bit Mac-epoch timestamp as read from a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MacTime(pub u32);

impl MacTime {
    /// Convert to UTC; the zero sentinel becomes `None`.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if self.0 == 0 {
            return None;
        }
        Utc.timestamp_opt(self.0 as i64 + MAC_EPOCH_OFFSET, 0).single()
    }

    /// Unix seconds for this value, sentinel included.
    pub fn unix(self) -> i64 {
        self.0 as i64 + MAC_EPOCH_OFFSET
    }
}

/// Parse an XML plist date of the form `YYYY-MM-DDTHH:MM:SSZ`.
pub fn parse_plist_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}
