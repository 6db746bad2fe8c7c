use crate::error::{Result, SourceError};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// IMF-fixdate, the preferred HTTP date format (RFC 9110 section 5.6.7).
const IMF_FIXDATE: &str = "%a, %d %b %Y %H:%M:%S GMT";
/// Obsolete RFC 850 format still accepted by HTTP parsers.
const RFC850_DATE: &str = "%A, %d-%b-%y %H:%M:%S GMT";
/// Obsolete ANSI C `asctime()` format.
const ASCTIME_DATE: &str = "%a %b %e %H:%M:%S %Y";

/// Last-modified instant of a remote artifact.
///
/// Versions are compared by timestamp only: an artifact re-uploaded with the
/// same timestamp is not considered newer. The default value is the Unix
/// epoch and counts as "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    date: DateTime<Utc>,
}

impl Version {
    /// Wrap a timestamp.
    pub fn new(date: DateTime<Utc>) -> Self {
        Self { date }
    }

    /// Build a version from seconds and nanoseconds since the Unix epoch.
    pub fn from_unix(secs: i64, nanos: u32) -> Result<Self> {
        DateTime::from_timestamp(secs, nanos)
            .map(Self::new)
            .ok_or_else(|| SourceError::InvalidTimestamp(format!("{secs}.{nanos:09}")))
    }

    /// Parse an HTTP date (`Last-Modified` style) in any of the three
    /// formats HTTP recipients must accept.
    pub fn parse_http_date(value: &str) -> Result<Self> {
        let value = value.trim();
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, IMF_FIXDATE) {
            return Ok(Self::new(Utc.from_utc_datetime(&naive)));
        }
        if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
            return Ok(Self::new(parsed.with_timezone(&Utc)));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, RFC850_DATE) {
            return Ok(Self::new(Utc.from_utc_datetime(&naive)));
        }
        // asctime pads single-digit days with a space
        let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
        if let Ok(naive) = NaiveDateTime::parse_from_str(&collapsed, ASCTIME_DATE) {
            return Ok(Self::new(Utc.from_utc_datetime(&naive)));
        }
        Err(SourceError::InvalidTimestamp(value.to_string()))
    }

    /// Render the timestamp as an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
    pub fn to_http_date(&self) -> String {
        self.date.format(IMF_FIXDATE).to_string()
    }

    /// The wrapped timestamp.
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Whether this is the zero value, i.e. no known timestamp.
    pub fn is_zero(&self) -> bool {
        self.date == DateTime::<Utc>::UNIX_EPOCH
    }

    /// Whether `self` is strictly newer than `other`.
    pub fn is_newer_than(&self, other: &Version) -> bool {
        self.date > other.date
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl From<DateTime<Utc>> for Version {
    fn from(date: DateTime<Utc>) -> Self {
        Self::new(date)
    }
}

impl From<SystemTime> for Version {
    fn from(time: SystemTime) -> Self {
        Self::new(DateTime::<Utc>::from(time))
    }
}
