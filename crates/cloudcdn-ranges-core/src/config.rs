//! Configuration types for the range refresher
//!
//! The refresher takes a single tunable, the refresh interval. The hostname
//! is configurable for testing against other TXT records but defaults to the
//! published Cloud CDN record.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

use crate::fetch::DEFAULT_HOSTNAME;

/// Interval used when none (or zero) is configured
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest accepted interval, `i64::MAX` nanoseconds (about 292 years)
pub const MAX_INTERVAL: Duration = Duration::from_nanos(i64::MAX as u64);

/// Refresher configuration
///
/// JSON form:
///
/// ```json
/// { "interval": "12h" }
/// ```
///
/// `interval` also accepts an integer number of nanoseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefresherConfig {
    /// Time between refreshes. Zero means [`DEFAULT_INTERVAL`].
    #[serde(
        default,
        serialize_with = "serialize_interval",
        deserialize_with = "deserialize_interval"
    )]
    pub interval: Duration,

    /// TXT record to query
    #[serde(default = "default_hostname")]
    pub hostname: String,
}

impl RefresherConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            interval: Duration::ZERO,
            hostname: default_hostname(),
        }
    }

    /// Set the refresh interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the TXT hostname
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, crate::Error> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.hostname.trim().is_empty() {
            return Err(crate::Error::config("TXT hostname cannot be empty"));
        }
        if self.interval > MAX_INTERVAL {
            return Err(crate::Error::config(format!(
                "interval {:?} exceeds the maximum of {:?}",
                self.interval, MAX_INTERVAL
            )));
        }
        Ok(())
    }

    /// Interval the scheduler actually uses
    pub fn effective_interval(&self) -> Duration {
        if self.interval.is_zero() {
            DEFAULT_INTERVAL
        } else {
            self.interval
        }
    }
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_hostname() -> String {
    DEFAULT_HOSTNAME.to_string()
}

fn serialize_interval<S: Serializer>(interval: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_duration(*interval))
}

fn deserialize_interval<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Nanos(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Nanos(nanos) if nanos > MAX_INTERVAL.as_nanos() as u64 => Err(
            serde::de::Error::custom(format!("interval of {} ns is out of range", nanos)),
        ),
        Raw::Nanos(nanos) => Ok(Duration::from_nanos(nanos)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

/// Parse a duration string such as `"12h"`, `"0.8h"`, `"1h30m"` or `"1d"`
///
/// Units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`, `d`. Components may carry a
/// decimal fraction and are summed. A lone `"0"` is accepted. Negative
/// durations and totals above [`MAX_INTERVAL`] are rejected.
pub fn parse_duration(input: &str) -> Result<Duration, crate::Error> {
    let s = input.trim();
    let invalid = |why: &str| crate::Error::config(format!("invalid duration {:?}: {}", input, why));

    if s.is_empty() {
        return Err(invalid("empty"));
    }
    if s.starts_with('-') {
        return Err(invalid("must not be negative"));
    }
    let s = s.strip_prefix('+').unwrap_or(s);
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos: u128 = 0;
    let mut rest = s;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| invalid("missing unit"))?;
        if number_len == 0 {
            return Err(invalid("expected a number"));
        }
        let (number, after) = rest.split_at(number_len);

        let unit_len = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        let (unit, after) = after.split_at(unit_len);

        let unit_nanos: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 60 * 60 * 1_000_000_000,
            "d" => 24 * 60 * 60 * 1_000_000_000,
            _ => return Err(invalid("unknown unit")),
        };

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return Err(invalid("malformed number"));
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("number out of range"))?
        };
        let mut component = whole
            .checked_mul(unit_nanos)
            .ok_or_else(|| invalid("overflow"))?;

        let mut scale = unit_nanos;
        for digit in fraction.bytes() {
            scale /= 10;
            if scale == 0 {
                break;
            }
            component += u128::from(digit - b'0') * scale;
        }

        total_nanos = total_nanos
            .checked_add(component)
            .ok_or_else(|| invalid("overflow"))?;
        rest = after;
    }

    if total_nanos > MAX_INTERVAL.as_nanos() {
        return Err(invalid("out of range"));
    }

    let secs = u64::try_from(total_nanos / 1_000_000_000).map_err(|_| invalid("overflow"))?;
    // Remainder is below 1e9 and always fits
    let nanos = (total_nanos % 1_000_000_000) as u32;
    Ok(Duration::new(secs, nanos))
}

/// Render a duration in the largest unit that represents it exactly
pub fn format_duration(duration: Duration) -> String {
    const UNITS: [(&str, u128); 7] = [
        ("d", 24 * 60 * 60 * 1_000_000_000),
        ("h", 60 * 60 * 1_000_000_000),
        ("m", 60 * 1_000_000_000),
        ("s", 1_000_000_000),
        ("ms", 1_000_000),
        ("us", 1_000),
        ("ns", 1),
    ];

    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0".to_string();
    }

    UNITS
        .iter()
        .find(|(_, size)| nanos % size == 0)
        .map(|(unit, size)| format!("{}{}", nanos / size, unit))
        .unwrap_or_else(|| format!("{}ns", nanos))
}
