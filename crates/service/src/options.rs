use std::{borrow::Borrow, fmt, time::Duration};

use uuid::Uuid;

/// The interval used when a client does not ask for one, in milliseconds.
pub const DEFAULT_UPDATE_INTERVAL: i64 = 5000;

/// The identifier of a connected client.
///
/// It is only ever used as the registry key, the server does not attach any
/// meaning to its content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Use the requested id verbatim, or generate a fresh one when the client
    /// did not send one or sent an empty one.
    ///
    /// # Test
    ///
    /// ```
    /// use sse_push_service::options::ClientId;
    ///
    /// assert_eq!(ClientId::resolve(Some("abc")).as_str(), "abc");
    /// assert_eq!(ClientId::resolve(Some(" abc ")).as_str(), " abc ");
    ///
    /// assert!(!ClientId::resolve(Some("")).as_str().is_empty());
    /// assert!(!ClientId::resolve(None).as_str().is_empty());
    /// ```
    pub fn resolve(requested: Option<&str>) -> Self {
        match requested {
            Some(id) if !id.is_empty() => Self(id.to_string()),
            _ => Self::generate(),
        }
    }

    /// Generate a random unique id (a hyphenated v4 uuid).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ClientId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Parse the integer prefix of a string the way browsers parse numbers out
/// of query strings.
///
/// Leading whitespace is skipped, an optional sign is accepted, a `0x`
/// prefix switches to hexadecimal, and parsing stops at the first character
/// that is not a digit. Values that do not fit are saturated.
fn parse_integer_prefix(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let (negative, value) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };

    let (radix, digits) = match value.get(..2) {
        Some("0x" | "0X") => (16, &value[2..]),
        _ => (10, value),
    };

    let mut result: Option<i64> = None;
    for digit in digits.chars().map_while(|c| c.to_digit(radix)) {
        let digit = i64::from(digit);
        let current = result.unwrap_or(0);
        result = Some(if negative {
            current.saturating_mul(radix as i64).saturating_sub(digit)
        } else {
            current.saturating_mul(radix as i64).saturating_add(digit)
        });
    }

    result
}

/// Resolve the update interval requested by a client.
///
/// A value that does not start with an integer, or no value at all, falls
/// back to the default. Zero and negative values are passed through as is.
///
/// # Test
///
/// ```
/// use sse_push_service::options::parse_interval;
///
/// assert_eq!(parse_interval(Some("1000"), 5000), 1000);
/// assert_eq!(parse_interval(Some("250ms"), 5000), 250);
/// assert_eq!(parse_interval(Some("0"), 5000), 0);
/// assert_eq!(parse_interval(Some("-20"), 5000), -20);
/// assert_eq!(parse_interval(Some("fast"), 5000), 5000);
/// assert_eq!(parse_interval(Some(""), 5000), 5000);
/// assert_eq!(parse_interval(None, 5000), 5000);
/// ```
pub fn parse_interval(value: Option<&str>, default: i64) -> i64 {
    value.and_then(parse_integer_prefix).unwrap_or(default)
}

/// The largest timer period in milliseconds, the range of a signed 32 bit
/// integer.
pub const MAX_PERIOD: i64 = i32::MAX as i64;

/// The timer period used for an interval.
///
/// Intervals outside `1..=MAX_PERIOD` run with a one millisecond period:
/// a repeating timer cannot have a zero or negative period, and an
/// interval too large for a 32 bit timer runs at the shortest period
/// instead of never firing.
///
/// ```
/// use std::time::Duration;
/// use sse_push_service::options::{MAX_PERIOD, period};
///
/// assert_eq!(period(1000), Duration::from_millis(1000));
/// assert_eq!(period(MAX_PERIOD), Duration::from_millis(MAX_PERIOD as u64));
/// assert_eq!(period(0), Duration::from_millis(1));
/// assert_eq!(period(-5), Duration::from_millis(1));
/// assert_eq!(period(MAX_PERIOD + 1), Duration::from_millis(1));
/// assert_eq!(period(i64::MAX), Duration::from_millis(1));
/// ```
pub fn period(interval: i64) -> Duration {
    if (1..=MAX_PERIOD).contains(&interval) {
        Duration::from_millis(interval as u64)
    } else {
        Duration::from_millis(1)
    }
}

/// The raw options a client sent when opening a stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConnectOptions<'a> {
    pub client_id: Option<&'a str>,
    pub update_interval: Option<&'a str>,
}
