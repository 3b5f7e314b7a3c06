//! Lenient duration parsing for token and cookie lifetimes.
//!
//! Accepts `<integer><unit>` with unit one of `d`, `h`, `m`, `s`, or a bare
//! integer number of milliseconds. Anything else falls back to
//! [`DEFAULT_DURATION_MS`], so a typo in the environment never blocks login.

/// Default lifetime: 7 days in milliseconds.
pub const DEFAULT_DURATION_MS: u64 = 7 * 24 * 60 * 60 * 1000;

const MS_PER_SECOND: u64 = 1000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// A configured duration, either already numeric or still textual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DurationSetting {
    Millis(u64),
    Text(String),
}

impl DurationSetting {
    /// Resolve to milliseconds. Never fails.
    pub fn as_millis(&self) -> u64 {
        match self {
            DurationSetting::Millis(ms) => *ms,
            DurationSetting::Text(text) => parse_duration_ms(text),
        }
    }
}

impl Default for DurationSetting {
    fn default() -> Self {
        DurationSetting::Millis(DEFAULT_DURATION_MS)
    }
}

impl From<u64> for DurationSetting {
    fn from(ms: u64) -> Self {
        DurationSetting::Millis(ms)
    }
}

impl From<&str> for DurationSetting {
    fn from(text: &str) -> Self {
        DurationSetting::Text(text.to_string())
    }
}

impl From<String> for DurationSetting {
    fn from(text: String) -> Self {
        DurationSetting::Text(text)
    }
}

/// Parse a duration string into milliseconds.
pub fn parse_duration_ms(input: &str) -> u64 {
    let input = input.trim();

    if let Some(ms) = parse_with_unit(input) {
        return ms;
    }

    input.parse::<u64>().unwrap_or(DEFAULT_DURATION_MS)
}

fn parse_with_unit(input: &str) -> Option<u64> {
    let unit = input.chars().last()?;
    let factor = match unit {
        'd' => MS_PER_DAY,
        'h' => MS_PER_HOUR,
        'm' => MS_PER_MINUTE,
        's' => MS_PER_SECOND,
        _ => return None,
    };

    let digits = &input[..input.len() - 1];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        // "d", "-1d", "1.5h"
        return Some(DEFAULT_DURATION_MS);
    }

    let value = digits.parse::<u64>().ok()?;
    Some(value.checked_mul(factor).unwrap_or(DEFAULT_DURATION_MS))
}
