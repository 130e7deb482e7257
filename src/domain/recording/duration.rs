//! Duration value object for recording limits and timing knobs

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use crate::domain::error::DurationParseError;

/// Value object representing a time span with millisecond resolution.
/// Parsed from compact strings such as `30s`, `2m30s`, `750ms` or `1h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Duration {
    milliseconds: u64,
}

impl Duration {
    pub const ZERO: Self = Self::from_millis(0);

    pub const fn from_millis(ms: u64) -> Self {
        Self { milliseconds: ms }
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self {
            milliseconds: secs * 1000,
        }
    }

    pub const fn as_secs(&self) -> u64 {
        self.milliseconds / 1000
    }

    pub const fn as_millis(&self) -> u64 {
        self.milliseconds
    }

    pub const fn is_zero(&self) -> bool {
        self.milliseconds == 0
    }

    /// Convert to std::time::Duration
    pub const fn as_std(&self) -> StdDuration {
        StdDuration::from_millis(self.milliseconds)
    }
}

impl From<StdDuration> for Duration {
    fn from(value: StdDuration) -> Self {
        Self::from_millis(value.as_millis() as u64)
    }
}

/// Milliseconds per unit suffix
fn unit_millis(unit: &str) -> Option<u64> {
    match unit {
        "ms" => Some(1),
        "s" => Some(1_000),
        "m" => Some(60_000),
        "h" => Some(3_600_000),
        _ => None,
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    /// Parse `<number><unit>` groups (units: h, m, s, ms), e.g. "1m30s".
    /// Units must not repeat; a bare number is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || DurationParseError { input: s.to_string() };
        let input = s.trim().to_lowercase();
        if input.is_empty() {
            return Err(error());
        }

        let mut total: u64 = 0;
        let mut seen_units: Vec<String> = Vec::new();
        let mut chars = input.chars().peekable();

        while chars.peek().is_some() {
            let mut digits = String::new();
            while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
                digits.push(c);
                chars.next();
            }
            let mut unit = String::new();
            while let Some(c) = chars.peek().copied().filter(char::is_ascii_alphabetic) {
                unit.push(c);
                chars.next();
            }

            if digits.is_empty() || seen_units.contains(&unit) {
                return Err(error());
            }
            let factor = unit_millis(&unit).ok_or_else(error)?;
            let value: u64 = digits.parse().map_err(|_| error())?;
            total = value
                .checked_mul(factor)
                .and_then(|ms| total.checked_add(ms))
                .ok_or_else(error)?;
            seen_units.push(unit);
        }

        Ok(Self::from_millis(total))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.milliseconds % 1000;
        let total_secs = self.as_secs();
        let minutes = total_secs / 60;
        let seconds = total_secs % 60;

        if total_secs == 0 {
            return write!(f, "{}ms", ms);
        }
        if minutes > 0 {
            write!(f, "{}m", minutes)?;
        }
        if seconds > 0 || (minutes == 0 && ms == 0) {
            write!(f, "{}s", seconds)?;
        }
        if ms > 0 {
            write!(f, "{}ms", ms)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_seconds() {
        let d: Duration = "30s".parse().unwrap();
        assert_eq!(d.as_millis(), 30_000);
    }

    #[test]
    fn parse_compound() {
        let d: Duration = "2m30s".parse().unwrap();
        assert_eq!(d.as_secs(), 150);
        let d: Duration = "1h5m".parse().unwrap();
        assert_eq!(d.as_secs(), 3900);
    }

    #[test]
    fn parse_milliseconds() {
        let d: Duration = "750ms".parse().unwrap();
        assert_eq!(d.as_millis(), 750);
        let d: Duration = "1s250ms".parse().unwrap();
        assert_eq!(d.as_millis(), 1250);
    }

    #[test]
    fn parse_zero_allowed() {
        let d: Duration = "0s".parse().unwrap();
        assert!(d.is_zero());
    }

    #[test]
    fn parse_case_and_whitespace() {
        let d: Duration = "  1M30S ".parse().unwrap();
        assert_eq!(d.as_secs(), 90);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Duration>().is_err());
        assert!("30".parse::<Duration>().is_err());
        assert!("abc".parse::<Duration>().is_err());
        assert!("30x".parse::<Duration>().is_err());
        assert!("5s5s".parse::<Duration>().is_err());
        assert!("1.5s".parse::<Duration>().is_err());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Duration::from_secs(30).to_string(), "30s");
        assert_eq!(Duration::from_secs(120).to_string(), "2m");
        assert_eq!(Duration::from_secs(150).to_string(), "2m30s");
        assert_eq!(Duration::from_millis(250).to_string(), "250ms");
        assert_eq!(Duration::from_millis(1500).to_string(), "1s500ms");
        assert_eq!(Duration::ZERO.to_string(), "0ms");
    }

    #[test]
    fn std_conversions() {
        let d = Duration::from(StdDuration::from_millis(40));
        assert_eq!(d.as_std(), StdDuration::from_millis(40));
    }
}
