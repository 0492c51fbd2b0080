//! The per-second time-of-day key that every parsed series is aligned
//! on. All sources are truncated (or reconstructed) to this
//! resolution before joining.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};

pub const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// A wall-clock time of day with second resolution. The derived `Ord`
/// is chronological within the day (fields are ordered
/// hour/minute/second).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    /// 24-hour based
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeOfDay {
    pub fn from_hms(hour: u8, minute: u8, second: u8) -> Option<Self> {
        if hour <= 23 && minute <= 59 && second <= 59 {
            Some(Self {
                hour,
                minute,
                second,
            })
        } else {
            None
        }
    }

    /// Truncate a `NaiveTime` to the second, dropping the sub-second
    /// fraction.
    pub fn truncated(t: NaiveTime) -> Self {
        Self {
            hour: t.hour().try_into().expect("hour fits u8"),
            minute: t.minute().try_into().expect("minute fits u8"),
            // second() can report 59 during a leap second; min keeps
            // the value inside our range either way
            second: (t.second().min(59)).try_into().expect("second fits u8"),
        }
    }

    pub fn seconds_of_day(self) -> u32 {
        let Self {
            hour,
            minute,
            second,
        } = self;
        u32::from(hour) * 3600 + u32::from(minute) * 60 + u32::from(second)
    }

    pub fn from_seconds_of_day(seconds: u32) -> Self {
        let seconds = seconds % SECONDS_PER_DAY;
        Self {
            hour: (seconds / 3600) as u8,
            minute: (seconds / 60 % 60) as u8,
            second: (seconds % 60) as u8,
        }
    }

    /// Add an elapsed-seconds offset, truncating the offset to whole
    /// seconds and wrapping past midnight with same-day arithmetic
    /// (test runs are short, so a run crossing midnight folds back
    /// onto the same day).
    pub fn add_elapsed(self, secs: f64) -> Self {
        let offset = secs.floor() as i64;
        let total = i64::from(self.seconds_of_day()) + offset;
        Self::from_seconds_of_day(total.rem_euclid(i64::from(SECONDS_PER_DAY)) as u32)
    }

    /// The `"HH-MM-SS"` form used as run token in measurement file
    /// names and as output file stem.
    pub fn file_token(self) -> String {
        let Self {
            hour,
            minute,
            second,
        } = self;
        format!("{hour:02}-{minute:02}-{second:02}")
    }

    /// Parse the `"HH-MM-SS"` run token form.
    pub fn from_file_token(s: &str) -> Result<Self, String> {
        from_parts(s, '-')
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            hour,
            minute,
            second,
        } = self;
        write!(f, "{hour:02}:{minute:02}:{second:02}")
    }
}

fn parse_max(s: &str, max_incl: u8, field_name: &str) -> Result<u8, String> {
    let val = s
        .parse()
        .map_err(|_| format!("{field_name} must be an integer 0..{max_incl}"))?;
    if val <= max_incl {
        Ok(val)
    } else {
        Err(format!("{field_name} must be an integer 0..{max_incl}"))
    }
}

fn from_parts(s: &str, separator: char) -> Result<TimeOfDay, String> {
    let mut parts = s.split(separator);
    let mut next_part = |field_name, max_incl| -> Result<u8, String> {
        let part = parts
            .next()
            .ok_or_else(|| format!("missing {field_name} field in {s:?}"))?;
        parse_max(part, max_incl, field_name)
    };
    let hour = next_part("hour", 23)?;
    let minute = next_part("minute", 59)?;
    let second = next_part("second", 59)?;
    if parts.next().is_some() {
        return Err(format!("trailing fields after the second in {s:?}"));
    }
    Ok(TimeOfDay {
        hour,
        minute,
        second,
    })
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        from_parts(s, ':')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_parse_and_display() {
        let t: TimeOfDay = "12:00:07".parse().unwrap();
        assert_eq!(t, TimeOfDay::from_hms(12, 0, 7).unwrap());
        assert_eq!(t.to_string(), "12:00:07");
        assert_eq!(t.file_token(), "12-00-07");
        assert_eq!(TimeOfDay::from_file_token("12-00-07").unwrap(), t);
        assert!("24:00:00".parse::<TimeOfDay>().is_err());
        assert!("12:00".parse::<TimeOfDay>().is_err());
        assert!("12:00:00:01".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn t_ord_is_chronological() {
        let a: TimeOfDay = "09:59:59".parse().unwrap();
        let b: TimeOfDay = "10:00:00".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn t_add_elapsed() {
        let t: TimeOfDay = "12:00:00".parse().unwrap();
        assert_eq!(t.add_elapsed(0.0).to_string(), "12:00:00");
        assert_eq!(t.add_elapsed(0.9).to_string(), "12:00:00");
        assert_eq!(t.add_elapsed(61.0).to_string(), "12:01:01");
    }

    #[test]
    fn t_add_elapsed_wraps_past_midnight() {
        let t: TimeOfDay = "23:59:58".parse().unwrap();
        assert_eq!(t.add_elapsed(3.0).to_string(), "00:00:01");
    }

    #[test]
    fn t_truncated() {
        let t = NaiveTime::from_hms_milli_opt(12, 0, 0, 900).unwrap();
        assert_eq!(TimeOfDay::truncated(t).to_string(), "12:00:00");
    }
}
