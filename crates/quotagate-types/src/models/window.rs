//! Wall-clock time windows.
//!
//! Windows are aligned to wall-clock boundaries in UTC: a minute window
//! starts at second zero, an hour window at minute zero and a day window
//! at midnight UTC.

use chrono::{DateTime, Duration as TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Counting window used by provider and per-user limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Minute,
    Hour,
    Day,
}

impl TimeWindow {
    /// All windows, most restrictive first.
    pub const ALL: [TimeWindow; 3] = [TimeWindow::Minute, TimeWindow::Hour, TimeWindow::Day];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }

    pub fn seconds(&self) -> i64 {
        match self {
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
        }
    }

    pub fn duration(&self) -> TimeDelta {
        TimeDelta::seconds(self.seconds())
    }

    /// Start of the window instance containing `instant`.
    pub fn window_start(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let ts = instant.timestamp();
        let start = ts - ts.rem_euclid(self.seconds());
        DateTime::from_timestamp(start, 0).unwrap_or(instant)
    }

    /// First instant after the window instance containing `instant`.
    pub fn window_end(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        self.window_start(instant) + self.duration()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            other => Err(format!("unknown time window '{}'", other)),
        }
    }
}

/// Next midnight UTC strictly after `now`.
pub fn next_midnight_utc(now: DateTime<Utc>) -> DateTime<Utc> {
    TimeWindow::Day.window_end(now)
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

/// Human readable wait time, rounded up to the displayed unit.
///
/// Under a minute is shown in seconds, under an hour in minutes,
/// anything longer as hours plus remaining minutes.
pub fn format_wait_time(wait: Duration) -> String {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    let secs = secs.max(1);

    if secs < 60 {
        return plural(secs, "second");
    }
    if secs < 3_600 {
        return plural(secs.div_ceil(60), "minute");
    }

    let total_minutes = secs.div_ceil(60);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if minutes == 0 {
        plural(hours, "hour")
    } else {
        format!("{} and {}", plural(hours, "hour"), plural(minutes, "minute"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, h, m, s).unwrap()
    }

    #[test]
    fn test_window_start_truncates() {
        let t = at(13, 47, 29);
        assert_eq!(TimeWindow::Minute.window_start(t), at(13, 47, 0));
        assert_eq!(TimeWindow::Hour.window_start(t), at(13, 0, 0));
        assert_eq!(TimeWindow::Day.window_start(t), at(0, 0, 0));
    }

    #[test]
    fn test_next_midnight() {
        let t = at(23, 59, 59);
        assert_eq!(next_midnight_utc(t), Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap());
        // Exactly at midnight the next one is a full day away
        assert_eq!(next_midnight_utc(at(0, 0, 0)), Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_window() {
        assert_eq!("Minute".parse::<TimeWindow>().unwrap(), TimeWindow::Minute);
        assert_eq!(" day ".parse::<TimeWindow>().unwrap(), TimeWindow::Day);
        assert!("week".parse::<TimeWindow>().is_err());
    }

    #[test]
    fn test_format_wait_time() {
        assert_eq!(format_wait_time(Duration::from_millis(200)), "1 second");
        assert_eq!(format_wait_time(Duration::from_secs(42)), "42 seconds");
        assert_eq!(format_wait_time(Duration::from_secs(61)), "2 minutes");
        assert_eq!(format_wait_time(Duration::from_secs(60)), "1 minute");
        assert_eq!(format_wait_time(Duration::from_secs(3_600)), "1 hour");
        assert_eq!(format_wait_time(Duration::from_secs(5_400)), "1 hour and 30 minutes");
        assert_eq!(format_wait_time(Duration::from_secs(7_260)), "2 hours and 1 minute");
    }
}
