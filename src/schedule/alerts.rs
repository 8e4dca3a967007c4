//! Reminder arithmetic
//!
//! Coffee = average wake time + 90 minutes.
//! Sunlight = sunrise − 30 minutes.
//!
//! Everything here is pure: callers pass `now` so results are reproducible.

use super::solar;
use super::ScheduleError;
use crate::whoop::SleepRecord;
use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Geographic position used for sunrise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ScheduleError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ScheduleError::InvalidLocation(format!(
                "latitude {} out of range",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ScheduleError::InvalidLocation(format!(
                "longitude {} out of range",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Offsets applied to sunrise and wake time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertOffsets {
    pub sunlight_before_sunrise: Duration,
    pub coffee_after_wake: Duration,
}

impl Default for AlertOffsets {
    fn default() -> Self {
        Self {
            sunlight_before_sunrise: Duration::minutes(30),
            coffee_after_wake: Duration::minutes(90),
        }
    }
}

impl From<&crate::config::ScheduleConfig> for AlertOffsets {
    fn from(config: &crate::config::ScheduleConfig) -> Self {
        Self {
            sunlight_before_sunrise: Duration::minutes(config.sunlight_offset_minutes),
            coffee_after_wake: Duration::minutes(config.coffee_offset_minutes),
        }
    }
}

/// The next reminder of each kind, with the inputs they came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextAlerts {
    /// `None` when no location is known or the sun does not rise
    pub sunlight: Option<DateTime<Utc>>,
    /// `None` when there are no sleep records
    pub coffee: Option<DateTime<Utc>>,
    /// Sunrise the sunlight reminder was derived from
    pub sunrise: Option<DateTime<Utc>>,
    /// Average wake time on the user's clock
    pub average_wake: Option<NaiveTime>,
    /// Offset of the user's clock, e.g. `-05:00`
    pub utc_offset: String,
    pub location: Option<Location>,
    pub computed_at: DateTime<Utc>,
}

/// Coffee reminder for a single wake time
pub fn coffee_time(wake: DateTime<Utc>, offsets: &AlertOffsets) -> DateTime<Utc> {
    wake + offsets.coffee_after_wake
}

/// Sunlight reminder for a single sunrise
pub fn sunlight_time(sunrise: DateTime<Utc>, offsets: &AlertOffsets) -> DateTime<Utc> {
    sunrise - offsets.sunlight_before_sunrise
}

/// Offset of the most recent record's clock
pub fn latest_offset(records: &[SleepRecord]) -> Option<FixedOffset> {
    records.iter().max_by_key(|r| r.end).map(SleepRecord::offset)
}

/// Average local wake time over main sleeps (naps ignored).
///
/// Times of day are averaged on the clock face, so 23:50 and 00:10 average
/// to midnight rather than noon.
pub fn average_wake(records: &[SleepRecord]) -> Option<NaiveTime> {
    let (mut sin_sum, mut cos_sum, mut count) = (0.0, 0.0, 0usize);

    for record in records.iter().filter(|r| !r.nap) {
        let seconds = record.local_end().num_seconds_from_midnight() as f64;
        let angle = seconds / SECONDS_PER_DAY * 2.0 * PI;
        sin_sum += angle.sin();
        cos_sum += angle.cos();
        count += 1;
    }

    if count == 0 {
        return None;
    }

    let angle = sin_sum.atan2(cos_sum).rem_euclid(2.0 * PI);
    let seconds = (angle / (2.0 * PI) * SECONDS_PER_DAY).round() as u32 % 86_400;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
}

/// First instant strictly after `now` whose local clock reads `time`
pub fn next_occurrence(
    now: DateTime<Utc>,
    offset: FixedOffset,
    time: NaiveTime,
) -> Option<DateTime<Utc>> {
    let today = now.with_timezone(&offset).date_naive();

    [today, today.succ_opt()?]
        .into_iter()
        .filter_map(|day| offset.from_local_datetime(&day.and_time(time)).single())
        .map(|dt| dt.with_timezone(&Utc))
        .find(|dt| *dt > now)
}

/// First sunrise-based reminder strictly after `now`, with its sunrise
pub fn next_sunlight(
    now: DateTime<Utc>,
    offset: FixedOffset,
    location: Location,
    offsets: &AlertOffsets,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let today = now.with_timezone(&offset).date_naive();

    // A few days either side covers far-east/far-west wrap and short polar gaps
    (-1..=3)
        .filter_map(|delta| today.checked_add_signed(Duration::days(delta)))
        .filter_map(|day: NaiveDate| solar::sunrise(day, location.latitude, location.longitude))
        .map(|rise| (sunlight_time(rise, offsets), rise))
        .filter(|(alert, _)| *alert > now)
        .min_by_key(|(alert, _)| *alert)
}

/// Compute both reminders from recent sleep and an optional location
pub fn compute(
    now: DateTime<Utc>,
    records: &[SleepRecord],
    location: Option<Location>,
    offsets: &AlertOffsets,
) -> NextAlerts {
    let offset = latest_offset(records)
        .or_else(|| location.map(|l| longitude_offset(l.longitude)))
        .unwrap_or_else(|| Utc.fix());

    let average_wake = average_wake(records);
    let coffee = average_wake
        .map(|wake| wake.overflowing_add_signed(offsets.coffee_after_wake).0)
        .and_then(|time| next_occurrence(now, offset, time));

    let sunlight = location.and_then(|l| next_sunlight(now, offset, l, offsets));

    NextAlerts {
        sunlight: sunlight.map(|(alert, _)| alert),
        coffee,
        sunrise: sunlight.map(|(_, rise)| rise),
        average_wake,
        utc_offset: offset.to_string(),
        location,
        computed_at: now,
    }
}

/// Whole-hour offset implied by longitude, used when no sleep data exists
fn longitude_offset(longitude: f64) -> FixedOffset {
    let hours = (longitude / 15.0).round() as i32;
    FixedOffset::east_opt(hours.clamp(-12, 14) * 3600).unwrap_or_else(|| Utc.fix())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, end: &str, offset: &str, nap: bool) -> SleepRecord {
        let end: DateTime<Utc> = end.parse().unwrap();
        SleepRecord {
            id,
            user_id: 1,
            start: end - Duration::hours(8),
            end,
            timezone_offset: offset.to_string(),
            nap,
            score_state: "SCORED".to_string(),
            score: None,
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_fixed_offsets() {
        let offsets = AlertOffsets::default();
        let wake = utc("2024-05-01T11:00:00Z");
        let sunrise = utc("2024-05-01T10:00:00Z");

        assert_eq!(coffee_time(wake, &offsets), utc("2024-05-01T12:30:00Z"));
        assert_eq!(sunlight_time(sunrise, &offsets), utc("2024-05-01T09:30:00Z"));
    }

    #[test]
    fn test_average_wake_local_time() {
        // 07:00 and 07:30 in New York (-04:00)
        let records = vec![
            record(1, "2024-05-01T11:00:00Z", "-04:00", false),
            record(2, "2024-05-02T11:30:00Z", "-04:00", false),
        ];
        assert_eq!(average_wake(&records), Some(hm(7, 15)));
    }

    #[test]
    fn test_average_wake_ignores_naps() {
        let records = vec![
            record(1, "2024-05-01T07:00:00Z", "+00:00", false),
            record(2, "2024-05-01T15:00:00Z", "+00:00", true),
        ];
        assert_eq!(average_wake(&records), Some(hm(7, 0)));
    }

    #[test]
    fn test_average_wake_across_midnight() {
        let records = vec![
            record(1, "2024-05-01T23:50:00Z", "+00:00", false),
            record(2, "2024-05-03T00:10:00Z", "+00:00", false),
        ];
        assert_eq!(average_wake(&records), Some(hm(0, 0)));
    }

    #[test]
    fn test_average_wake_empty() {
        assert_eq!(average_wake(&[]), None);
        let naps = vec![record(1, "2024-05-01T15:00:00Z", "+00:00", true)];
        assert_eq!(average_wake(&naps), None);
    }

    #[test]
    fn test_next_occurrence() {
        let offset = FixedOffset::west_opt(4 * 3600).unwrap();
        // 06:00 local
        let now = utc("2024-05-10T10:00:00Z");
        assert_eq!(
            next_occurrence(now, offset, hm(7, 0)),
            Some(utc("2024-05-10T11:00:00Z"))
        );
        // Already past today, rolls to tomorrow
        assert_eq!(
            next_occurrence(now, offset, hm(5, 0)),
            Some(utc("2024-05-11T09:00:00Z"))
        );
        // Exactly now is not "next"
        assert_eq!(
            next_occurrence(now, offset, hm(6, 0)),
            Some(utc("2024-05-11T10:00:00Z"))
        );
    }

    #[test]
    fn test_compute_coffee_from_sleep() {
        let records = vec![
            record(1, "2024-05-08T11:00:00Z", "-04:00", false),
            record(2, "2024-05-09T11:00:00Z", "-04:00", false),
        ];
        let offsets = AlertOffsets::default();

        // 06:00 local: wake at 07:00, coffee 08:30
        let alerts = compute(utc("2024-05-10T10:00:00Z"), &records, None, &offsets);
        assert_eq!(alerts.average_wake, Some(hm(7, 0)));
        assert_eq!(alerts.coffee, Some(utc("2024-05-10T12:30:00Z")));
        assert_eq!(alerts.sunlight, None);
        assert_eq!(alerts.utc_offset, "-04:00");

        // 08:00 local: woke already, coffee still ahead today
        let alerts = compute(utc("2024-05-10T12:00:00Z"), &records, None, &offsets);
        assert_eq!(alerts.coffee, Some(utc("2024-05-10T12:30:00Z")));

        // 09:00 local: coffee passed, tomorrow's
        let alerts = compute(utc("2024-05-10T13:00:00Z"), &records, None, &offsets);
        assert_eq!(alerts.coffee, Some(utc("2024-05-11T12:30:00Z")));
    }

    #[test]
    fn test_compute_sunlight() {
        let new_york = Location::new(40.7128, -74.0060).unwrap();
        let records = vec![record(1, "2024-06-20T10:00:00Z", "-04:00", false)];
        let offsets = AlertOffsets::default();

        // Midnight local on the 21st: sunrise ~09:25 UTC, reminder ~08:55 UTC
        let now = utc("2024-06-21T04:00:00Z");
        let alerts = compute(now, &records, Some(new_york), &offsets);

        let sunrise = alerts.sunrise.unwrap();
        let sunlight = alerts.sunlight.unwrap();
        assert_eq!(sunrise - sunlight, Duration::minutes(30));
        assert!((sunrise - utc("2024-06-21T09:25:00Z")).num_seconds().abs() < 180);

        // After today's reminder the next one is tomorrow's
        let later = compute(utc("2024-06-21T09:00:00Z"), &records, Some(new_york), &offsets);
        assert!(later.sunlight.unwrap() > utc("2024-06-22T08:00:00Z"));
        assert!(later.sunlight.unwrap() < utc("2024-06-22T10:00:00Z"));
    }

    #[test]
    fn test_compute_without_data() {
        let alerts = compute(utc("2024-06-21T04:00:00Z"), &[], None, &AlertOffsets::default());
        assert_eq!(alerts.coffee, None);
        assert_eq!(alerts.sunlight, None);
        assert_eq!(alerts.utc_offset, "+00:00");
    }

    #[test]
    fn test_compute_polar_night_has_no_sunlight() {
        let tromso = Location::new(69.6492, 18.9553).unwrap();
        let alerts = compute(
            utc("2024-12-21T04:00:00Z"),
            &[],
            Some(tromso),
            &AlertOffsets::default(),
        );
        assert_eq!(alerts.sunlight, None);
        assert_eq!(alerts.utc_offset, "+01:00");
    }

    #[test]
    fn test_location_validation() {
        assert!(Location::new(91.0, 0.0).is_err());
        assert!(Location::new(0.0, -181.0).is_err());
        assert!(Location::new(f64::NAN, 0.0).is_err());
        assert!(Location::new(-33.9, 151.2).is_ok());
    }
}
