//! Sunrise / sunset times
//!
//! Almanac sunrise equation as published by the US Naval Observatory,
//! accurate to a minute or two outside the polar circles.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

/// Official zenith for sunrise/sunset, accounting for refraction and the
/// solar disc radius
pub const ZENITH_OFFICIAL: f64 = 90.833;

/// Civil twilight zenith
pub const ZENITH_CIVIL: f64 = 96.0;

/// Time the sun rises on `date` (a local calendar date) at the location.
/// `None` when the sun does not rise that day (polar night or midnight sun).
pub fn sunrise(date: NaiveDate, latitude: f64, longitude: f64) -> Option<DateTime<Utc>> {
    solar_event(date, latitude, longitude, true, ZENITH_OFFICIAL)
}

/// Time the sun sets on `date` at the location.
pub fn sunset(date: NaiveDate, latitude: f64, longitude: f64) -> Option<DateTime<Utc>> {
    solar_event(date, latitude, longitude, false, ZENITH_OFFICIAL)
}

/// Start of morning civil twilight
pub fn dawn(date: NaiveDate, latitude: f64, longitude: f64) -> Option<DateTime<Utc>> {
    solar_event(date, latitude, longitude, true, ZENITH_CIVIL)
}

fn solar_event(
    date: NaiveDate,
    latitude: f64,
    longitude: f64,
    rising: bool,
    zenith: f64,
) -> Option<DateTime<Utc>> {
    let day_of_year = date.ordinal() as f64;
    let lng_hour = longitude / 15.0;

    // Rough UT of the event, used to pick the right day after wrapping
    let approx_ut = (if rising { 6.0 } else { 18.0 }) - lng_hour;
    let t = day_of_year + approx_ut / 24.0;

    // Sun's mean anomaly and true longitude
    let mean_anomaly = 0.9856 * t - 3.289;
    let true_lng = (mean_anomaly
        + 1.916 * sin_deg(mean_anomaly)
        + 0.020 * sin_deg(2.0 * mean_anomaly)
        + 282.634)
        .rem_euclid(360.0);

    // Right ascension, moved into the same quadrant as the true longitude
    let mut right_ascension = (0.91764 * tan_deg(true_lng)).atan().to_degrees().rem_euclid(360.0);
    let lng_quadrant = (true_lng / 90.0).floor() * 90.0;
    let ra_quadrant = (right_ascension / 90.0).floor() * 90.0;
    right_ascension = (right_ascension + lng_quadrant - ra_quadrant) / 15.0;

    let sin_dec = 0.39782 * sin_deg(true_lng);
    let cos_dec = sin_dec.asin().cos();

    let cos_hour_angle =
        (cos_deg(zenith) - sin_dec * sin_deg(latitude)) / (cos_dec * cos_deg(latitude));
    if !(-1.0..=1.0).contains(&cos_hour_angle) {
        return None;
    }

    let hour_angle_deg = if rising {
        360.0 - cos_hour_angle.acos().to_degrees()
    } else {
        cos_hour_angle.acos().to_degrees()
    };
    let hour_angle = hour_angle_deg / 15.0;

    let local_mean_time = hour_angle + right_ascension - 0.06571 * t - 6.622;
    let mut ut = (local_mean_time - lng_hour).rem_euclid(24.0);
    if ut - approx_ut > 12.0 {
        ut -= 24.0;
    } else if ut - approx_ut < -12.0 {
        ut += 24.0;
    }

    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    Some(midnight + Duration::milliseconds((ut * 3_600_000.0).round() as i64))
}

fn sin_deg(deg: f64) -> f64 {
    deg.to_radians().sin()
}

fn cos_deg(deg: f64) -> f64 {
    deg.to_radians().cos()
}

fn tan_deg(deg: f64) -> f64 {
    deg.to_radians().tan()
}
