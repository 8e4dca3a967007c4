//! Light90 CLI
//!
//! Command-line interface for Light90:
//! - Sunrise and sunlight time for a place and date
//! - Next sunlight and coffee reminders from a wake time
//! - Server status
//! - Default config file

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, Offset, Utc};
use clap::{Parser, Subcommand};
use light90::schedule::{alerts, solar, AlertOffsets, Location, ScheduleError};
use light90::whoop::parse_offset;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "light90-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sunlight and coffee timing from your sleep")]
#[command(long_about = "Light90 times your morning: sunlight 30 minutes before sunrise,\ncoffee 90 minutes after you wake.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:5000", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sunrise, sunset and sunlight reminder for a day
    Sunrise {
        /// Latitude in degrees (north positive)
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in degrees (east positive)
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Date as YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// UTC offset for display, e.g. -05:00 (default: this machine's)
        #[arg(long, allow_hyphen_values = true)]
        offset: Option<String>,
    },

    /// Next sunlight and coffee reminders for a wake time
    Alerts {
        /// Usual wake time, HH:MM
        #[arg(short, long)]
        wake: String,
        /// Latitude in degrees (north positive)
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in degrees (east positive)
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// UTC offset of the wake time, e.g. +01:00 (default: this machine's)
        #[arg(long, allow_hyphen_values = true)]
        offset: Option<String>,
    },

    /// Show server status
    Status,

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Generate default config file
    Init {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sunrise {
            lat,
            lng,
            date,
            offset,
        } => {
            let location = Location::new(lat, lng)?;
            let offset = resolve_offset(offset.as_deref())?;
            let date = date.unwrap_or_else(|| Utc::now().with_timezone(&offset).date_naive());
            let offsets = AlertOffsets::default();

            let dawn = solar::dawn(date, location.latitude, location.longitude);
            let sunrise = solar::sunrise(date, location.latitude, location.longitude);
            let sunset = solar::sunset(date, location.latitude, location.longitude);
            let sunlight = sunrise.map(|rise| alerts::sunlight_time(rise, &offsets));

            if cli.format == "json" {
                let body = serde_json::json!({
                    "date": date,
                    "location": location,
                    "dawn": dawn,
                    "sunrise": sunrise,
                    "sunset": sunset,
                    "sunlight": sunlight,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("{} at {:.4}, {:.4} (UTC{})", date, lat, lng, offset);
                println!();
                println!("{:<12} {}", "Dawn", format_instant(dawn, offset));
                println!("{:<12} {}", "Sunrise", format_instant(sunrise, offset));
                println!("{:<12} {}", "Sunlight", format_instant(sunlight, offset));
                println!("{:<12} {}", "Sunset", format_instant(sunset, offset));

                if sunrise.is_none() {
                    println!();
                    println!("The sun does not rise or set on this day at this latitude.");
                }
            }
        }

        Commands::Alerts {
            wake,
            lat,
            lng,
            offset,
        } => {
            let wake = parse_wake(&wake)?;
            let location = Location::new(lat, lng)?;
            let offset = resolve_offset(offset.as_deref())?;
            let offsets = AlertOffsets::default();
            let now = Utc::now();

            let coffee_at = wake.overflowing_add_signed(offsets.coffee_after_wake).0;
            let coffee = alerts::next_occurrence(now, offset, coffee_at);
            let sunlight = alerts::next_sunlight(now, offset, location, &offsets);

            if cli.format == "json" {
                let body = serde_json::json!({
                    "wake": wake,
                    "utc_offset": offset.to_string(),
                    "coffee": coffee,
                    "sunlight": sunlight.map(|(alert, _)| alert),
                    "sunrise": sunlight.map(|(_, rise)| rise),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("Wake {} (UTC{})", wake.format("%H:%M"), offset);
                println!();
                println!(
                    "{:<12} {}",
                    "Sunlight",
                    format_instant(sunlight.map(|(alert, _)| alert), offset)
                );
                println!(
                    "{:<12} {}",
                    "Sunrise",
                    format_instant(sunlight.map(|(_, rise)| rise), offset)
                );
                println!("{:<12} {}", "Coffee", format_instant(coffee, offset));
            }
        }

        Commands::Status => {
            let client = reqwest::Client::new();
            let response = client
                .get(format!("{}/health", cli.api_url))
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: serde_json::Value = resp.json().await?;

                    if cli.format == "json" {
                        println!("{}", serde_json::to_string_pretty(&health)?);
                        return Ok(());
                    }

                    println!(
                        "Light90 v{}",
                        health["version"].as_str().unwrap_or("unknown")
                    );
                    println!();
                    println!(
                        "API Status: {}",
                        health["status"].as_str().unwrap_or("unknown")
                    );
                    println!(
                        "Database:   {}",
                        health["database"].as_str().unwrap_or("unknown")
                    );
                    if let Some(users) = health["users"].as_u64() {
                        println!("Users:      {}", users);
                    }
                    if let Some(sessions) = health["sessions"].as_u64() {
                        println!("Sessions:   {}", sessions);
                    }
                    if let Some(scheduled) = health["scheduled_users"].as_u64() {
                        println!("Scheduled:  {}", scheduled);
                    }

                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Ok(resp) => {
                    eprintln!("API returned error: {}", resp.status());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Cannot connect to Light90 API at {}", cli.api_url);
                    eprintln!("Error: {}", e);
                    eprintln!();
                    eprintln!("Make sure the Light90 API server is running:");
                    eprintln!("  cargo run --bin light90");
                    std::process::exit(1);
                }
            }
        }

        Commands::Config {
            action: ConfigAction::Init { output },
        } => {
            let config = light90::config::generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

/// Parse `HH:MM` (or `HH:MM:SS`)
fn parse_wake(s: &str) -> Result<NaiveTime, ScheduleError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| ScheduleError::InvalidTime(format!("{}: expected HH:MM", s)))
}

fn resolve_offset(raw: Option<&str>) -> Result<FixedOffset, ScheduleError> {
    match raw {
        Some(raw) => parse_offset(raw)
            .ok_or_else(|| ScheduleError::InvalidTime(format!("{}: expected +HH:MM", raw))),
        None => Ok(Local::now().offset().fix()),
    }
}

fn format_instant(instant: Option<DateTime<Utc>>, offset: FixedOffset) -> String {
    match instant {
        Some(dt) => dt
            .with_timezone(&offset)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        None => "-".to_string(),
    }
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wake() {
        assert_eq!(
            parse_wake("06:45").unwrap(),
            NaiveTime::from_hms_opt(6, 45, 0).unwrap()
        );
        assert_eq!(
            parse_wake(" 7:05:30 ").unwrap(),
            NaiveTime::from_hms_opt(7, 5, 30).unwrap()
        );
        assert!(parse_wake("25:00").is_err());
        assert!(parse_wake("soon").is_err());
    }

    #[test]
    fn test_resolve_offset() {
        let offset = resolve_offset(Some("-05:00")).unwrap();
        assert_eq!(offset.local_minus_utc(), -5 * 3600);
        assert!(resolve_offset(Some("EST")).is_err());
        assert!(resolve_offset(None).is_ok());
    }

    #[test]
    fn test_format_instant() {
        let dt = DateTime::parse_from_rfc3339("2024-06-21T09:25:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let offset = parse_offset("-04:00").unwrap();
        assert_eq!(format_instant(Some(dt), offset), "2024-06-21 05:25");
        assert_eq!(format_instant(None, offset), "-");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(3_700), "1h 1m");
        assert_eq!(format_duration(90_000), "1d 1h");
    }
}
