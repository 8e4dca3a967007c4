//! WHOOP API payloads
//!
//! Wire types for the WHOOP developer API (v1) plus the token set kept
//! on a user record.

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use super::WhoopError;

/// Refresh access tokens this long before they actually expire
pub const REFRESH_MARGIN_MINUTES: i64 = 5;

/// OAuth tokens issued by WHOOP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    /// Only present when the `offline` scope was granted
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub scope: Option<String>,
}

impl TokenSet {
    /// Whether the access token is expired or about to be
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + Duration::minutes(REFRESH_MARGIN_MINUTES)
    }
}

/// Raw token endpoint response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    pub(crate) fn into_token_set(self, now: DateTime<Utc>) -> Result<TokenSet, WhoopError> {
        let expires_at = Duration::try_seconds(self.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                WhoopError::Parse(format!("expires_in out of range: {}", self.expires_in))
            })?;

        Ok(TokenSet {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            scope: self.scope,
        })
    }
}

/// A single sleep (or nap) recorded by WHOOP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepRecord {
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Offset of the user's clock when the sleep was recorded, e.g. `-05:00`
    #[serde(default = "utc_offset")]
    pub timezone_offset: String,
    #[serde(default)]
    pub nap: bool,
    #[serde(default)]
    pub score_state: String,
    #[serde(default)]
    pub score: Option<SleepScore>,
}

fn utc_offset() -> String {
    "+00:00".to_string()
}

/// Scored sleep metrics; absent until WHOOP finishes scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepScore {
    #[serde(default)]
    pub sleep_performance_percentage: Option<f64>,
    #[serde(default)]
    pub sleep_efficiency_percentage: Option<f64>,
    #[serde(default)]
    pub respiratory_rate: Option<f64>,
}

impl SleepRecord {
    /// Parsed `timezone_offset`, falling back to UTC when malformed
    pub fn offset(&self) -> FixedOffset {
        parse_offset(&self.timezone_offset).unwrap_or_else(|| Utc.fix())
    }

    /// Wake time on the user's local clock
    pub fn local_end(&self) -> DateTime<FixedOffset> {
        self.end.with_timezone(&self.offset())
    }

    pub fn performance(&self) -> Option<f64> {
        self.score.as_ref().and_then(|s| s.sleep_performance_percentage)
    }
}

/// Parse a `+HH:MM` / `-HH:MM` / `Z` offset string
pub fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };

    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// One page of sleep records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SleepCollection {
    #[serde(default)]
    pub records: Vec<SleepRecord>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// Basic WHOOP user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhoopProfile {
    pub user_id: i64,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("-05:00"), FixedOffset::west_opt(5 * 3600));
        assert_eq!(parse_offset("+05:30"), FixedOffset::east_opt(5 * 3600 + 1800));
        assert_eq!(parse_offset("+0100"), FixedOffset::east_opt(3600));
        assert_eq!(parse_offset("Z"), FixedOffset::east_opt(0));
        assert_eq!(parse_offset("05:00"), None);
        assert_eq!(parse_offset("+25:00"), None);
        assert_eq!(parse_offset(""), None);
    }

    #[test]
    fn test_sleep_record_deserialize() {
        let json = r#"{
            "id": 93845,
            "user_id": 10129,
            "created_at": "2022-04-24T11:25:44.774Z",
            "start": "2022-04-24T02:25:44.774Z",
            "end": "2022-04-24T10:25:44.774Z",
            "timezone_offset": "-05:00",
            "nap": false,
            "score_state": "SCORED",
            "score": {
                "sleep_performance_percentage": 98,
                "respiratory_rate": 16.11328125
            }
        }"#;

        let record: SleepRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 93845);
        assert!(!record.nap);
        assert_eq!(record.performance(), Some(98.0));
        assert_eq!(record.local_end().format("%H:%M").to_string(), "05:25");
    }

    #[test]
    fn test_unscored_record() {
        let json = r#"{"id": 1, "start": "2024-01-01T00:00:00Z", "end": "2024-01-01T07:00:00Z", "score_state": "PENDING_SCORE"}"#;
        let record: SleepRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.performance(), None);
        assert_eq!(record.offset(), Utc.fix());
    }

    #[test]
    fn test_token_response_expiry() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let response = |expires_in| TokenResponse {
            access_token: "access".into(),
            refresh_token: None,
            expires_in,
            scope: None,
        };

        let tokens = response(3600).into_token_set(now).unwrap();
        assert_eq!(tokens.expires_at, now + Duration::hours(1));

        let err = response(i64::MAX).into_token_set(now).unwrap_err();
        assert!(matches!(err, WhoopError::Parse(_)));
    }

    #[test]
    fn test_needs_refresh() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let tokens = TokenSet {
            access_token: "a".into(),
            refresh_token: Some("r".into()),
            expires_at: now + Duration::minutes(4),
            scope: None,
        };
        assert!(tokens.needs_refresh(now));

        let tokens = TokenSet {
            expires_at: now + Duration::hours(1),
            ..tokens
        };
        assert!(!tokens.needs_refresh(now));
    }
}
