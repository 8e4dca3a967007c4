//! Reminder Scheduler
//!
//! Keeps the next reminders for every logged-in user and fires them when
//! they come due. A background task ticks once a second by default.

use super::alerts::{self, AlertOffsets, Location, NextAlerts};
use crate::whoop::SleepRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Which reminder fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Sunlight,
    Coffee,
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderKind::Sunlight => write!(f, "sunlight"),
            ReminderKind::Coffee => write!(f, "coffee"),
        }
    }
}

/// A reminder that came due
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiredReminder {
    pub user_id: i64,
    pub kind: ReminderKind,
    pub due_at: DateTime<Utc>,
}

/// Public view of one user's schedule
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleStatus {
    pub user_id: i64,
    pub alerts: NextAlerts,
    pub sleep_records_used: usize,
    pub last_fired: Option<FiredReminder>,
    pub fired_count: u32,
    pub updated_at: DateTime<Utc>,
}

/// Inputs kept so alerts can be rolled forward without refetching
struct UserSchedule {
    records: Vec<SleepRecord>,
    location: Option<Location>,
    alerts: NextAlerts,
    last_fired: Option<FiredReminder>,
    fired_count: u32,
    updated_at: DateTime<Utc>,
}

impl UserSchedule {
    fn status(&self, user_id: i64) -> ScheduleStatus {
        ScheduleStatus {
            user_id,
            alerts: self.alerts.clone(),
            sleep_records_used: self.records.len(),
            last_fired: self.last_fired.clone(),
            fired_count: self.fired_count,
            updated_at: self.updated_at,
        }
    }
}

/// Tracks and fires reminders for all users
pub struct ReminderScheduler {
    schedules: Arc<RwLock<HashMap<i64, UserSchedule>>>,
    offsets: AlertOffsets,
    tick_interval: Duration,
    running: Arc<RwLock<bool>>,
}

impl ReminderScheduler {
    /// Create a new scheduler
    pub fn new(offsets: AlertOffsets, tick_interval: Duration) -> Self {
        Self {
            schedules: Arc::new(RwLock::new(HashMap::new())),
            offsets,
            tick_interval,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Recompute a user's reminders from fresh inputs
    pub async fn update(
        &self,
        user_id: i64,
        records: Vec<SleepRecord>,
        location: Option<Location>,
        now: DateTime<Utc>,
    ) -> ScheduleStatus {
        let alerts = alerts::compute(now, &records, location, &self.offsets);

        tracing::debug!(
            user_id,
            sunlight = ?alerts.sunlight,
            coffee = ?alerts.coffee,
            "Reminders updated"
        );

        let mut schedules = self.schedules.write().await;
        let entry = schedules.entry(user_id).or_insert_with(|| UserSchedule {
            records: Vec::new(),
            location: None,
            alerts: alerts.clone(),
            last_fired: None,
            fired_count: 0,
            updated_at: now,
        });

        entry.records = records;
        entry.location = location;
        entry.alerts = alerts;
        entry.updated_at = now;
        entry.status(user_id)
    }

    /// Current schedule of a user, if any
    pub async fn status(&self, user_id: i64) -> Option<ScheduleStatus> {
        self.schedules
            .read()
            .await
            .get(&user_id)
            .map(|s| s.status(user_id))
    }

    /// Location the user's schedule was computed for
    pub async fn location(&self, user_id: i64) -> Option<Option<Location>> {
        self.schedules.read().await.get(&user_id).map(|s| s.location)
    }

    /// Forget a user (logout)
    pub async fn remove(&self, user_id: i64) -> bool {
        self.schedules.write().await.remove(&user_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.schedules.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.schedules.read().await.is_empty()
    }

    /// Fire every reminder due at `now` and roll those users forward
    pub async fn check_due(&self, now: DateTime<Utc>) -> Vec<FiredReminder> {
        let mut fired = Vec::new();
        let mut schedules = self.schedules.write().await;

        for (user_id, schedule) in schedules.iter_mut() {
            let due: Vec<FiredReminder> = [
                (ReminderKind::Sunlight, schedule.alerts.sunlight),
                (ReminderKind::Coffee, schedule.alerts.coffee),
            ]
            .into_iter()
            .filter_map(|(kind, at)| at.map(|at| (kind, at)))
            .filter(|(_, at)| *at <= now)
            .map(|(kind, due_at)| FiredReminder {
                user_id: *user_id,
                kind,
                due_at,
            })
            .collect();

            if due.is_empty() {
                continue;
            }

            schedule.alerts =
                alerts::compute(now, &schedule.records, schedule.location, &self.offsets);
            schedule.updated_at = now;
            schedule.fired_count += due.len() as u32;
            schedule.last_fired = due.last().cloned();
            fired.extend(due);
        }

        fired.sort_by_key(|f| f.due_at);
        fired
    }

    /// Start the scheduler background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let scheduler = self.clone();

        tokio::spawn(async move {
            *scheduler.running.write().await = true;
            tracing::info!(
                interval_ms = scheduler.tick_interval.as_millis() as u64,
                "Reminder scheduler started"
            );

            let mut interval = tokio::time::interval(scheduler.tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                if !*scheduler.running.read().await {
                    break;
                }

                for reminder in scheduler.check_due(Utc::now()).await {
                    tracing::info!(
                        user_id = reminder.user_id,
                        reminder = %reminder.kind,
                        due_at = %reminder.due_at,
                        "Reminder due"
                    );
                }
            }

            tracing::info!("Reminder scheduler stopped");
        })
    }

    /// Stop the scheduler
    pub async fn stop(&self) {
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}

impl Default for ReminderScheduler {
    fn default() -> Self {
        Self::new(AlertOffsets::default(), Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(end: &str) -> SleepRecord {
        let end: DateTime<Utc> = end.parse().unwrap();
        SleepRecord {
            id: 1,
            user_id: 7,
            start: end - chrono::Duration::hours(8),
            end,
            timezone_offset: "+00:00".to_string(),
            nap: false,
            score_state: "SCORED".to_string(),
            score: None,
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_update_and_status() {
        let scheduler = ReminderScheduler::default();
        assert!(scheduler.status(7).await.is_none());

        let status = scheduler
            .update(7, vec![record("2024-05-09T07:00:00Z")], None, utc("2024-05-10T06:00:00Z"))
            .await;

        assert_eq!(status.alerts.coffee, Some(utc("2024-05-10T08:30:00Z")));
        assert_eq!(status.sleep_records_used, 1);
        assert_eq!(scheduler.len().await, 1);
        assert_eq!(scheduler.location(7).await, Some(None));
    }

    #[tokio::test]
    async fn test_check_due_fires_and_rolls_forward() {
        let scheduler = ReminderScheduler::default();
        scheduler
            .update(7, vec![record("2024-05-09T07:00:00Z")], None, utc("2024-05-10T06:00:00Z"))
            .await;

        // Not yet
        assert!(scheduler.check_due(utc("2024-05-10T08:29:59Z")).await.is_empty());

        let fired = scheduler.check_due(utc("2024-05-10T08:30:00Z")).await;
        assert_eq!(
            fired,
            vec![FiredReminder {
                user_id: 7,
                kind: ReminderKind::Coffee,
                due_at: utc("2024-05-10T08:30:00Z"),
            }]
        );

        let status = scheduler.status(7).await.unwrap();
        assert_eq!(status.fired_count, 1);
        assert_eq!(status.alerts.coffee, Some(utc("2024-05-11T08:30:00Z")));
        assert_eq!(status.last_fired.unwrap().kind, ReminderKind::Coffee);

        // Already rolled, nothing fires twice
        assert!(scheduler.check_due(utc("2024-05-10T08:30:01Z")).await.is_empty());
    }

    #[tokio::test]
    async fn test_sunlight_fires() {
        let scheduler = ReminderScheduler::default();
        let london = Location::new(51.5074, -0.1278).unwrap();
        let status = scheduler
            .update(9, Vec::new(), Some(london), utc("2024-12-21T00:00:00Z"))
            .await;

        let sunlight = status.alerts.sunlight.unwrap();
        let fired = scheduler.check_due(sunlight).await;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].kind, ReminderKind::Sunlight);

        let next = scheduler.status(9).await.unwrap().alerts.sunlight.unwrap();
        assert!(next > sunlight + chrono::Duration::hours(23));
    }

    #[tokio::test]
    async fn test_remove() {
        let scheduler = ReminderScheduler::default();
        scheduler.update(7, Vec::new(), None, Utc::now()).await;
        assert!(scheduler.remove(7).await);
        assert!(!scheduler.remove(7).await);
        assert!(scheduler.is_empty().await);
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let scheduler = Arc::new(ReminderScheduler::new(
            AlertOffsets::default(),
            Duration::from_millis(10),
        ));
        let handle = Arc::clone(&scheduler).start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(scheduler.is_running().await);

        scheduler.stop().await;
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(!scheduler.is_running().await);
    }
}
