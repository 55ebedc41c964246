use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use timesheet_domain::ActivityState;
use timesheet_storage::Database;
use tokio::time::interval;
use uuid::Uuid;

use crate::notifier::Notifier;

/// Run the lunch reminder worker loop until `shutdown` reports `true`.
/// Period: once per minute (§4.4.2). The debounce map is local to this
/// loop — worker bookkeeping, not tracking-domain state — so it does not
/// need to survive a restart; losing it just risks one extra reminder.
pub async fn run(db: Arc<Database>, notifier: Arc<dyn Notifier>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let mut ticker = interval(StdDuration::from_secs(60));
    let mut last_reminded: HashMap<Uuid, NaiveDate> = HashMap::new();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = tick(&db, notifier.as_ref(), Utc::now(), &mut last_reminded).await {
                    log::error!("lunch-reminder tick failed: {e}");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    log::info!("lunch-reminder worker shutting down");
                    break;
                }
            }
        }
    }
}

async fn tick(
    db: &Database,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
    last_reminded: &mut HashMap<Uuid, NaiveDate>,
) -> anyhow::Result<()> {
    for user in db.users_with_lunch_reminder()? {
        let (Some(hour), Some(minute)) = (user.lunch_reminder_hour, user.lunch_reminder_minute) else {
            continue;
        };
        let local_now = user.to_local(now);
        if local_now.hour() != hour || local_now.minute() != minute {
            continue;
        }

        let today = local_now.date();
        if last_reminded.get(&user.id) == Some(&today) {
            continue;
        }

        let is_working = matches!(
            db.active_session(user.id)?,
            Some(session) if session.state == ActivityState::Working
        );
        if !is_working {
            continue;
        }

        last_reminded.insert(user.id, today);
        if let Err(e) = notifier.notify(user.id, "time for lunch").await {
            log::warn!("lunch reminder delivery failed for user {}: {e}", user.id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use timesheet_domain::{TrackingSession, User};

    #[derive(Default)]
    struct RecordingNotifier {
        calls: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, user_id: Uuid, _message: &str) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(user_id);
            Ok(())
        }
    }

    fn working_user(hour: u32, minute: u32) -> (Database, User) {
        let db = Database::open_in_memory().unwrap();
        let mut user = User::new(1, 0, false);
        user.lunch_reminder_hour = Some(hour);
        user.lunch_reminder_minute = Some(minute);
        db.create_user(&user).unwrap();
        let session = TrackingSession::new_active(
            user.id,
            ActivityState::Working,
            Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap(),
            None,
        );
        db.insert_session(&session).unwrap();
        (db, user)
    }

    #[tokio::test]
    async fn reminds_once_at_configured_time() {
        let (db, _user) = working_user(12, 0);
        let notifier = Arc::new(RecordingNotifier::default());
        let mut seen = HashMap::new();

        let noon = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        tick(&db, notifier.as_ref(), noon, &mut seen).await.unwrap();
        assert_eq!(notifier.calls.lock().unwrap().len(), 1);

        // Same minute again (e.g. a re-fired tick) must not double-remind.
        tick(&db, notifier.as_ref(), noon, &mut seen).await.unwrap();
        assert_eq!(notifier.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn does_not_remind_outside_the_configured_minute() {
        let (db, _user) = working_user(12, 0);
        let notifier = Arc::new(RecordingNotifier::default());
        let mut seen = HashMap::new();

        let eleven = Utc.with_ymd_and_hms(2026, 1, 5, 11, 0, 0).unwrap();
        tick(&db, notifier.as_ref(), eleven, &mut seen).await.unwrap();
        assert!(notifier.calls.lock().unwrap().is_empty());
    }
}
