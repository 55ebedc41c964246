use std::sync::Arc;
use std::time::Duration as StdDuration;

use timesheet_storage::Database;
use tokio::time::interval;

/// Run the expiry sweeper loop until `shutdown` reports `true`. Hourly:
/// deletes expired pending mnemonics (§4.4.3).
pub async fn run(db: Arc<Database>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let mut ticker = interval(StdDuration::from_secs(60 * 60));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match db.sweep_expired_mnemonics() {
                    Ok(count) if count > 0 => log::info!("swept {count} expired mnemonics"),
                    Ok(_) => {}
                    Err(e) => log::error!("expiry sweep failed: {e}"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    log::info!("expiry sweeper shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use timesheet_domain::PendingMnemonic;

    #[test]
    fn sweep_removes_only_expired_entries() {
        let db = Database::open_in_memory().unwrap();
        let expired = PendingMnemonic::new("expired phrase".to_string(), Duration::seconds(-1), None);
        let live = PendingMnemonic::new("live phrase".to_string(), Duration::hours(1), None);
        db.insert_pending_mnemonic(&expired).unwrap();
        db.insert_pending_mnemonic(&live).unwrap();

        let swept = db.sweep_expired_mnemonics().unwrap();
        assert_eq!(swept, 1);
        assert!(db.get_pending_mnemonic(&expired.phrase).unwrap().is_none());
        assert!(db.get_pending_mnemonic(&live.phrase).unwrap().is_some());
    }
}
