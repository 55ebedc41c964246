use async_trait::async_trait;
use uuid::Uuid;

/// Best-effort delivery of a worker-originated notice to a user's front
/// end. Delivery failure never rolls back the database change that
/// triggered it (§4.4.1).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: Uuid, message: &str) -> anyhow::Result<()>;
}

/// Default notifier until a bot/HTTP transport is wired in; logs at info
/// level so the delivery attempt is still observable in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, user_id: Uuid, message: &str) -> anyhow::Result<()> {
        log::info!("notify user={user_id}: {message}");
        Ok(())
    }
}
