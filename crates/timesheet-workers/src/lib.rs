pub mod auto_shutdown;
pub mod coordinator;
pub mod expiry_sweeper;
pub mod lunch_reminder;
pub mod notifier;

pub use coordinator::WorkerCoordinator;
pub use notifier::{LoggingNotifier, Notifier};
