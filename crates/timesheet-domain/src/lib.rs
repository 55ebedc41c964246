pub mod compliance;
pub mod employer;
pub mod error;
pub mod holiday;
pub mod mnemonic;
pub mod session;
pub mod user;

pub use compliance::{AnchorKind, ComplianceRule, RuleType};
pub use employer::EmployerAttendanceRecord;
pub use error::{CoreError, CoreResult};
pub use holiday::{Holiday, HolidayType};
pub use mnemonic::PendingMnemonic;
pub use session::{ActivityState, CommuteDirection, TrackingSession};
pub use user::User;
