pub mod generate;
pub mod service;
pub mod user_service;

pub use generate::generate_phrase;
pub use service::{ConsumeOutcome, CredentialService, DEFAULT_TTL};
pub use user_service::UserService;
