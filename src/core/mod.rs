//! Core business logic - framework-agnostic account, credit, payment, and
//! session operations.

/// Registration, authentication, bans, and limit adjustment
pub mod account;
/// Daily refills, spending, and coupled limit changes
pub mod credits;
/// Argon2id password hashing
pub mod password;
/// Manual review of credit purchases
pub mod payment;
/// Startup seeding of configured accounts
pub mod seed;
/// Session facade and admin console
pub mod session;

pub use payment::Decision;
pub use session::{AdminConsole, AuthSession, MemorySlot, SessionSlot, UserProfile};
