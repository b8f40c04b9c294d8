//! Core relay components
//!
//! The relay engine, its rate limiter, and the durable preference store used by
//! the story front-end.

pub mod preferences;
pub mod rate_limit;
pub mod relay;

pub use preferences::{MemoryPreferences, PreferenceError, PreferenceStore, SqlitePreferences};
pub use rate_limit::{RateLimit, RateLimitConfig, RateLimiter};
pub use relay::{replies, RelayEngine, RelayError};
