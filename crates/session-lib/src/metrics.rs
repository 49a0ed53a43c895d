// ==============
// crates/session-lib/src/metrics.rs

//! Central place for metric keys
pub const SESSION_LOGIN: &str = "session.login";
pub const SESSION_REGISTER: &str = "session.register";
pub const SESSION_LOGOUT: &str = "session.logout";
pub const SESSION_REFRESH_FAILED: &str = "session.refresh_failed";
pub const SESSION_CACHE_CORRUPT: &str = "session.cache_corrupt";
