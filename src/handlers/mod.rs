// Gateway module - controls public API for handlers
// Modules are private, only exported symbols are public

mod auth;
mod checks;
mod health;
mod metrics;
mod root;
mod shared_types;

// Core handlers
pub use health::health_check;
pub use metrics::metrics_handler;
pub use root::root_handler;

// Auth handlers
pub use auth::{logout, me, request_code, verify_code};

// Readiness check handlers
pub use checks::{complete_check, get_check, start_check};
