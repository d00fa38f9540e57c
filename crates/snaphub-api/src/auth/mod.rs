//! Administrator authentication
//!
//! Submitters authenticate with their token secret inside the intake form;
//! only the admin routes sit behind [`middleware::admin_auth_middleware`].

pub mod client_ip;
pub mod middleware;
pub mod models;

pub use middleware::{admin_auth_middleware, AdminAuthState, AuthFailureLimiter};
pub use models::AdminSession;
