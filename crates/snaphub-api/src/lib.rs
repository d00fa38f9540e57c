//! SnapHub API Library
//!
//! HTTP handlers, admin authentication and application setup for the
//! intake and audit service.

mod api_doc;
mod handlers;
mod telemetry;

pub mod auth;
pub mod constants;
pub mod error;
pub mod setup;
pub mod state;

pub use error::ErrorResponse;
pub use state::AppState;
