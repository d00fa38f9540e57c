//! Data models for the application
//!
//! Entities mirror the tables owned by the backing store. Request DTOs carry
//! `validator` rules; response types derive `ToSchema` for the OpenAPI document.

mod audit;
mod category;
mod department;
mod intake;
mod process;
mod reconcile;
mod token;
mod upload;

pub use audit::*;
pub use category::*;
pub use department::*;
pub use intake::*;
pub use process::*;
pub use reconcile::*;
pub use token::*;
pub use upload::*;
