//! HTTP handlers, one module per resource

pub mod categories;
pub mod departments;
pub mod intake;
pub mod maintenance;
pub mod multipart;
pub mod overview;
pub mod tokens;
