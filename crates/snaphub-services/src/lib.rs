//! SnapHub Services Layer
//!
//! Business services of the intake subsystem. Each service talks to the
//! relational store through the `snaphub-db` store traits and to blobs
//! through the `snaphub-storage` [`Storage`] trait; the API crate only wires
//! them together and translates HTTP.
//!
//! Leaf-first:
//! - [`TokenRegistry`] resolves access tokens
//! - [`ProcessLifecycleManager`] opens numbered processes
//! - [`UploadPipeline`] stores a batch file by file
//! - [`NotificationDispatcher`] sends the best-effort completion email
//! - [`AuditViewBuilder`] builds the admin overview
//! - [`ReferenceDataManager`] manages tokens, departments and categories
//! - [`IntakeService`] and [`ReconciliationService`] sit on top

pub mod audit;
pub mod intake;
pub mod notify;
pub mod pipeline;
pub mod process;
pub mod reconcile;
pub mod reference;
pub mod registry;

pub use audit::{AuditIndex, AuditSnapshot, AuditViewBuilder};
pub use intake::{IntakeService, IntakeSubmission};
pub use notify::{
    NotificationChannel, NotificationDispatcher, NotificationMessage, SmtpChannel, UploadSummary,
};
pub use pipeline::{BatchOutcome, FilePolicy, IncomingFile, UploadPipeline};
pub use process::{OpenedProcess, ProcessLifecycleManager};
pub use reconcile::ReconciliationService;
pub use reference::ReferenceDataManager;
pub use registry::{generate_secret, TokenRegistry};
pub use snaphub_storage::{create_storage, Storage, StorageBackend, StorageError, StorageResult};

#[cfg(test)]
pub(crate) mod test_support;
