// crates/server-jobs/src/lib.rs
//! Import job orchestration.
//!
//! - `ImportService` — submission (sync/async), status resolution, listings
//! - `JobRegistry` — latest progress of live jobs
//! - `reaper` — evicts finished jobs from the registry after a grace period
//! - `JobStore` / `Notifier` — durable storage and completion hook

mod consumer;
pub mod error;
pub mod notifier;
pub mod reaper;
pub mod registry;
pub mod service;
pub mod store;

pub use consumer::JobCompletion;
pub use error::{ImportError, ImportResult};
pub use notifier::{LogNotifier, Notifier, NotifyError};
pub use reaper::DEFAULT_REAP_GRACE;
pub use registry::{JobRegistry, RegistryEntry};
pub use service::{
    ImportConfig, ImportService, JobLookup, SubmitMode, Submission, DEFAULT_MAX_BATCH_SIZE,
    DEV_PASSWORD_SALT,
};
pub use store::JobStore;
