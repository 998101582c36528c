// src/portal/mod.rs
pub mod driver;
pub mod models;

// Re-export key retrieval types for convenience
#[allow(unused_imports)]
pub use driver::{retrieve, retrieve_with};
#[allow(unused_imports)]
pub use models::{ArchiveJob, JobOutcome, PortalConfig};
