//! # sftpush – core
//!
//! Shared types used by the transfer crate and the binary:
//!   • [`UploadError`] – the classified failure taxonomy and exit codes
//!   • [`UploadReport`] – per-step timing and status of one upload run

pub mod error;
pub mod report;

pub use error::{UploadError, UploadErrorKind, UploadResult};
pub use report::{StepRecord, StepStatus, UploadReport};
