//! Upload error type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorised upload failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadError {
    pub kind: UploadErrorKind,
    pub message: String,
    /// Local or remote path the failure relates to, if any.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum UploadErrorKind {
    /// A required parameter is missing or malformed.
    Config,
    /// TCP connect, DNS resolution, or SSH handshake failure.
    Dial,
    /// The server's host key was rejected by the verification policy.
    HostKey,
    /// Credentials were rejected.
    Auth,
    /// The server does not offer the SFTP subsystem.
    Protocol,
    /// Remote path does not exist. Only produced by the existence probe.
    NotFound,
    /// The local source file could not be read.
    Read,
    /// The remote target could not be created.
    Create,
    /// The payload write was rejected or incomplete.
    Write,
}

pub type UploadResult<T> = Result<T, UploadError>;

// ── Construction helpers ─────────────────────────────────────────────

impl UploadError {
    pub fn new(kind: UploadErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::Config, msg)
    }

    pub fn dial(msg: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::Dial, msg)
    }

    pub fn host_key(msg: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::HostKey, msg)
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::Auth, msg)
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::Protocol, msg)
    }

    pub fn not_found(path: &str) -> Self {
        Self::new(UploadErrorKind::NotFound, format!("'{}' does not exist", path)).with_path(path)
    }

    pub fn read(msg: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::Read, msg)
    }

    pub fn create(msg: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::Create, msg)
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self::new(UploadErrorKind::Write, msg)
    }

    /// Whether this error must abort the upload.
    pub fn is_fatal(&self) -> bool {
        self.kind != UploadErrorKind::NotFound
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self.kind {
            UploadErrorKind::NotFound => 1,
            UploadErrorKind::Config => 2,
            UploadErrorKind::Dial => 3,
            UploadErrorKind::HostKey => 4,
            UploadErrorKind::Auth => 5,
            UploadErrorKind::Protocol => 6,
            UploadErrorKind::Read => 7,
            UploadErrorKind::Create => 8,
            UploadErrorKind::Write => 9,
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "[{:?}] {} ({})", self.kind, self.message, path),
            None => write!(f, "[{:?}] {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for UploadError {}

impl From<UploadError> for String {
    fn from(e: UploadError) -> String {
        e.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_not_fatal() {
        let err = UploadError::not_found("/upload/a.txt");
        assert!(!err.is_fatal());
        assert_eq!(err.path.as_deref(), Some("/upload/a.txt"));
    }

    #[test]
    fn test_fatal_kinds_have_distinct_nonzero_exit_codes() {
        let errors = [
            UploadError::config("x"),
            UploadError::dial("x"),
            UploadError::host_key("x"),
            UploadError::auth("x"),
            UploadError::protocol("x"),
            UploadError::read("x"),
            UploadError::create("x"),
            UploadError::write("x"),
        ];
        let mut codes: Vec<i32> = errors.iter().map(|e| e.exit_code()).collect();
        assert!(errors.iter().all(|e| e.is_fatal()));
        assert!(codes.iter().all(|c| *c != 0));
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_includes_kind_and_path() {
        let err = UploadError::create("permission denied").with_path("/srv/a.txt");
        assert_eq!(err.to_string(), "[Create] permission denied (/srv/a.txt)");

        let err = UploadError::auth("password rejected");
        assert_eq!(err.to_string(), "[Auth] password rejected");
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&UploadErrorKind::HostKey).unwrap();
        assert_eq!(json, "\"hostKey\"");
    }
}
