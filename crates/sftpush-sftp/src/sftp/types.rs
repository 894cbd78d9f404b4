// ── Types ─────────────────────────────────────────────────────────────────────

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Permission bits for the created remote file.
pub const REMOTE_FILE_MODE: i32 = 0o644;

// ── Connection ───────────────────────────────────────────────────────────────

/// Credentials for one SSH session. Consumed by [`SecureTransport::open`];
/// the password is dropped (and zeroised) once authentication completes.
///
/// [`SecureTransport::open`]: crate::sftp::SecureTransport::open
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

impl ConnectionParams {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

// ── Session ──────────────────────────────────────────────────────────────────

/// What remains of a connection once it is authenticated. Holds no secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth_method: String,
    pub server_banner: Option<String>,
    pub server_fingerprint: Option<String>,
}

// ── Transfer ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub source_path: PathBuf,
    pub target_directory: String,
}

impl TransferRequest {
    pub fn new(source_path: impl Into<PathBuf>, target_directory: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            target_directory: target_directory.into(),
        }
    }

    /// Base name of the source path, used as the remote file name.
    pub fn file_name(&self) -> Option<String> {
        base_name(&self.source_path)
    }

    pub fn remote_path(&self) -> Option<String> {
        self.file_name()
            .map(|name| join_remote(&self.target_directory, &name))
    }
}

/// Subset of remote stat data the pipeline cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFileInfo {
    pub size: Option<u64>,
    pub permissions: Option<u32>,
    pub modified: Option<u64>,
    pub is_dir: bool,
}

// ── Path helpers ─────────────────────────────────────────────────────────────

pub fn base_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}

/// Join a remote directory and a file name with exactly one `/` between them.
pub fn join_remote(dir: &str, name: &str) -> String {
    if dir.is_empty() || dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_remote_with_trailing_slash() {
        assert_eq!(join_remote("/upload/", "a.txt"), "/upload/a.txt");
    }

    #[test]
    fn test_join_remote_without_trailing_slash() {
        assert_eq!(join_remote("/upload", "a.txt"), "/upload/a.txt");
    }

    #[test]
    fn test_join_remote_relative_dir() {
        assert_eq!(join_remote("incoming", "a.txt"), "incoming/a.txt");
        assert_eq!(join_remote("", "a.txt"), "a.txt");
    }

    #[test]
    fn test_remote_path_uses_source_base_name() {
        let req = TransferRequest::new("/home/me/build/out/a.txt", "/upload/");
        assert_eq!(req.file_name().as_deref(), Some("a.txt"));
        assert_eq!(req.remote_path().as_deref(), Some("/upload/a.txt"));
    }

    #[test]
    fn test_remote_path_none_without_file_name() {
        let req = TransferRequest::new("/", "/upload/");
        assert!(req.remote_path().is_none());
    }

    #[test]
    fn test_params_debug_redacts_password() {
        let params = ConnectionParams::new("example.com", 22, "deploy", SecretString::new("hunter2".into()));
        let dbg = format!("{:?}", params);
        assert!(dbg.contains("example.com"));
        assert!(!dbg.contains("hunter2"));
        assert_eq!(params.address(), "example.com:22");
    }
}
