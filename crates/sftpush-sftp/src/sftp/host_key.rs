// ── Host-key verification policies ───────────────────────────────────────────

use base64::Engine;
use log::{debug, warn};
use sftpush_core::{UploadError, UploadResult};
use ssh2::{CheckResult, HashType, KnownHostFileKind, Session};
use std::path::PathBuf;

/// Decides whether the server behind a freshly handshaken session is trusted.
/// Runs after the key exchange and before any credential is sent.
pub trait HostKeyVerifier: Send + Sync {
    fn name(&self) -> &'static str;

    fn verify(&self, session: &Session, host: &str, port: u16) -> UploadResult<()>;
}

/// `SHA256:<base64>` fingerprint of the negotiated host key, as OpenSSH prints it.
pub fn session_fingerprint(session: &Session) -> Option<String> {
    session.host_key_hash(HashType::Sha256).map(format_fingerprint)
}

pub fn format_fingerprint(hash: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD_NO_PAD.encode(hash);
    format!("SHA256:{}", encoded)
}

/// Compare two fingerprints, tolerating a missing `SHA256:` prefix and
/// base64 padding on either side.
pub fn fingerprints_match(expected: &str, actual: &str) -> bool {
    fn normalise(s: &str) -> &str {
        let s = s.trim();
        let s = s.strip_prefix("SHA256:").unwrap_or(s);
        s.trim_end_matches('=')
    }
    let expected = normalise(expected);
    !expected.is_empty() && expected == normalise(actual)
}

// ── Accept any ───────────────────────────────────────────────────────────────

/// Trusts every server. Matches the behaviour of the original deployment
/// step; logs a warning on each connection.
#[derive(Debug, Default, Clone)]
pub struct AcceptAnyHostKey;

impl HostKeyVerifier for AcceptAnyHostKey {
    fn name(&self) -> &'static str {
        "accept-any"
    }

    fn verify(&self, session: &Session, host: &str, port: u16) -> UploadResult<()> {
        warn!(
            "Host key for {}:{} accepted without verification ({})",
            host,
            port,
            session_fingerprint(session).unwrap_or_else(|| "no fingerprint".into())
        );
        Ok(())
    }
}

// ── known_hosts ──────────────────────────────────────────────────────────────

/// Checks the server key against an OpenSSH `known_hosts` file. Unknown and
/// mismatched keys are both rejected.
#[derive(Debug, Clone)]
pub struct KnownHostsVerifier {
    pub path: PathBuf,
}

impl KnownHostsVerifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.ssh/known_hosts` of the current user.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".ssh").join("known_hosts"))
    }
}

impl HostKeyVerifier for KnownHostsVerifier {
    fn name(&self) -> &'static str {
        "known-hosts"
    }

    fn verify(&self, session: &Session, host: &str, port: u16) -> UploadResult<()> {
        let (key, _key_type) = session
            .host_key()
            .ok_or_else(|| UploadError::host_key("Server did not provide a host key"))?;

        let mut known_hosts = session
            .known_hosts()
            .map_err(|e| UploadError::host_key(format!("Failed to initialise known-hosts store: {}", e)))?;

        known_hosts
            .read_file(&self.path, KnownHostFileKind::OpenSSH)
            .map_err(|e| {
                UploadError::host_key(format!("Failed to read known_hosts: {}", e))
                    .with_path(self.path.to_string_lossy().to_string())
            })?;

        let fingerprint = session_fingerprint(session).unwrap_or_default();
        match known_hosts.check_port(host, port, key) {
            CheckResult::Match => {
                debug!("Host key for {}:{} matches known_hosts", host, port);
                Ok(())
            }
            CheckResult::Mismatch => Err(UploadError::host_key(format!(
                "Host key for {}:{} does not match known_hosts (server sent {})",
                host, port, fingerprint
            ))),
            CheckResult::NotFound => Err(UploadError::host_key(format!(
                "Host {}:{} is not in known_hosts (server sent {})",
                host, port, fingerprint
            ))),
            CheckResult::Failure => Err(UploadError::host_key(format!(
                "known_hosts check failed for {}:{}",
                host, port
            ))),
        }
    }
}

// ── Pinned fingerprint ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FingerprintVerifier {
    pub expected: String,
}

impl FingerprintVerifier {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }

    fn check(&self, actual: Option<&str>, host: &str, port: u16) -> UploadResult<()> {
        let actual = actual
            .ok_or_else(|| UploadError::host_key("Server did not provide a host key"))?;
        if fingerprints_match(&self.expected, actual) {
            Ok(())
        } else {
            Err(UploadError::host_key(format!(
                "Host key for {}:{} is {}, expected {}",
                host, port, actual, self.expected
            )))
        }
    }
}

impl HostKeyVerifier for FingerprintVerifier {
    fn name(&self) -> &'static str {
        "fingerprint"
    }

    fn verify(&self, session: &Session, host: &str, port: u16) -> UploadResult<()> {
        let actual = session_fingerprint(session);
        self.check(actual.as_deref(), host, port)
    }
}
