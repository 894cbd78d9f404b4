//! Environment configuration for one upload.
//!
//! [`RawConfig`] is read first and printed with credentials redacted, then
//! [`RawConfig::validate`] turns it into an [`UploadConfig`]. No network
//! activity happens until validation has passed.

use secrecy::SecretString;
use sftpush_core::{UploadError, UploadResult};
use sftpush_sftp::sftp::{
    AcceptAnyHostKey, ConnectionParams, FingerprintVerifier, HostKeyVerifier, KnownHostsVerifier,
    TransferRequest,
};
use std::path::PathBuf;
use std::time::Duration;

// ── Variable names ───────────────────────────────────────────────────────────

pub const ENV_HOSTNAME: &str = "hostname";
pub const ENV_USERNAME: &str = "username";
pub const ENV_PASSWORD: &str = "password";
pub const ENV_PORT: &str = "port";
pub const ENV_SOURCE_PATH: &str = "upload_source_path";
pub const ENV_TARGET_PATH: &str = "upload_target_path";

pub const ENV_CONNECT_TIMEOUT: &str = "connect_timeout_secs";
pub const ENV_HOST_KEY_POLICY: &str = "host_key_policy";
pub const ENV_KNOWN_HOSTS_PATH: &str = "known_hosts_path";
pub const ENV_HOST_KEY_FINGERPRINT: &str = "host_key_fingerprint";

fn default_connect_timeout_secs() -> u64 {
    30
}

// ── Raw values ───────────────────────────────────────────────────────────────

/// Values as found in the environment. Empty strings count as missing.
#[derive(Default)]
pub struct RawConfig {
    pub hostname: Option<String>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub port: Option<String>,
    pub upload_source_path: Option<String>,
    pub upload_target_path: Option<String>,
    pub connect_timeout_secs: Option<String>,
    pub host_key_policy: Option<String>,
    pub known_hosts_path: Option<String>,
    pub host_key_fingerprint: Option<String>,
}

impl RawConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            hostname: get(ENV_HOSTNAME),
            username: get(ENV_USERNAME),
            password: get(ENV_PASSWORD).map(SecretString::new),
            port: get(ENV_PORT),
            upload_source_path: get(ENV_SOURCE_PATH),
            upload_target_path: get(ENV_TARGET_PATH),
            connect_timeout_secs: get(ENV_CONNECT_TIMEOUT),
            host_key_policy: get(ENV_HOST_KEY_POLICY),
            known_hosts_path: get(ENV_KNOWN_HOSTS_PATH),
            host_key_fingerprint: get(ENV_HOST_KEY_FINGERPRINT),
        }
    }

    /// Redacted summary lines, credentials shown as `***`.
    pub fn summary_lines(&self) -> Vec<String> {
        let show = |v: &Option<String>| v.clone().unwrap_or_default();
        vec![
            "Configs:".to_string(),
            format!(" - Hostname: {}", show(&self.hostname)),
            format!(" - Port: {}", show(&self.port)),
            " - Username: ***".to_string(),
            " - Password: ***".to_string(),
            format!(" - UploadSourcePath: {}", show(&self.upload_source_path)),
            format!(" - UploadTargetPath: {}", show(&self.upload_target_path)),
            format!(
                " - HostKeyPolicy: {}",
                self.host_key_policy.as_deref().unwrap_or("accept-any")
            ),
        ]
    }

    pub fn log_summary(&self) {
        for line in self.summary_lines() {
            tracing::info!("{}", line);
        }
    }

    pub fn validate(self) -> UploadResult<UploadConfig> {
        let hostname = required(self.hostname, "No Hostname parameter specified!")?;
        let username = required(self.username, "No Username parameter specified!")?;
        let source = required(self.upload_source_path, "No Upload source path specified")?;
        let target = required(self.upload_target_path, "No Upload target path specified")?;
        let port = parse_port(&required(self.port, "No port specified!")?)?;
        let password = self
            .password
            .ok_or_else(|| UploadError::config("No Password parameter specified!"))?;

        let connect_timeout = match self.connect_timeout_secs {
            None => Duration::from_secs(default_connect_timeout_secs()),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(UploadError::config(format!(
                        "Invalid {}: '{}'",
                        ENV_CONNECT_TIMEOUT, raw
                    )))
                }
            },
        };

        let host_key_policy = HostKeyPolicy::parse(
            self.host_key_policy.as_deref(),
            self.known_hosts_path,
            self.host_key_fingerprint,
        )?;

        Ok(UploadConfig {
            hostname,
            port,
            username,
            password,
            upload_source_path: PathBuf::from(source),
            upload_target_path: target,
            connect_timeout,
            host_key_policy,
        })
    }
}

fn required(value: Option<String>, msg: &str) -> UploadResult<String> {
    value.ok_or_else(|| UploadError::config(msg))
}

fn parse_port(raw: &str) -> UploadResult<u16> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(UploadError::config(format!(
            "Invalid port '{}': expected 1-65535",
            raw
        ))),
    }
}

// ── Host-key policy ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyPolicy {
    AcceptAny,
    KnownHosts(PathBuf),
    Fingerprint(String),
}

impl HostKeyPolicy {
    pub fn parse(
        policy: Option<&str>,
        known_hosts_path: Option<String>,
        fingerprint: Option<String>,
    ) -> UploadResult<Self> {
        match policy.map(|p| p.trim().to_ascii_lowercase()).as_deref() {
            None | Some("accept-any") => Ok(HostKeyPolicy::AcceptAny),
            Some("known-hosts") => {
                let path = known_hosts_path
                    .map(PathBuf::from)
                    .or_else(KnownHostsVerifier::default_path)
                    .ok_or_else(|| {
                        UploadError::config(format!(
                            "Cannot locate known_hosts; set {}",
                            ENV_KNOWN_HOSTS_PATH
                        ))
                    })?;
                Ok(HostKeyPolicy::KnownHosts(path))
            }
            Some("fingerprint") => fingerprint
                .map(HostKeyPolicy::Fingerprint)
                .ok_or_else(|| {
                    UploadError::config(format!(
                        "{} is required with host_key_policy=fingerprint",
                        ENV_HOST_KEY_FINGERPRINT
                    ))
                }),
            Some(other) => Err(UploadError::config(format!(
                "Unknown {} '{}': expected accept-any, known-hosts or fingerprint",
                ENV_HOST_KEY_POLICY, other
            ))),
        }
    }

    pub fn verifier(&self) -> Box<dyn HostKeyVerifier> {
        match self {
            HostKeyPolicy::AcceptAny => Box::new(AcceptAnyHostKey),
            HostKeyPolicy::KnownHosts(path) => Box::new(KnownHostsVerifier::new(path.clone())),
            HostKeyPolicy::Fingerprint(fp) => Box::new(FingerprintVerifier::new(fp.clone())),
        }
    }
}

// ── Validated configuration ──────────────────────────────────────────────────

pub struct UploadConfig {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub upload_source_path: PathBuf,
    pub upload_target_path: String,
    pub connect_timeout: Duration,
    pub host_key_policy: HostKeyPolicy,
}

impl UploadConfig {
    /// Split into the connection credentials (consumed by the transport)
    /// and the transfer request.
    pub fn into_parts(self) -> (ConnectionParams, TransferRequest) {
        let request = TransferRequest::new(self.upload_source_path, self.upload_target_path);
        let params = ConnectionParams::new(self.hostname, self.port, self.username, self.password);
        (params, request)
    }
}
