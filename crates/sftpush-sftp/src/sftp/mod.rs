// ── sftpush-sftp / sftp module ────────────────────────────────────────────────
//
//   • `session`   – capability traits the pipeline is written against
//   • `transport` – libssh2 session: dial, handshake, host key, password auth
//   • `channel`   – libssh2 SFTP subsystem: stat, create, write
//   • `host_key`  – accept-any / known_hosts / pinned-fingerprint policies
//   • `upload`    – the connect → probe → write → release pipeline

pub mod types;
pub mod session;
pub mod host_key;
pub mod transport;
pub mod channel;
pub mod upload;

pub use types::*;
pub use session::{SecureSession, SecureTransport, TransferSession};
pub use host_key::{AcceptAnyHostKey, FingerprintVerifier, HostKeyVerifier, KnownHostsVerifier};
pub use transport::{SshSession, SshTransport};
pub use channel::SftpChannel;
pub use upload::{upload, UploadOutcome};
