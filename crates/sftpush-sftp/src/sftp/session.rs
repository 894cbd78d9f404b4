// ── Capability traits ────────────────────────────────────────────────────────
//
// The pipeline in `upload.rs` only talks to these traits. `transport.rs` and
// `channel.rs` implement them over libssh2; tests implement them in memory.
//
// Ownership encodes the lifecycle: `close` consumes the handle so it runs at
// most once, and a transfer session borrows its secure session so it cannot
// outlive it.

use crate::sftp::types::{ConnectionParams, RemoteFileInfo, SessionInfo};
use async_trait::async_trait;
use sftpush_core::{UploadError, UploadResult};
use std::io::Write;

/// Opens authenticated, encrypted sessions.
#[async_trait]
pub trait SecureTransport {
    type Session: SecureSession;

    /// Dial, verify the host, and authenticate. Never returns a session that
    /// is not fully authenticated.
    async fn open(&self, params: ConnectionParams) -> UploadResult<Self::Session>;
}

/// An open, authenticated transport session.
pub trait SecureSession {
    type Transfer<'s>: TransferSession
    where
        Self: 's;

    fn info(&self) -> &SessionInfo;

    /// Start the file-transfer subsystem on this session.
    fn open_transfer(&mut self) -> UploadResult<Self::Transfer<'_>>;

    fn close(self);
}

/// Remote filesystem primitives over an open secure session.
pub trait TransferSession {
    type File: Write;

    /// Canonical remote working directory.
    fn working_dir(&mut self) -> UploadResult<String>;

    /// Returns a `NotFound` error when the path does not exist.
    fn stat_file(&mut self, path: &str) -> UploadResult<RemoteFileInfo>;

    /// Create or truncate `path` for writing.
    fn create_file(&mut self, path: &str) -> UploadResult<Self::File>;

    /// Write the whole payload. A short write is an error.
    fn write(&mut self, file: &mut Self::File, bytes: &[u8]) -> UploadResult<u64> {
        file.write_all(bytes)
            .map_err(|e| UploadError::write(format!("Write error: {}", e)))?;
        file.flush()
            .map_err(|e| UploadError::write(format!("Flush error: {}", e)))?;
        Ok(bytes.len() as u64)
    }

    /// Close the remote file handle, surfacing errors the server only
    /// reports at close time.
    fn finish(&mut self, file: Self::File) -> UploadResult<()>;

    fn close(self);
}
