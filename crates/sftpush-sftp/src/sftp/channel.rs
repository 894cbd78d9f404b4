// ── SftpChannel – remote filesystem primitives over libssh2 ──────────────────

use crate::sftp::session::TransferSession;
use crate::sftp::types::{RemoteFileInfo, REMOTE_FILE_MODE};
use log::{debug, warn};
use sftpush_core::{UploadError, UploadResult};
use ssh2::{ErrorCode, OpenFlags, OpenType, Sftp};
use std::marker::PhantomData;
use std::path::Path;

/// `SSH_FX_NO_SUCH_FILE` from the SFTP status codes.
const SFTP_NO_SUCH_FILE: i32 = 2;

/// SFTP subsystem handle. Borrows the SSH session it was opened on, so it
/// is closed before that session can be.
pub struct SftpChannel<'s> {
    sftp: Sftp,
    _session: PhantomData<&'s mut ()>,
}

impl<'s> SftpChannel<'s> {
    pub(crate) fn new(sftp: Sftp) -> Self {
        Self {
            sftp,
            _session: PhantomData,
        }
    }
}

pub(crate) fn is_not_found(err: &ssh2::Error) -> bool {
    matches!(err.code(), ErrorCode::SFTP(SFTP_NO_SUCH_FILE))
}

pub(crate) fn stat_to_info(stat: &ssh2::FileStat) -> RemoteFileInfo {
    RemoteFileInfo {
        size: stat.size,
        permissions: stat.perm,
        modified: stat.mtime,
        is_dir: stat.is_dir(),
    }
}

impl TransferSession for SftpChannel<'_> {
    type File = ssh2::File;

    fn working_dir(&mut self) -> UploadResult<String> {
        self.sftp
            .realpath(Path::new("."))
            .map(|p| p.to_string_lossy().to_string())
            .map_err(|e| UploadError::protocol(format!("realpath(\".\") failed: {}", e)))
    }

    fn stat_file(&mut self, path: &str) -> UploadResult<RemoteFileInfo> {
        match self.sftp.stat(Path::new(path)) {
            Ok(stat) => Ok(stat_to_info(&stat)),
            Err(e) if is_not_found(&e) => Err(UploadError::not_found(path)),
            Err(e) => Err(UploadError::protocol(format!("stat failed: {}", e)).with_path(path)),
        }
    }

    fn create_file(&mut self, path: &str) -> UploadResult<ssh2::File> {
        debug!("Creating remote file {}", path);
        self.sftp
            .open_mode(
                Path::new(path),
                OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
                REMOTE_FILE_MODE,
                OpenType::File,
            )
            .map_err(|e| {
                UploadError::create(format!("Failed to create remote file: {}", e)).with_path(path)
            })
    }

    fn finish(&mut self, mut file: ssh2::File) -> UploadResult<()> {
        file.close()
            .map_err(|e| UploadError::write(format!("Failed to close remote file: {}", e)))
    }

    fn close(mut self) {
        if let Err(e) = self.sftp.shutdown() {
            warn!("SFTP channel shutdown failed: {}", e);
        }
        debug!("SFTP channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_code_detection() {
        let missing = ssh2::Error::new(ErrorCode::SFTP(SFTP_NO_SUCH_FILE), "no such file");
        let denied = ssh2::Error::new(ErrorCode::SFTP(3), "permission denied");
        assert!(is_not_found(&missing));
        assert!(!is_not_found(&denied));
    }

    #[test]
    fn test_stat_to_info() {
        let stat = ssh2::FileStat {
            size: Some(5),
            uid: None,
            gid: None,
            perm: Some(0o100644),
            atime: None,
            mtime: Some(1_700_000_000),
        };
        let info = stat_to_info(&stat);
        assert_eq!(info.size, Some(5));
        assert_eq!(info.modified, Some(1_700_000_000));
        assert!(!info.is_dir);
    }
}
