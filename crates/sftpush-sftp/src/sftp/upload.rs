// ── Upload pipeline – connect → open SFTP → read → probe → write → release ────

use crate::sftp::session::{SecureSession, SecureTransport, TransferSession};
use crate::sftp::types::*;
use log::{info, warn};
use sftpush_core::{StepStatus, UploadError, UploadReport, UploadResult};
use sha2::{Digest, Sha256};
use std::time::Instant;

pub const STEP_CONNECT: &str = "connect";
pub const STEP_OPEN_SFTP: &str = "open-sftp";
pub const STEP_WORKING_DIR: &str = "working-dir";
pub const STEP_READ_SOURCE: &str = "read-source";
pub const STEP_PROBE: &str = "probe";
pub const STEP_CREATE: &str = "create";
pub const STEP_WRITE: &str = "write";
pub const STEP_VERIFY: &str = "verify";
pub const STEP_RELEASE: &str = "release";

/// Result of one upload together with its step report. The report is
/// filled in on failure as well.
#[derive(Debug)]
pub struct UploadOutcome {
    pub report: UploadReport,
    /// Bytes written on success.
    pub result: UploadResult<u64>,
}

/// Upload `request.source_path` into `request.target_directory` on the host
/// described by `params`.
///
/// Every session opened along the way is closed exactly once before this
/// returns, the transfer session first, whatever step failed.
pub async fn upload<T: SecureTransport>(
    transport: &T,
    params: ConnectionParams,
    request: &TransferRequest,
) -> UploadOutcome {
    let mut report = UploadReport::new(params.host.clone(), params.port);
    report.remote_path = request.remote_path();

    let result = run(transport, params, request, &mut report).await;
    report.finish();

    match &result {
        Ok(_) => info!("{}", report.summary()),
        Err(_) => warn!("{}", report.summary()),
    }
    log::debug!("upload report: {}", report.to_json());

    UploadOutcome { report, result }
}

async fn run<T: SecureTransport>(
    transport: &T,
    params: ConnectionParams,
    request: &TransferRequest,
    report: &mut UploadReport,
) -> UploadResult<u64> {
    let t = Instant::now();
    let mut session = match transport.open(params).await {
        Ok(session) => {
            let si = session.info();
            let msg = format!(
                "authenticated as {} via {} to {}:{}",
                si.username, si.auth_method, si.host, si.port
            );
            report.record(STEP_CONNECT, StepStatus::Pass, msg, t);
            session
        }
        Err(e) => {
            report.record(STEP_CONNECT, StepStatus::Fail, e.to_string(), t);
            return Err(e);
        }
    };

    let result = with_session(&mut session, request, report);

    let t = Instant::now();
    session.close();
    report.record(STEP_RELEASE, StepStatus::Pass, "sessions released", t);

    result
}

fn with_session<S: SecureSession>(
    session: &mut S,
    request: &TransferRequest,
    report: &mut UploadReport,
) -> UploadResult<u64> {
    let t = Instant::now();
    let mut transfer = match session.open_transfer() {
        Ok(transfer) => {
            report.record(STEP_OPEN_SFTP, StepStatus::Pass, "SFTP subsystem available", t);
            transfer
        }
        Err(e) => {
            report.record(STEP_OPEN_SFTP, StepStatus::Fail, e.to_string(), t);
            return Err(e);
        }
    };

    let result = transfer_file(&mut transfer, request, report);
    transfer.close();
    result
}

fn transfer_file<X: TransferSession>(
    transfer: &mut X,
    request: &TransferRequest,
    report: &mut UploadReport,
) -> UploadResult<u64> {
    // Working directory (informational)
    let t = Instant::now();
    match transfer.working_dir() {
        Ok(wd) => {
            info!("wd: {}", wd);
            report.record(STEP_WORKING_DIR, StepStatus::Info, wd, t);
        }
        Err(e) => {
            warn!("Could not resolve remote working directory: {}", e);
            report.record(STEP_WORKING_DIR, StepStatus::Skip, e.to_string(), t);
        }
    }

    // Local source
    let t = Instant::now();
    let data = match read_source(request) {
        Ok(data) => {
            report.record(
                STEP_READ_SOURCE,
                StepStatus::Pass,
                format!("{} bytes", data.len()),
                t,
            );
            data
        }
        Err(e) => {
            report.record(STEP_READ_SOURCE, StepStatus::Fail, e.to_string(), t);
            return Err(e);
        }
    };
    let remote_path = request
        .remote_path()
        .ok_or_else(|| UploadError::read("Source path has no file name"))?;

    // Existence probe: never changes what happens next
    let t = Instant::now();
    let probe_msg = match transfer.stat_file(&remote_path) {
        Ok(existing) => {
            warn!(
                "file already there ! {} ({} bytes) will be overwritten",
                remote_path,
                existing.size.map(|s| s.to_string()).unwrap_or_else(|| "?".into())
            );
            "present, will be overwritten".to_string()
        }
        Err(e) if !e.is_fatal() => {
            info!("{} not present on remote", remote_path);
            "not present".to_string()
        }
        Err(e) => {
            warn!("Existence probe for {} failed: {}", remote_path, e);
            format!("probe failed: {}", e.message)
        }
    };
    report.record(STEP_PROBE, StepStatus::Info, probe_msg, t);

    // Create + write
    info!("target file: {}", remote_path);
    let t = Instant::now();
    let mut file = match transfer.create_file(&remote_path) {
        Ok(file) => {
            report.record(STEP_CREATE, StepStatus::Pass, remote_path.clone(), t);
            file
        }
        Err(e) => {
            report.record(STEP_CREATE, StepStatus::Fail, e.to_string(), t);
            return Err(e);
        }
    };

    let t = Instant::now();
    let written = match transfer.write(&mut file, &data) {
        Ok(n) if n == data.len() as u64 => n,
        Ok(n) => {
            let e = UploadError::write(format!("Short write: {} of {} bytes", n, data.len()))
                .with_path(remote_path.as_str());
            report.record(STEP_WRITE, StepStatus::Fail, e.to_string(), t);
            return Err(e);
        }
        Err(e) => {
            let e = e.with_path(remote_path.as_str());
            report.record(STEP_WRITE, StepStatus::Fail, e.to_string(), t);
            return Err(e);
        }
    };
    if let Err(e) = transfer.finish(file) {
        let e = e.with_path(remote_path.as_str());
        report.record(STEP_WRITE, StepStatus::Fail, e.to_string(), t);
        return Err(e);
    }

    let digest = hex::encode(Sha256::digest(&data));
    info!("wrote {} bytes to {} (sha256 {})", written, remote_path, digest);
    report.record(
        STEP_WRITE,
        StepStatus::Pass,
        format!("{} bytes, sha256 {}", written, digest),
        t,
    );
    report.bytes_written = written;

    // Read back the size the server reports
    let t = Instant::now();
    match transfer.stat_file(&remote_path) {
        Ok(stat) => match stat.size {
            Some(size) if size != written => {
                let e = UploadError::write(format!(
                    "Remote size {} does not match {} bytes written",
                    size, written
                ))
                .with_path(remote_path.as_str());
                report.record(STEP_VERIFY, StepStatus::Fail, e.to_string(), t);
                return Err(e);
            }
            Some(size) => report.record(STEP_VERIFY, StepStatus::Pass, format!("{} bytes on remote", size), t),
            None => report.record(STEP_VERIFY, StepStatus::Skip, "server did not report a size", t),
        },
        Err(e) => {
            warn!("Could not stat {} after upload: {}", remote_path, e);
            report.record(STEP_VERIFY, StepStatus::Skip, e.to_string(), t);
        }
    }

    Ok(written)
}

fn read_source(request: &TransferRequest) -> UploadResult<Vec<u8>> {
    let path = &request.source_path;
    let display = path.to_string_lossy().to_string();

    let metadata = std::fs::metadata(path).map_err(|e| {
        UploadError::read(format!("Cannot read local file: {}", e)).with_path(display.as_str())
    })?;
    if !metadata.is_file() {
        return Err(UploadError::read("Source is not a regular file").with_path(display));
    }

    std::fs::read(path).map_err(|e| {
        UploadError::read(format!("Error reading file: {}", e)).with_path(display.as_str())
    })
}
