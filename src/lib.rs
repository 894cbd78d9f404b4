pub mod config;
pub mod logging;

use config::RawConfig;
use sftpush_sftp::sftp::{upload, SshTransport, UploadOutcome};

/// Validate `raw`, run the upload, and return the process exit code.
/// Configuration errors are reported before any network call.
pub async fn run(raw: RawConfig) -> i32 {
    raw.log_summary();

    let config = match raw.validate() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Issue with input: {}", e);
            return e.exit_code();
        }
    };

    match upload_with(config).await.result {
        Ok(_) => 0,
        Err(e) => {
            tracing::error!("Upload failed: {}", e);
            e.exit_code()
        }
    }
}

/// Run one upload over the libssh2 transport using `config`.
pub async fn upload_with(config: config::UploadConfig) -> UploadOutcome {
    let transport = SshTransport::new(config.host_key_policy.verifier())
        .with_connect_timeout(config.connect_timeout);
    tracing::info!("Host key policy: {}", transport.verifier_name());
    let (params, request) = config.into_parts();
    upload(&transport, params, &request).await
}

