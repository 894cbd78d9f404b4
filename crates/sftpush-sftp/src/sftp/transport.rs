// ── SshTransport – dial, handshake, host key, password auth ──────────────────

use crate::sftp::channel::SftpChannel;
use crate::sftp::host_key::{session_fingerprint, AcceptAnyHostKey, HostKeyVerifier};
use crate::sftp::session::{SecureSession, SecureTransport};
use crate::sftp::types::*;
use async_trait::async_trait;
use log::{info, warn};
use secrecy::ExposeSecret;
use sftpush_core::{UploadError, UploadResult};
use ssh2::{ErrorCode, KeyboardInteractivePrompt, Prompt, Session};
use std::net::TcpStream;
use std::time::Duration;
use tokio::net::TcpStream as AsyncTcpStream;

pub struct SshTransport {
    verifier: Box<dyn HostKeyVerifier>,
    connect_timeout: Duration,
}

impl SshTransport {
    pub fn new(verifier: Box<dyn HostKeyVerifier>) -> Self {
        Self {
            verifier,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn verifier_name(&self) -> &'static str {
        self.verifier.name()
    }

    async fn dial(&self, addr: &str) -> UploadResult<TcpStream> {
        let secs = self.connect_timeout.as_secs();
        let async_stream = tokio::time::timeout(self.connect_timeout, AsyncTcpStream::connect(addr))
            .await
            .map_err(|_| {
                UploadError::dial(format!(
                    "Connection timeout after {} seconds - host may be unreachable",
                    secs
                ))
            })?
            .map_err(|e| UploadError::dial(format!("Failed to connect to {}: {}", addr, e)))?;

        let tcp = async_stream
            .into_std()
            .map_err(|e| UploadError::dial(format!("Failed to convert async stream: {}", e)))?;
        tcp.set_nonblocking(false)
            .map_err(|e| UploadError::dial(format!("Failed to set blocking mode: {}", e)))?;
        tcp.set_nodelay(true).ok();

        Ok(tcp)
    }
}

impl Default for SshTransport {
    fn default() -> Self {
        Self::new(Box::new(AcceptAnyHostKey))
    }
}

#[async_trait]
impl SecureTransport for SshTransport {
    type Session = SshSession;

    async fn open(&self, params: ConnectionParams) -> UploadResult<SshSession> {
        let addr = params.address();
        info!("SSH connecting to {}@{}", params.username, addr);

        let tcp = self.dial(&addr).await?;

        let mut session = Session::new()
            .map_err(|e| UploadError::dial(format!("Failed to create SSH session: {}", e)))?;
        session.set_tcp_stream(tcp);

        // Every blocking libssh2 call, the handshake included, is bounded by this
        let io_timeout = self.connect_timeout * 2;
        session.set_timeout(io_timeout.as_millis().min(u32::MAX as u128) as u32);

        session
            .handshake()
            .map_err(|e| UploadError::dial(format!("SSH handshake failed: {}", e)))?;

        let banner = session.banner().map(|b| b.to_string());
        let fingerprint = session_fingerprint(&session);
        if let Some(ref fp) = fingerprint {
            info!("Server host key {}", fp);
        }

        self.verifier.verify(&session, &params.host, params.port)?;

        let auth_method = authenticate(&session, &params)?;
        if !session.authenticated() {
            return Err(UploadError::auth(
                "Authentication failed – not authenticated after auth attempt",
            ));
        }
        info!("SSH authenticated to {} via {}", addr, auth_method);

        let ConnectionParams {
            host,
            port,
            username,
            password,
        } = params;
        drop(password);

        Ok(SshSession {
            session,
            info: SessionInfo {
                host,
                port,
                username,
                auth_method,
                server_banner: banner,
                server_fingerprint: fingerprint,
            },
        })
    }
}

// ── Authentication ───────────────────────────────────────────────────────────

const LIBSSH2_ERROR_SOCKET_SEND: i32 = -7;
const LIBSSH2_ERROR_TIMEOUT: i32 = -9;
const LIBSSH2_ERROR_SOCKET_DISCONNECT: i32 = -13;
const LIBSSH2_ERROR_SOCKET_TIMEOUT: i32 = -30;
const LIBSSH2_ERROR_SOCKET_RECV: i32 = -43;

/// Socket-level failures, as opposed to the server rejecting credentials.
pub(crate) fn is_transport_failure(err: &ssh2::Error) -> bool {
    matches!(
        err.code(),
        ErrorCode::Session(
            LIBSSH2_ERROR_SOCKET_SEND
                | LIBSSH2_ERROR_TIMEOUT
                | LIBSSH2_ERROR_SOCKET_DISCONNECT
                | LIBSSH2_ERROR_SOCKET_TIMEOUT
                | LIBSSH2_ERROR_SOCKET_RECV
        )
    )
}

struct PasswordPrompt<'p> {
    password: &'p str,
}

impl KeyboardInteractivePrompt for PasswordPrompt<'_> {
    fn prompt<'a>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[Prompt<'a>],
    ) -> Vec<String> {
        prompts.iter().map(|_| self.password.to_string()).collect()
    }
}

/// Password first, then keyboard-interactive answering every prompt with
/// the password for servers that only enable the latter.
fn authenticate(session: &Session, params: &ConnectionParams) -> UploadResult<String> {
    let password = params.password.expose_secret();

    let password_err = match session.userauth_password(&params.username, password) {
        Ok(()) if session.authenticated() => return Ok("password".to_string()),
        Ok(()) => "server accepted password request but session is not authenticated".to_string(),
        Err(e) if is_transport_failure(&e) => {
            return Err(UploadError::dial(format!(
                "Connection lost during authentication: {}",
                e
            )))
        }
        Err(e) => e.to_string(),
    };

    let offers_kbd = session
        .auth_methods(&params.username)
        .map(|m| m.split(',').any(|m| m == "keyboard-interactive"))
        .unwrap_or(false);

    if offers_kbd {
        let mut prompt = PasswordPrompt { password };
        if session
            .userauth_keyboard_interactive(&params.username, &mut prompt)
            .is_ok()
            && session.authenticated()
        {
            return Ok("keyboard-interactive".to_string());
        }
        warn!("Keyboard-interactive authentication failed for {}", params.username);
    }

    Err(UploadError::auth(format!(
        "Credentials rejected for user '{}': {}",
        params.username, password_err
    )))
}

// ── SshSession ───────────────────────────────────────────────────────────────

pub struct SshSession {
    session: Session,
    info: SessionInfo,
}

impl SecureSession for SshSession {
    type Transfer<'s> = SftpChannel<'s>;

    fn info(&self) -> &SessionInfo {
        &self.info
    }

    fn open_transfer(&mut self) -> UploadResult<SftpChannel<'_>> {
        let sftp = self.session.sftp().map_err(|e| {
            UploadError::protocol(format!("Failed to open SFTP subsystem: {}", e))
        })?;
        Ok(SftpChannel::new(sftp))
    }

    fn close(self) {
        if let Err(e) = self.session.disconnect(None, "Client disconnecting", None) {
            warn!("SSH disconnect from {}:{} failed: {}", self.info.host, self.info.port, e);
        }
        info!("SSH session to {}:{} closed", self.info.host, self.info.port);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use sftpush_core::UploadErrorKind;
    use std::io::Write;
    use std::net::TcpListener;
    use std::time::Instant;

    fn local_params(port: u16) -> ConnectionParams {
        ConnectionParams::new("127.0.0.1", port, "deploy", SecretString::new("secret".into()))
    }

    /// Runs `open` on the runtime's worker pool so a stuck libssh2 call cannot
    /// stall the test's own timer.
    async fn open_bounded(port: u16, connect_timeout: Duration) -> Option<UploadResult<SshSession>> {
        let transport = SshTransport::default().with_connect_timeout(connect_timeout);
        let task = tokio::spawn(async move { transport.open(local_params(port)).await });
        match tokio::time::timeout(Duration::from_secs(15), task).await {
            Ok(joined) => Some(joined.expect("open task panicked")),
            Err(_) => None,
        }
    }

    fn expect_dial(result: Option<UploadResult<SshSession>>) -> String {
        match result {
            Some(Err(e)) => {
                assert_eq!(e.kind, UploadErrorKind::Dial, "unexpected error: {}", e);
                e.message
            }
            Some(Ok(_)) => panic!("expected a dial error, got a session"),
            None => panic!("open() did not return within the test deadline"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_closed_port_is_dial_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let message = expect_dial(open_bounded(port, Duration::from_secs(2)).await);
        assert!(message.contains("Failed to connect"), "{}", message);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_silent_server_times_out_in_handshake() {
        // The kernel completes the TCP handshake from the backlog; nothing is ever sent.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let started = Instant::now();
        let message = expect_dial(open_bounded(port, Duration::from_secs(1)).await);
        assert!(message.contains("handshake"), "{}", message);
        assert!(started.elapsed() < Duration::from_secs(10));
        drop(listener);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_non_ssh_banner_is_dial_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n");
                let _ = stream.flush();
            }
        });

        let message = expect_dial(open_bounded(port, Duration::from_secs(1)).await);
        assert!(message.contains("handshake"), "{}", message);
        server.join().unwrap();
    }

    #[test]
    fn test_transport_failure_codes() {
        let reset = ssh2::Error::new(ErrorCode::Session(LIBSSH2_ERROR_SOCKET_DISCONNECT), "reset");
        let timeout = ssh2::Error::new(ErrorCode::Session(LIBSSH2_ERROR_TIMEOUT), "timed out");
        let rejected = ssh2::Error::new(ErrorCode::Session(-18), "authentication failed");
        assert!(is_transport_failure(&reset));
        assert!(is_transport_failure(&timeout));
        assert!(!is_transport_failure(&rejected));
    }
}
