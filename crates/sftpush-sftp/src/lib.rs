//! # sftpush – SFTP
//!
//! Single-file SFTP upload over a password-authenticated SSH session:
//!   • SSH transport with pluggable host-key verification
//!   • SFTP channel exposing stat / create / write
//!   • Upload pipeline with guaranteed session release on every exit path

pub mod sftp;
