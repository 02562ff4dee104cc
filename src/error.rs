//! Error types for the wireless-link supervisor.
//!
//! This module defines all error types that can occur while supervising
//! the wireless module, including transport, board, configuration, and
//! mailbox errors.

use thiserror::Error;

/// Main error type for the link supervisor.
#[derive(Error, Debug)]
pub enum LinkError {
   #[error("I/O error: {0}")]
   Io(#[from] std::io::Error),

   #[error("Transport rejected {op} request")]
   Transport { op: &'static str },

   #[error("Board rejected {op} request")]
   Board { op: &'static str },

   #[error("Module firmware version unavailable")]
   VersionUnavailable,

   #[error("Worker has been shut down")]
   WorkerShutdown,

   #[error("Worker mailbox is full")]
   MailboxFull,

   #[error("Could not determine config directory")]
   ConfigDirNotFound,

   #[error("TOML parsing error: {0}")]
   TomlParse(#[from] toml::de::Error),

   #[error("TOML serialization error: {0}")]
   TomlSerialize(#[from] toml::ser::Error),
}

/// Convenience type alias for Results with `LinkError`.
pub type Result<T> = std::result::Result<T, LinkError>;
