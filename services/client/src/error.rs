//! services/client/src/error.rs
//!
//! The error type returned by the client library and the `attendance` binary.

use crate::config::ConfigError;
use attendance_core::error::AttendanceError;
use attendance_core::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The environment could not be turned into a `Config`.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A backend or device port failed outside of a flow step.
    #[error("Backend error: {0}")]
    Port(#[from] PortError),

    /// A gate, validation or flow error from the attendance core.
    #[error("{0}")]
    Attendance(#[from] AttendanceError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading a photo or attachment, or writing an export.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}
