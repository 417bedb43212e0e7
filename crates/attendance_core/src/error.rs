//! crates/attendance_core/src/error.rs
//!
//! The error taxonomy of the attendance gate. Every variant maps to a
//! user-visible, retryable state; none of them should ever crash a flow.

use crate::domain::AttendanceAction;

/// Errors raised by the gate, the submission checks and the flow state machine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttendanceError {
    /// Location or camera permission was denied, or the device has no such sensor.
    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    /// The latest position is outside the reference site's radius.
    #[error("Outside the allowed area ({distance_meters}m from the office)")]
    OutOfRange { distance_meters: u64 },

    /// No selfie has been captured yet.
    #[error("A selfie must be captured before submitting")]
    MissingCapture,

    /// The action is late or early and the justification is blank.
    #[error("A reason is required for a {0}")]
    MissingJustification(AttendanceAction),

    /// The backend refused or failed the submission.
    #[error("Submission rejected: {message}")]
    SubmissionRejected { message: String },

    #[error("Invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("Invalid cutoff time: {0}")]
    InvalidCutoff(String),

    /// An operation was attempted in a flow step that does not allow it.
    #[error("Cannot {operation} while the flow is {step}")]
    InvalidStep {
        operation: &'static str,
        step: &'static str,
    },

    #[error("Attachment is {size} bytes, the limit is {limit} bytes")]
    AttachmentTooLarge { size: usize, limit: usize },

    #[error("A leave request needs a kind (sick, permission or duty)")]
    MissingLeaveKind,
}

impl AttendanceError {
    /// True for failures the user can fix locally without touching the network.
    pub fn is_local_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingCapture
                | Self::MissingJustification(_)
                | Self::AttachmentTooLarge { .. }
                | Self::MissingLeaveKind
        )
    }
}

/// A convenience type alias for `Result<T, AttendanceError>`.
pub type AttendanceResult<T> = Result<T, AttendanceError>;
