//! crates/attendance_core/src/ports.rs
//!
//! Defines the service contracts (traits) the attendance core depends on.
//! These traits form the boundary of the hexagonal architecture: the device
//! sensors, the clock and the remote backend are all reached through them.

use async_trait::async_trait;
use chrono::NaiveTime;
use futures::Stream;
use std::pin::Pin;

use crate::domain::{
    AttendanceHistory, AttendanceRecord, AttendanceSubmission, Branch, EarlyDepartureRequest,
    LeaveRequest, PendingUser, Photo, PositionSample, RecapFilter, Registration,
    ApprovalDecision, Session, SubmissionReceipt, TodayStatus,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., HTTP, devices).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The session token is missing, invalid or expired.
    #[error("Unauthorized")]
    Unauthorized,
    /// The backend answered with a failure and a human-readable message.
    #[error("{0}")]
    Rejected(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Device Ports
//=========================================================================================

/// Why the location sensor stopped producing samples.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorFault {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

pub type PositionStream = Pin<Box<dyn Stream<Item = Result<PositionSample, SensorFault>> + Send>>;

#[async_trait]
pub trait LocationSensor: Send + Sync {
    /// Subscribes to continuous position updates. Dropping the stream unsubscribes.
    async fn watch(&self) -> PortResult<PositionStream>;
}

/// An open camera. Must be stopped when the capture step ends.
#[async_trait]
pub trait CameraStream: Send {
    async fn capture(&mut self) -> PortResult<Photo>;
    fn stop(&mut self);
}

#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Opens the front camera; fails if permission is denied or no device exists.
    async fn open(&self) -> PortResult<Box<dyn CameraStream>>;
}

/// The device's local wall clock. Office hours are local, never UTC.
pub trait Clock: Send + Sync {
    fn local_time(&self) -> NaiveTime;
}

//=========================================================================================
// Backend Ports
//=========================================================================================

#[async_trait]
pub trait AttendanceBackend: Send + Sync {
    // --- Accounts ---
    async fn login(&self, email: &str, password: &str) -> PortResult<Session>;

    async fn register(&self, registration: &Registration) -> PortResult<()>;

    async fn list_branches(&self) -> PortResult<Vec<Branch>>;

    // --- Attendance ---
    async fn today_status(&self, session: &Session) -> PortResult<TodayStatus>;

    async fn submit_attendance(
        &self,
        session: &Session,
        submission: &AttendanceSubmission,
    ) -> PortResult<SubmissionReceipt>;

    async fn history(&self, session: &Session, month: u32, year: i32)
        -> PortResult<AttendanceHistory>;

    // --- Leave ---
    async fn submit_leave(&self, session: &Session, request: &LeaveRequest) -> PortResult<()>;
}

#[async_trait]
pub trait AdminBackend: Send + Sync {
    async fn pending_users(&self, session: &Session) -> PortResult<Vec<PendingUser>>;

    async fn activate_user(&self, session: &Session, user_id: u64, as_admin: bool)
        -> PortResult<()>;

    async fn pending_early_departures(
        &self,
        session: &Session,
    ) -> PortResult<Vec<EarlyDepartureRequest>>;

    async fn decide_early_departure(
        &self,
        session: &Session,
        request_id: u64,
        decision: ApprovalDecision,
    ) -> PortResult<()>;

    async fn recap(&self, session: &Session, filter: &RecapFilter)
        -> PortResult<Vec<AttendanceRecord>>;

    /// Downloads the monthly spreadsheet export as raw bytes.
    async fn export_recap(&self, session: &Session, month: u32, year: i32) -> PortResult<Vec<u8>>;
}
