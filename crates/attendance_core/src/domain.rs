//! crates/attendance_core/src/domain.rs
//!
//! Defines the pure, core data structures for the attendance client.
//! These structs are independent of any transport or serialization format;
//! the HTTP adapter owns its own wire records and converts into these.

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::fmt;

use crate::error::{AttendanceError, AttendanceResult};

//=========================================================================================
// Geography
//=========================================================================================

/// A latitude/longitude pair in decimal degrees (WGS-84).
///
/// Out-of-range or non-finite values are rejected at construction, so every
/// `GeoPoint` in the system is a valid input to the distance evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> AttendanceResult<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(AttendanceError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// An office location plus the radius inside which attendance is allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSite {
    pub name: String,
    pub point: GeoPoint,
    pub radius_meters: f64,
}

impl ReferenceSite {
    pub fn new(name: impl Into<String>, point: GeoPoint, radius_meters: f64) -> Self {
        Self {
            name: name.into(),
            point,
            radius_meters,
        }
    }
}

/// One reading from the device location sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub point: GeoPoint,
    pub accuracy_meters: f64,
    pub captured_at: DateTime<Utc>,
}

/// The outcome of comparing a sample against a reference site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EligibilityResult {
    /// Unrounded great-circle distance; used for the range comparison.
    pub distance_meters: f64,
    pub within_range: bool,
}

impl EligibilityResult {
    /// The distance rounded to the nearest whole meter, for display only.
    pub fn display_meters(&self) -> u64 {
        self.distance_meters.round() as u64
    }
}

//=========================================================================================
// Attendance actions and submissions
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttendanceAction {
    CheckIn,
    CheckOut,
}

impl fmt::Display for AttendanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckIn => f.write_str("late check-in"),
            Self::CheckOut => f.write_str("early check-out"),
        }
    }
}

/// How the submission time compares with the configured cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeClassification {
    OnTime,
    /// Check-in after the lateness cutoff.
    Late,
    /// Check-out before the early-departure cutoff.
    EarlyDeparture,
}

impl TimeClassification {
    pub fn requires_justification(&self) -> bool {
        !matches!(self, Self::OnTime)
    }
}

/// A captured selfie. The bytes are opaque to this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub content_type: String,
    pub data: Bytes,
}

impl Photo {
    pub fn jpeg(data: impl Into<Bytes>) -> Self {
        Self {
            content_type: "image/jpeg".to_string(),
            data: data.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The payload dispatched to the backend, exactly once per flow.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceSubmission {
    pub action: AttendanceAction,
    pub photo: Photo,
    pub position: GeoPoint,
    pub accuracy_meters: f64,
    pub classification: TimeClassification,
    /// Trimmed justification; `None` when the user left it blank.
    pub justification: Option<String>,
}

/// What the backend answered to an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub message: Option<String>,
}

//=========================================================================================
// Session
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Employee,
    Admin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub job_title: Option<String>,
}

/// An authenticated session, supplied explicitly to every backend call.
#[derive(Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: Option<UserProfile>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role == Role::Admin)
    }
}

// The token is a credential; keep it out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Self-service sign-up; the account stays pending until an admin activates it.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub job_title: String,
    pub phone: String,
    pub branch_id: u64,
    pub password: String,
}

//=========================================================================================
// Branches, records and statistics
//=========================================================================================

/// An office branch as known by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub id: u64,
    pub name: String,
    pub location: Option<GeoPoint>,
    pub radius_meters: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendanceStatus {
    Present,
    Late,
    Leave,
    Sick,
    Duty,
    Absent,
    Other(String),
}

impl AttendanceStatus {
    pub fn from_code(code: &str) -> Self {
        match code {
            "hadir" => Self::Present,
            "telat" => Self::Late,
            "izin" => Self::Leave,
            "sakit" => Self::Sick,
            "dinas" => Self::Duty,
            "alpha" => Self::Absent,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "pending" => Some(Self::Pending),
            "disetujui" => Some(Self::Approved),
            "ditolak" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// The admin's answer to an early-departure request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

impl ApprovalDecision {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Approve => "disetujui",
            Self::Reject => "ditolak",
        }
    }
}

/// The employee a record or request belongs to, as shown in admin lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeSummary {
    pub name: String,
    pub job_title: Option<String>,
    pub branch_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub id: Option<u64>,
    pub date: Option<NaiveDate>,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    pub status: AttendanceStatus,
    pub early_departure: Option<ApprovalStatus>,
    pub employee: Option<EmployeeSummary>,
}

/// What the employee is allowed to do next today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    CheckIn,
    CheckOut,
    AwaitingApproval,
    Done,
}

impl NextAction {
    /// Whether `action` may be started today.
    pub fn allows(&self, action: AttendanceAction) -> bool {
        matches!(
            (self, action),
            (Self::CheckIn, AttendanceAction::CheckIn)
                | (Self::CheckOut, AttendanceAction::CheckOut)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TodayStatus {
    pub record: Option<AttendanceRecord>,
    pub branch: Option<Branch>,
}

impl TodayStatus {
    pub fn next_action(&self) -> NextAction {
        match &self.record {
            None => NextAction::CheckIn,
            Some(r) if r.check_out.is_some() => NextAction::Done,
            Some(r) if r.early_departure == Some(ApprovalStatus::Pending) => {
                NextAction::AwaitingApproval
            }
            Some(_) => NextAction::CheckOut,
        }
    }
}

/// Monthly counters as reported by the backend. Missing counters are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceStats {
    pub on_time: u32,
    pub late: u32,
    pub leave: u32,
    pub absent: u32,
}

impl AttendanceStats {
    /// Days the employee showed up at all: on time plus late.
    pub fn present(&self) -> u32 {
        self.on_time + self.late
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceHistory {
    pub records: Vec<AttendanceRecord>,
    pub stats: AttendanceStats,
}

//=========================================================================================
// Leave requests
//=========================================================================================

/// Attachments above this size are refused before upload.
pub const MAX_ATTACHMENT_BYTES: usize = 2_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveKind {
    Sick,
    Permission,
    Duty,
}

impl LeaveKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sick => "sakit",
            Self::Permission => "izin",
            Self::Duty => "dinas",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaveRequest {
    pub kind: LeaveKind,
    pub date: NaiveDate,
    pub description: String,
    pub attachment: Option<Attachment>,
}

impl LeaveRequest {
    /// Builds a request, refusing a missing kind or an oversized attachment.
    pub fn new(
        kind: Option<LeaveKind>,
        date: NaiveDate,
        description: impl Into<String>,
        attachment: Option<Attachment>,
    ) -> AttendanceResult<Self> {
        let kind = kind.ok_or(AttendanceError::MissingLeaveKind)?;
        if let Some(a) = &attachment {
            if a.data.len() > MAX_ATTACHMENT_BYTES {
                return Err(AttendanceError::AttachmentTooLarge {
                    size: a.data.len(),
                    limit: MAX_ATTACHMENT_BYTES,
                });
            }
        }
        Ok(Self {
            kind,
            date,
            description: description.into(),
            attachment,
        })
    }
}

//=========================================================================================
// Administration
//=========================================================================================

/// A registered account waiting for activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUser {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub job_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EarlyDepartureRequest {
    pub id: u64,
    pub employee: Option<EmployeeSummary>,
    pub check_in: Option<NaiveTime>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecapFilter {
    pub month: u32,
    pub year: i32,
    pub status: Option<String>,
    pub date: Option<NaiveDate>,
}
