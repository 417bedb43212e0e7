//! crates/attendance_core/src/submission.rs
//!
//! The last local check before a submission may leave the device.

use crate::domain::{
    AttendanceAction, AttendanceSubmission, Photo, PositionSample, TimeClassification,
};
use crate::error::{AttendanceError, AttendanceResult};

/// Validates the captured data and builds the outbound payload.
///
/// Checks run in order: the photo must be present and non-empty, then a
/// late or early action needs a justification that is not blank once trimmed.
pub fn prepare_submission(
    action: AttendanceAction,
    photo: Option<&Photo>,
    sample: &PositionSample,
    classification: TimeClassification,
    justification: &str,
) -> AttendanceResult<AttendanceSubmission> {
    let photo = match photo {
        Some(p) if !p.is_empty() => p.clone(),
        _ => return Err(AttendanceError::MissingCapture),
    };

    let trimmed = justification.trim();
    if classification.requires_justification() && trimmed.is_empty() {
        return Err(AttendanceError::MissingJustification(action));
    }

    Ok(AttendanceSubmission {
        action,
        photo,
        position: sample.point,
        accuracy_meters: sample.accuracy_meters,
        classification,
        justification: (!trimmed.is_empty()).then(|| trimmed.to_string()),
    })
}
