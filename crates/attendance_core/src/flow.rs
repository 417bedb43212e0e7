//! crates/attendance_core/src/flow.rs
//!
//! The state machine of a single check-in or check-out attempt.
//!
//! A flow owns its range gate, its photo and its justification exclusively.
//! It never performs I/O: the caller feeds it sensor samples and captures,
//! dispatches the payload it hands out, and reports back how that went.

use chrono::NaiveTime;

use crate::domain::{
    AttendanceAction, AttendanceSubmission, PositionSample, Photo, ReferenceSite,
    TimeClassification,
};
use crate::error::{AttendanceError, AttendanceResult};
use crate::range_gate::{Eligibility, Observation, RangeGate};
use crate::schedule::AttendancePolicy;
use crate::submission::prepare_submission;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    /// Waiting for an in-range position fix.
    Locating,
    /// The camera is open.
    Capturing,
    /// A photo is held and the user can add a justification.
    Confirming,
    /// The payload is in flight.
    Submitting,
    Submitted,
}

impl FlowStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Locating => "locating",
            Self::Capturing => "capturing",
            Self::Confirming => "confirming",
            Self::Submitting => "submitting",
            Self::Submitted => "submitted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttendanceFlow {
    action: AttendanceAction,
    policy: AttendancePolicy,
    gate: RangeGate,
    step: FlowStep,
    last_sample: Option<PositionSample>,
    photo: Option<Photo>,
    justification: String,
}

impl AttendanceFlow {
    pub fn new(action: AttendanceAction, site: ReferenceSite, policy: AttendancePolicy) -> Self {
        Self {
            action,
            policy,
            gate: RangeGate::new(site),
            step: FlowStep::Locating,
            last_sample: None,
            photo: None,
            justification: String::new(),
        }
    }

    pub fn action(&self) -> AttendanceAction {
        self.action
    }

    pub fn step(&self) -> FlowStep {
        self.step
    }

    pub fn site(&self) -> &ReferenceSite {
        self.gate.site()
    }

    pub fn eligibility(&self) -> &Eligibility {
        self.gate.eligibility()
    }

    pub fn photo(&self) -> Option<&Photo> {
        self.photo.as_ref()
    }

    /// Classification for display, e.g. to show the "you are late" banner.
    pub fn classification_at(&self, now: NaiveTime) -> TimeClassification {
        self.policy.classify(self.action, now)
    }

    fn require(&self, operation: &'static str, allowed: &[FlowStep]) -> AttendanceResult<()> {
        if allowed.contains(&self.step) {
            Ok(())
        } else {
            Err(AttendanceError::InvalidStep {
                operation,
                step: self.step.name(),
            })
        }
    }

    /// Feeds a sensor sample to the gate. The newest sample wins.
    pub fn observe_position(&mut self, sample: PositionSample) -> Observation {
        let observation = self.gate.observe(&sample);
        if matches!(observation, Observation::Applied(_)) {
            self.last_sample = Some(sample);
        }
        observation
    }

    pub fn sensor_failed(&mut self, reason: impl Into<String>) {
        self.gate.sensor_failed(reason);
    }

    /// Starts a fresh location attempt after a sensor failure.
    pub fn retry_location(&mut self) -> AttendanceResult<()> {
        self.require("retry location", &[FlowStep::Locating])?;
        self.gate.reset();
        self.last_sample = None;
        Ok(())
    }

    /// Opens the capture step. Only allowed while the latest sample is in range.
    pub fn begin_capture(&mut self) -> AttendanceResult<()> {
        self.require("open the camera", &[FlowStep::Locating])?;
        match self.gate.eligibility() {
            Eligibility::Evaluated(r) if r.within_range => {
                self.step = FlowStep::Capturing;
                Ok(())
            }
            Eligibility::Evaluated(r) => Err(AttendanceError::OutOfRange {
                distance_meters: r.display_meters(),
            }),
            Eligibility::Unavailable(reason) => {
                Err(AttendanceError::SensorUnavailable(reason.clone()))
            }
            Eligibility::Pending => Err(AttendanceError::SensorUnavailable(
                "no position fix yet".to_string(),
            )),
        }
    }

    pub fn capture(&mut self, photo: Photo) -> AttendanceResult<()> {
        self.require("capture", &[FlowStep::Capturing])?;
        if photo.is_empty() {
            return Err(AttendanceError::MissingCapture);
        }
        self.photo = Some(photo);
        self.step = FlowStep::Confirming;
        Ok(())
    }

    /// The user closed the camera without taking a picture.
    pub fn cancel_capture(&mut self) -> AttendanceResult<()> {
        self.require("cancel the capture", &[FlowStep::Capturing])?;
        self.step = FlowStep::Locating;
        Ok(())
    }

    /// The camera could not be opened; back to locating.
    pub fn camera_failed(&mut self, reason: impl Into<String>) -> AttendanceError {
        if self.step == FlowStep::Capturing {
            self.step = FlowStep::Locating;
        }
        AttendanceError::SensorUnavailable(reason.into())
    }

    /// The user dropped the photo on the confirmation screen.
    pub fn discard_capture(&mut self) -> AttendanceResult<()> {
        self.require("discard the photo", &[FlowStep::Confirming])?;
        self.photo = None;
        self.step = FlowStep::Locating;
        Ok(())
    }

    pub fn set_justification(&mut self, text: impl Into<String>) -> AttendanceResult<()> {
        self.require("edit the reason", &[FlowStep::Confirming])?;
        self.justification = text.into();
        Ok(())
    }

    /// Classifies `now`, validates and hands out the payload.
    ///
    /// The flow moves to `Submitting`; a second call fails until the caller
    /// reports the outcome, so a payload is never dispatched twice.
    pub fn begin_submit(&mut self, now: NaiveTime) -> AttendanceResult<AttendanceSubmission> {
        self.require("submit", &[FlowStep::Confirming])?;
        let sample = self.last_sample.as_ref().ok_or_else(|| {
            AttendanceError::SensorUnavailable("no position fix recorded".to_string())
        })?;
        let classification = self.policy.classify(self.action, now);
        let submission = prepare_submission(
            self.action,
            self.photo.as_ref(),
            sample,
            classification,
            &self.justification,
        )?;
        self.step = FlowStep::Submitting;
        Ok(submission)
    }

    pub fn submission_succeeded(&mut self) -> AttendanceResult<()> {
        self.require("finish", &[FlowStep::Submitting])?;
        self.step = FlowStep::Submitted;
        Ok(())
    }

    /// Returns to the confirmation screen with photo and reason intact.
    pub fn submission_failed(&mut self) -> AttendanceResult<()> {
        self.require("roll back", &[FlowStep::Submitting])?;
        self.step = FlowStep::Confirming;
        Ok(())
    }
}
