//! services/client/src/flow/runner.rs
//!
//! Drives one attendance attempt from the first position fix to the single
//! backend submission, owning the sensor and camera only for the steps that
//! need them.

use crate::config::Config;
use crate::error::ClientError;
use crate::flow::guards::{CameraSession, LocationWatch, WatchState};
use attendance_core::domain::{
    AttendanceAction, Branch, EligibilityResult, NextAction, ReferenceSite, Session,
    SubmissionReceipt, TodayStatus,
};
use attendance_core::error::AttendanceError;
use attendance_core::flow::AttendanceFlow;
use attendance_core::ports::{AttendanceBackend, CameraDevice, Clock, LocationSensor, PortError};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// How a completed run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    Submitted(SubmissionReceipt),
    /// The latest position was outside the site; nothing was captured or sent.
    OutOfRange(EligibilityResult),
    /// Today's record does not allow this action; no device was touched.
    NotAvailable(NextAction),
}

/// Picks the site for an action: the session's branch when it has
/// coordinates, the configured office otherwise.
pub fn site_for(
    branch: Option<&Branch>,
    action: AttendanceAction,
    config: &Config,
) -> ReferenceSite {
    match branch {
        Some(Branch {
            name,
            location: Some(point),
            radius_meters,
            ..
        }) => ReferenceSite::new(
            name.clone(),
            *point,
            radius_meters.unwrap_or(config.gate_radius_meters),
        ),
        _ => config.default_site(action),
    }
}

/// The message shown to the user when the backend refuses a submission.
pub fn rejection_message(error: &PortError) -> String {
    match error {
        PortError::Rejected(message) => message.clone(),
        PortError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
        _ => "Failed to submit attendance. Please try again.".to_string(),
    }
}

pub struct FlowRunner {
    pub config: Arc<Config>,
    pub backend: Arc<dyn AttendanceBackend>,
    pub sensor: Arc<dyn LocationSensor>,
    pub camera: Arc<dyn CameraDevice>,
    pub clock: Arc<dyn Clock>,
}

impl FlowRunner {
    /// Runs a full check-in or check-out attempt.
    ///
    /// Local validation failures never reach the network. A backend failure
    /// leaves nothing behind; the user re-runs the attempt to retry.
    pub async fn run(
        &self,
        session: &Session,
        action: AttendanceAction,
        justification: &str,
    ) -> Result<FlowOutcome, ClientError> {
        let flow_id = Uuid::new_v4();
        let span = info_span!("attendance_flow", %flow_id, ?action);
        self.run_inner(session, action, justification)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        session: &Session,
        action: AttendanceAction,
        justification: &str,
    ) -> Result<FlowOutcome, ClientError> {
        // --- 1. Check today's record and resolve the reference site ---
        let status = self.load_status(session).await?;
        if let Some(status) = &status {
            let next = status.next_action();
            if !next.allows(action) {
                info!("{:?} is not available today (next: {:?}).", action, next);
                return Ok(FlowOutcome::NotAvailable(next));
            }
        }
        let branch = status.as_ref().and_then(|s| s.branch.as_ref());
        let site = site_for(branch, action, &self.config);
        info!(
            "Using site '{}' ({}), radius {}m",
            site.name, site.point, site.radius_meters
        );
        let flow = Arc::new(Mutex::new(AttendanceFlow::new(
            action,
            site,
            self.config.policy,
        )));

        // --- 2. Wait for an in-range fix ---
        self.locate(flow.clone()).await?;
        {
            let mut flow = flow.lock().await;
            match flow.begin_capture() {
                Ok(()) => {}
                Err(AttendanceError::OutOfRange { .. }) => {
                    let result = flow.eligibility().result().ok_or_else(|| {
                        ClientError::Internal("out of range without a result".to_string())
                    })?;
                    info!("Outside the allowed area ({}m).", result.display_meters());
                    return Ok(FlowOutcome::OutOfRange(result));
                }
                Err(e) => return Err(e.into()),
            }
        }

        // --- 3. Capture the selfie ---
        let mut camera = match CameraSession::open(self.camera.as_ref()).await {
            Ok(camera) => camera,
            Err(e) => {
                warn!("Camera unavailable: {}", e);
                return Err(flow.lock().await.camera_failed(e.to_string()).into());
            }
        };
        let captured = camera.capture().await;
        camera.release();
        let photo = match captured {
            Ok(photo) => photo,
            Err(e) => {
                warn!("Capture failed: {}", e);
                return Err(flow.lock().await.camera_failed(e.to_string()).into());
            }
        };

        // --- 4. Validate and submit exactly once ---
        let submission = {
            let mut flow = flow.lock().await;
            flow.capture(photo)?;
            flow.set_justification(justification)?;
            flow.begin_submit(self.clock.local_time())?
        };
        info!("Submitting as {:?}.", submission.classification);

        match self.backend.submit_attendance(session, &submission).await {
            Ok(receipt) => {
                flow.lock().await.submission_succeeded()?;
                info!("Attendance recorded.");
                Ok(FlowOutcome::Submitted(receipt))
            }
            Err(e) => {
                error!("Submission failed: {}", e);
                flow.lock().await.submission_failed()?;
                Err(AttendanceError::SubmissionRejected {
                    message: rejection_message(&e),
                }
                .into())
            }
        }
    }

    /// Today's status, or `None` when it could not be loaded for a reason
    /// other than an expired session.
    async fn load_status(&self, session: &Session) -> Result<Option<TodayStatus>, ClientError> {
        match self.backend.today_status(session).await {
            Ok(status) => Ok(Some(status)),
            Err(PortError::Unauthorized) => Err(PortError::Unauthorized.into()),
            Err(e) => {
                warn!("Could not load today's status, using the configured site: {}", e);
                Ok(None)
            }
        }
    }

    /// Holds the location subscription until the device is in range, the
    /// sensor fails or stops, or the configured timeout elapses.
    async fn locate(&self, flow: Arc<Mutex<AttendanceFlow>>) -> Result<(), ClientError> {
        let watch = LocationWatch::start(self.sensor.as_ref(), flow)
            .await
            .map_err(|e| AttendanceError::SensorUnavailable(e.to_string()))?;
        let mut updates = watch.updates();

        let waited = tokio::time::timeout(self.config.location_timeout, async {
            loop {
                let state = updates.borrow_and_update().clone();
                match state {
                    WatchState::Evaluated(r) if r.within_range => return Ok(()),
                    WatchState::Failed(reason) => {
                        return Err(AttendanceError::SensorUnavailable(reason))
                    }
                    WatchState::Ended => return Ok(()),
                    WatchState::Pending | WatchState::Evaluated(_) => {}
                }
                if updates.changed().await.is_err() {
                    return Ok(());
                }
            }
        })
        .await;

        watch.stop().await;

        match waited {
            Ok(result) => result.map_err(ClientError::from),
            Err(_) => {
                warn!(
                    "No in-range position within {:?}.",
                    self.config.location_timeout
                );
                Ok(())
            }
        }
    }
}
