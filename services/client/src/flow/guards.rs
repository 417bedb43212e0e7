//! services/client/src/flow/guards.rs
//!
//! Scoped ownership of the two live device resources of an attendance flow:
//! the location subscription and the camera stream. Both are released when
//! the guard is dropped, whatever path the flow leaves by.

use attendance_core::domain::{EligibilityResult, Photo};
use attendance_core::flow::AttendanceFlow;
use attendance_core::ports::{CameraDevice, CameraStream, LocationSensor, PortError, PortResult};
use attendance_core::range_gate::Observation;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the location watch last reported.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchState {
    Pending,
    Evaluated(EligibilityResult),
    Failed(String),
    /// The sensor stopped producing samples without an error.
    Ended,
}

/// A live location subscription feeding one flow's range gate.
pub struct LocationWatch {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    updates: watch::Receiver<WatchState>,
}

impl LocationWatch {
    /// Subscribes to `sensor` and starts applying samples to `flow`.
    pub async fn start(
        sensor: &dyn LocationSensor,
        flow: Arc<Mutex<AttendanceFlow>>,
    ) -> PortResult<Self> {
        let mut stream = sensor.watch().await?;
        let (tx, rx) = watch::channel(WatchState::Pending);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Location watch cancelled.");
                        break;
                    }
                    next = stream.next() => match next {
                        Some(Ok(sample)) => {
                            let observation = flow.lock().await.observe_position(sample);
                            match observation {
                                Observation::Applied(result) => {
                                    debug!(
                                        "Position {}m from site (in range: {})",
                                        result.display_meters(),
                                        result.within_range
                                    );
                                    tx.send_replace(WatchState::Evaluated(result));
                                }
                                Observation::Ignored => debug!("Stale position sample ignored."),
                            }
                        }
                        Some(Err(fault)) => {
                            warn!("Location sensor failed: {}", fault);
                            flow.lock().await.sensor_failed(fault.to_string());
                            tx.send_replace(WatchState::Failed(fault.to_string()));
                            break;
                        }
                        None => {
                            tx.send_replace(WatchState::Ended);
                            break;
                        }
                    }
                }
            }
            // The stream is dropped here, which ends the sensor subscription.
        });

        info!("Location watch started.");
        Ok(Self {
            cancel,
            task: Some(task),
            updates: rx,
        })
    }

    pub fn updates(&self) -> watch::Receiver<WatchState> {
        self.updates.clone()
    }

    /// Cancels the subscription and waits for the worker to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Location watch task ended abnormally: {}", e);
            }
        }
        info!("Location watch stopped.");
    }
}

impl Drop for LocationWatch {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// An open camera that is stopped exactly once.
pub struct CameraSession {
    stream: Option<Box<dyn CameraStream>>,
}

impl CameraSession {
    pub async fn open(device: &dyn CameraDevice) -> PortResult<Self> {
        let stream = device.open().await?;
        Ok(Self {
            stream: Some(stream),
        })
    }

    pub async fn capture(&mut self) -> PortResult<Photo> {
        match self.stream.as_mut() {
            Some(stream) => stream.capture().await,
            None => Err(PortError::Unexpected("Camera already released".to_string())),
        }
    }

    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            debug!("Camera released.");
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release();
    }
}
