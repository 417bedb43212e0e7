//! services/client/src/adapters/devices.rs
//!
//! Device adapters for environments without a browser: a location sensor that
//! replays known samples, a camera that "captures" an image file from disk,
//! and the system clock. They implement the device ports from the `core` crate.

use async_stream::stream;
use async_trait::async_trait;
use attendance_core::domain::{Photo, PositionSample};
use attendance_core::ports::{
    CameraDevice, CameraStream, Clock, LocationSensor, PortError, PortResult, PositionStream,
    SensorFault,
};
use bytes::Bytes;
use chrono::NaiveTime;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

//=========================================================================================
// Location
//=========================================================================================

/// Replays a fixed list of samples, optionally ending with a sensor fault.
#[derive(Clone, Debug, Default)]
pub struct ReplayLocationSensor {
    samples: Vec<PositionSample>,
    interval: Option<Duration>,
    fault: Option<SensorFault>,
}

impl ReplayLocationSensor {
    pub fn new(samples: Vec<PositionSample>) -> Self {
        Self {
            samples,
            ..Default::default()
        }
    }

    /// A sensor reporting one fix, e.g. coordinates given on the command line.
    pub fn single(sample: PositionSample) -> Self {
        Self::new(vec![sample])
    }

    /// A sensor that fails immediately.
    pub fn failing(fault: SensorFault) -> Self {
        Self {
            fault: Some(fault),
            ..Default::default()
        }
    }

    /// Waits `interval` before each sample, like a device emitting periodic fixes.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn then_fail(mut self, fault: SensorFault) -> Self {
        self.fault = Some(fault);
        self
    }
}

#[async_trait]
impl LocationSensor for ReplayLocationSensor {
    async fn watch(&self) -> PortResult<PositionStream> {
        let samples = self.samples.clone();
        let interval = self.interval;
        let fault = self.fault.clone();
        debug!("Replaying {} position samples", samples.len());

        Ok(Box::pin(stream! {
            for sample in samples {
                if let Some(interval) = interval {
                    tokio::time::sleep(interval).await;
                }
                yield Ok(sample);
            }
            if let Some(fault) = fault {
                yield Err(fault);
            }
        }))
    }
}

//=========================================================================================
// Camera
//=========================================================================================

/// A camera whose single frame is an image file.
#[derive(Clone, Debug)]
pub struct FileCamera {
    path: PathBuf,
}

impl FileCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CameraDevice for FileCamera {
    async fn open(&self) -> PortResult<Box<dyn CameraStream>> {
        let metadata = tokio::fs::metadata(&self.path).await.map_err(|e| {
            PortError::Unexpected(format!("Camera unavailable ({}): {}", self.path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(PortError::Unexpected(format!(
                "Camera unavailable: {} is not a file",
                self.path.display()
            )));
        }
        info!("Camera opened on {}", self.path.display());
        Ok(Box::new(FileCameraStream {
            path: self.path.clone(),
            stopped: false,
        }))
    }
}

struct FileCameraStream {
    path: PathBuf,
    stopped: bool,
}

#[async_trait]
impl CameraStream for FileCameraStream {
    async fn capture(&mut self) -> PortResult<Photo> {
        if self.stopped {
            return Err(PortError::Unexpected("Camera already stopped".to_string()));
        }
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|e| PortError::Unexpected(format!("Capture failed: {}", e)))?;
        Ok(Photo {
            content_type: content_type_for(&self.path).to_string(),
            data: Bytes::from(data),
        })
    }

    fn stop(&mut self) {
        self.stopped = true;
        debug!("Camera on {} stopped", self.path.display());
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

//=========================================================================================
// Clock
//=========================================================================================

/// The device's local time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn local_time(&self) -> NaiveTime {
        chrono::Local::now().time()
    }
}

/// A clock stuck at one time of day.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveTime);

impl Clock for FixedClock {
    fn local_time(&self) -> NaiveTime {
        self.0
    }
}
