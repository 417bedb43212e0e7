pub mod domain;
pub mod error;
pub mod flow;
pub mod geo;
pub mod ports;
pub mod range_gate;
pub mod schedule;
pub mod submission;

pub use domain::{
    AttendanceAction, AttendanceStats, AttendanceSubmission, EligibilityResult, GeoPoint, Photo,
    PositionSample, ReferenceSite, Session, TimeClassification,
};
pub use error::{AttendanceError, AttendanceResult};
pub use flow::{AttendanceFlow, FlowStep};
pub use geo::haversine_distance;
pub use ports::{
    AdminBackend, AttendanceBackend, CameraDevice, CameraStream, Clock, LocationSensor,
    PortError, PortResult, SensorFault,
};
pub use range_gate::{evaluate, Eligibility, RangeGate};
pub use schedule::{AttendancePolicy, Cutoff, CutoffDirection};
pub use submission::prepare_submission;
