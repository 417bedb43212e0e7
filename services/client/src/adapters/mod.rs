pub mod devices;
pub mod http;

pub use devices::{FileCamera, FixedClock, ReplayLocationSensor, SystemClock};
pub use http::HttpBackend;
