pub mod guards;
pub mod runner;

// Re-export the runner so the binary can drive a flow without reaching into submodules.
pub use guards::{CameraSession, LocationWatch, WatchState};
pub use runner::{rejection_message, site_for, FlowOutcome, FlowRunner};
