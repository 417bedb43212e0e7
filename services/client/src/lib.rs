//! services/client/src/lib.rs
//!
//! The attendance client: configuration, backend and device adapters, and the
//! flow runner that ties them to the `attendance_core` gate.

pub mod adapters;
pub mod config;
pub mod error;
pub mod flow;
