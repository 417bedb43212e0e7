//! crates/attendance_core/src/schedule.rs
//!
//! Classifies the local wall-clock time against the office cutoffs.
//! Granularity is one minute: seconds are ignored, so 07:30:59 is still 07:30.

use chrono::{NaiveTime, Timelike};
use std::fmt;
use std::str::FromStr;

use crate::domain::{AttendanceAction, TimeClassification};
use crate::error::{AttendanceError, AttendanceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoffDirection {
    /// Flagged when the time is strictly after the cutoff minute (lateness).
    After,
    /// Flagged when the time is strictly before the cutoff minute (early departure).
    Before,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutoff {
    hour: u32,
    minute: u32,
    direction: CutoffDirection,
}

impl Cutoff {
    pub fn new(hour: u32, minute: u32, direction: CutoffDirection) -> AttendanceResult<Self> {
        if hour > 23 || minute > 59 {
            return Err(AttendanceError::InvalidCutoff(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self {
            hour,
            minute,
            direction,
        })
    }

    /// Parses an `HH:MM` string.
    pub fn parse(value: &str, direction: CutoffDirection) -> AttendanceResult<Self> {
        let invalid = || AttendanceError::InvalidCutoff(value.to_string());
        let (h, m) = value.trim().split_once(':').ok_or_else(invalid)?;
        let hour = u32::from_str(h).map_err(|_| invalid())?;
        let minute = u32::from_str(m).map_err(|_| invalid())?;
        Self::new(hour, minute, direction)
    }

    pub fn direction(&self) -> CutoffDirection {
        self.direction
    }

    pub fn is_flagged(&self, now: NaiveTime) -> bool {
        let (h, m) = (now.hour(), now.minute());
        match self.direction {
            CutoffDirection::After => h > self.hour || (h == self.hour && m > self.minute),
            CutoffDirection::Before => h < self.hour || (h == self.hour && m < self.minute),
        }
    }
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// The pair of cutoffs that governs check-in and check-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendancePolicy {
    pub check_in: Cutoff,
    pub check_out: Cutoff,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            check_in: Cutoff {
                hour: 7,
                minute: 30,
                direction: CutoffDirection::After,
            },
            check_out: Cutoff {
                hour: 16,
                minute: 30,
                direction: CutoffDirection::Before,
            },
        }
    }
}

impl AttendancePolicy {
    pub fn classify(&self, action: AttendanceAction, now: NaiveTime) -> TimeClassification {
        match action {
            AttendanceAction::CheckIn if self.check_in.is_flagged(now) => TimeClassification::Late,
            AttendanceAction::CheckOut if self.check_out.is_flagged(now) => {
                TimeClassification::EarlyDeparture
            }
            _ => TimeClassification::OnTime,
        }
    }
}
