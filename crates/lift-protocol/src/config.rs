use crate::errors::ElevatorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lowest floor served by default
pub const FLOOR_MIN: i32 = 0;

/// Highest floor served by default
pub const FLOOR_MAX: i32 = 10;

/// Time to travel one floor (milliseconds)
///
/// **Value**: 1000ms
///
/// One tick per floor keeps the simulation readable on a console while still
/// finishing a full top-to-bottom run in ten seconds.
pub const FLOOR_TRANSIT_MS: u64 = 1000;

/// Time the cabin dwells at a reached waypoint (milliseconds)
///
/// **Value**: 3000ms
///
/// Independent of the transit time: doors open, passengers board, doors close.
pub const AT_WAYPOINT_MS: u64 = 3000;

/// Per-elevator configuration, passed at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevatorConfig {
    pub floor_min: i32,
    pub floor_max: i32,
    /// Floor the cabin starts on
    pub start_floor: i32,
    pub transit_ms: u64,
    pub dwell_ms: u64,
}

impl Default for ElevatorConfig {
    fn default() -> Self {
        Self {
            floor_min: FLOOR_MIN,
            floor_max: FLOOR_MAX,
            start_floor: FLOOR_MIN,
            transit_ms: FLOOR_TRANSIT_MS,
            dwell_ms: AT_WAYPOINT_MS,
        }
    }
}

impl ElevatorConfig {
    pub fn contains(&self, floor: i32) -> bool {
        (self.floor_min..=self.floor_max).contains(&floor)
    }

    pub fn transit(&self) -> Duration {
        Duration::from_millis(self.transit_ms)
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    /// Check the configuration can drive a cabin
    ///
    /// Failure here is the elevator's initialisation failure.
    pub fn validate(&self) -> Result<(), ElevatorError> {
        if self.floor_min > self.floor_max {
            return Err(ElevatorError::InitialisationFailure(format!(
                "floor_min {} is above floor_max {}",
                self.floor_min, self.floor_max
            )));
        }
        if !self.contains(self.start_floor) {
            return Err(ElevatorError::InitialisationFailure(format!(
                "start_floor {} outside [{}, {}]",
                self.start_floor, self.floor_min, self.floor_max
            )));
        }
        if self.transit_ms == 0 || self.dwell_ms == 0 {
            return Err(ElevatorError::InitialisationFailure(
                "transit_ms and dwell_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
