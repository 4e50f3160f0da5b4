//! Waypoint queue and cabin position
//!
//! The cabin moves one floor per transit tick toward the head of a FIFO
//! queue. Arrival is checked right after the step, so a cabin at floor 5
//! heading for 8 needs exactly three ticks. A head equal to the current floor
//! is reached on the next tick without moving.

use lift_protocol::{ElevatorConfig, ElevatorError, Motion};
use std::collections::VecDeque;

/// FIFO of pending target floors
///
/// Duplicates are kept; the queue does not reorder for efficiency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaypointQueue {
    floors: VecDeque<i32>,
}

impl WaypointQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, floor: i32) {
        self.floors.push_back(floor);
    }

    pub fn head(&self) -> Option<i32> {
        self.floors.front().copied()
    }

    pub fn pop(&mut self) -> Option<i32> {
        self.floors.pop_front()
    }

    pub fn len(&self) -> usize {
        self.floors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.floors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &i32> {
        self.floors.iter()
    }
}

/// Outcome of one transit tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Nothing queued; the cabin stopped where it is
    QueueEmpty,
    /// Moved one floor, head not reached yet
    Moved { floor: i32 },
    /// Head of the queue reached and popped
    Arrived { floor: i32 },
}

/// Position, direction and pending waypoints of one cabin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cabin {
    floor: i32,
    motion: Motion,
    waypoints: WaypointQueue,
}

impl Cabin {
    pub fn new(floor: i32) -> Self {
        Self {
            floor,
            motion: Motion::Stationary,
            waypoints: WaypointQueue::new(),
        }
    }

    pub fn floor(&self) -> i32 {
        self.floor
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    pub fn waypoints(&self) -> &WaypointQueue {
        &self.waypoints
    }

    pub fn has_waypoints(&self) -> bool {
        !self.waypoints.is_empty()
    }

    /// Queue `floor` if the building has it
    pub fn accept(&mut self, floor: i32, config: &ElevatorConfig) -> Result<(), ElevatorError> {
        if !config.contains(floor) {
            return Err(ElevatorError::InvalidWaypoint {
                floor,
                min: config.floor_min,
                max: config.floor_max,
            });
        }
        self.waypoints.push(floor);
        Ok(())
    }

    /// Point the cabin at the current head
    pub fn aim(&mut self) {
        self.motion = match self.waypoints.head() {
            Some(target) => Motion::toward(self.floor, target),
            None => Motion::Stationary,
        };
    }

    pub fn stop(&mut self) {
        self.motion = Motion::Stationary;
    }

    /// Move at most one floor toward the head and report what happened
    pub fn advance(&mut self) -> Advance {
        let Some(target) = self.waypoints.head() else {
            self.stop();
            return Advance::QueueEmpty;
        };

        self.motion = Motion::toward(self.floor, target);
        self.floor += self.motion.step();

        if self.floor == target {
            self.waypoints.pop();
            self.stop();
            Advance::Arrived { floor: self.floor }
        } else {
            Advance::Moved { floor: self.floor }
        }
    }
}
