//! # Lift Actors
//!
//! Core actors of the lift simulator.
//!
//! ## Actors
//!
//! - **ElevatorActor**: Runs one cabin: lifecycle machine, motion ticks and the
//!   dispatcher connection
//! - **DispatcherActor**: Accepts elevator and passenger links, keeps the
//!   registry and forwards waypoints
//!
//! ## Pure parts
//!
//! - **lifecycle**: `(machine, event) -> (machine, effects)` transition function
//! - **motion**: FIFO waypoint queue and one-floor-per-tick cabin movement

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod connection;
pub mod constants;
pub mod dispatcher_actor;
pub mod elevator_actor;
pub mod lifecycle;
pub mod motion;

pub use connection::ConnectionManager;
pub use dispatcher_actor::{listen, AssignmentPolicy, DispatcherActor, Unassigned};
pub use elevator_actor::ElevatorActor;
pub use lifecycle::{Effect, Event, Machine, TimerKind};
pub use motion::{Advance, Cabin, WaypointQueue};
