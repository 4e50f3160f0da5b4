//! # Lift Protocol
//!
//! Type-safe message and state definitions for the lift simulator.
//!
//! This crate has no runtime dependencies (no tokio, no sockets), so every
//! type here is testable in isolation.
//!
//! ## Architecture
//!
//! - **ElevatorCommand / DispatcherCommand**: operator → actor system
//! - **SystemEvent**: actor system → observers
//! - **WireMessage**: elevator ↔ dispatcher over a TCP link
//! - **LifecycleState**: elevator FSM states and transition table (pure data)
//! - **PassengerState**: passenger transition table (pure data)
//! - **ElevatorConfig**: floor bounds and timings
//!
//! ## Message Flow
//!
//! ```text
//! Operator → ElevatorCommand → Elevator ──WireMessage──► Dispatcher
//!                                 │     ◄──WireMessage──
//!                                 ↓
//!                            SystemEvent → Observer
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod config;
pub mod errors;
pub mod messages;
pub mod passenger;
pub mod state;

pub use config::{ElevatorConfig, AT_WAYPOINT_MS, FLOOR_MAX, FLOOR_MIN, FLOOR_TRANSIT_MS};
pub use errors::{ActorError, ElevatorError};
pub use messages::{DispatcherCommand, ElevatorCommand, PeerKind, SystemEvent, WireMessage};
pub use passenger::{PassengerEvent, PassengerState};
pub use state::{LifecycleState, Motion};
