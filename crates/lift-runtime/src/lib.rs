//! # Lift Runtime
//!
//! Provides the runtime infrastructure for the lift simulator actors.
//!
//! This crate defines:
//! - **Actor trait**: Base trait for all actors with lifecycle methods
//! - **Channel management**: Typed mailboxes and operator queries
//! - **Supervision**: Cancellable one-shot ticks and connect timeouts
//! - **Links**: Line-delimited JSON over TCP with liveness notification
//!
//! ## Architecture
//!
//! The actor runtime follows these principles:
//! - **Zero shared state**: Each actor owns its data
//! - **Message passing**: Actors communicate via typed messages
//! - **Sequential processing**: Messages are handled one at a time
//! - **Failure isolation**: Actor errors don't crash the system
//!
//! ## Example
//!
//! ```ignore
//! use lift_runtime::{spawn_actor, ChannelManager};
//!
//! let (manager, handles) = ChannelManager::new();
//!
//! let elevator = ElevatorActor::new("lift-1", config, manager.elevator_sender(), handles.event_tx.clone());
//! spawn_actor(elevator, handles.elevator_rx, handles.event_tx.clone());
//!
//! manager.send_elevator_command(ElevatorCommand::Connect { host, port })?;
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

pub mod actor;
pub mod channels;
pub mod link;
pub mod logging;
pub mod supervision;

#[doc(hidden)]
pub use log as __log;

pub use actor::{spawn_actor, Actor};
pub use channels::{
    ActorHandles, ChannelManager, DispatcherMessage, ElevatorMessage, ElevatorSummary, PeerId,
};
pub use link::PeerLink;
pub use supervision::{spawn_tick, SupervisionConfig, TickHandle};
