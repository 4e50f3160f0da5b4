//! Centralized configuration constants for the elevator and dispatcher actors
//!
//! Floor bounds and motion timing live in `lift_protocol::config` since they
//! are part of an elevator's configuration. The values here are network
//! defaults and listener tuning.
//!
//! **Before changing any constant:**
//! 1. Read its full documentation comment
//! 2. Check every `Used in` site still agrees with the new value

/// Where elevators find the dispatcher
pub mod network {
    /// Default dispatcher TCP port
    ///
    /// **Value**: 4242
    ///
    /// **Rationale**: Unprivileged, not registered for any common service, easy
    /// to type at the console prompt.
    ///
    /// **Used in**: liftsim main.rs (both subcommands)
    pub const DEFAULT_DISPATCHER_PORT: u16 = 4242;

    /// Default dispatcher host for elevators
    ///
    /// **Value**: 127.0.0.1
    ///
    /// **Rationale**: The common case is a dispatcher and a handful of
    /// elevators on one machine. Remote setups pass the host explicitly.
    ///
    /// **Used in**: liftsim main.rs
    pub const DEFAULT_DISPATCHER_HOST: &str = "127.0.0.1";

    /// Default address the dispatcher binds
    ///
    /// **Value**: 0.0.0.0 (all interfaces)
    ///
    /// **Used in**: liftsim main.rs
    pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";
}

/// Dispatcher listener behaviour
pub mod listener {
    /// Pause after a failed accept() before trying again (milliseconds)
    ///
    /// **Value**: 100ms
    ///
    /// **Rationale**: accept() fails mostly on descriptor exhaustion
    /// (EMFILE/ENFILE). Retrying immediately spins the CPU without freeing
    /// anything; 100ms lets closing peers release their sockets while keeping
    /// the listener responsive.
    ///
    /// **Used in**: dispatcher_actor.rs (listen)
    pub const ACCEPT_ERROR_PAUSE_MS: u64 = 100;
}

/// Dispatcher link teardown
pub mod link {
    /// How long a quitting elevator lets its link flush (milliseconds)
    ///
    /// **Value**: 500ms
    ///
    /// **Rationale**: The final status line is a few dozen bytes and leaves
    /// within one loopback round trip. A dispatcher that stopped reading must
    /// not keep the socket open much past quit.
    ///
    /// **Used in**: connection.rs (ConnectionManager::shutdown)
    pub const CLOSE_LINGER_MS: u64 = 500;
}
