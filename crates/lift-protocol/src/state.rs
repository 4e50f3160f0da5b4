/// # Elevator Lifecycle State Machine
///
/// High-level mode of one elevator cabin. The state is plain data: it carries
/// no per-elevator fields, so one value can be copied freely between the pure
/// transition function and the actor that interprets its effects.
///
/// ## State Transition Diagram
///
/// ```text
///                    ┌──────────────┐
///                    │ Initialising │
///                    └──┬────────┬──┘
///             setup ok  │        │ setup failed
///                       ▼        │
///               ┌──────────────┐ │
///          ┌───►│ Disconnected │◄┼───────────────────┐
///          │    └──────┬───────┘ │                   │
///  connect │   connect │ ok      │          connect  │
///  failed  │           ▼         │          failed   │
///          │    ┌──────────────┐ │                   │
///          └────┤     Idle     │◄┼─────────┐         │
///               └──────┬───────┘ │  queue  │         │
///        waypoint      │         │  empty  │         │
///        accepted      ▼         │         │         │
///               ┌──────────────┐ │  ┌──────┴──────┐  │
///               │  InTransit   ├─┼─►│ AtWaypoint  ├──┘
///               └──────────────┘ │  └─────────────┘
///                 ▲  tick: move  │     │ tick: more
///                 └──────────────┼─────┘ waypoints
///                                ▼
///                        ┌──────────────┐
///                        │   Quitting   │  (any state on quit, terminal)
///                        └──────────────┘
/// ```
///
/// ## State Invariants
///
/// - **Initialising**: one-time setup running, no remote handle, no timer
/// - **Disconnected**: no remote handle, no timer, waypoints rejected
/// - **Idle**: stationary, queue empty (or about to start), no timer
/// - **InTransit**: exactly one transit tick outstanding
/// - **AtWaypoint**: stationary, exactly one dwell tick outstanding
/// - **Quitting**: terminal, no timer, connection released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Running one-time setup
    Initialising,

    /// Not linked to a dispatcher, waiting for connect
    Disconnected,

    /// Linked and stationary with nothing to do
    Idle,

    /// Moving toward the head of the waypoint queue
    InTransit,

    /// Dwelling at a reached waypoint
    AtWaypoint,

    /// Shutting down, terminal
    Quitting,
}

impl LifecycleState {
    /// Name reported by state-name queries and the status wire message
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialising => "initialising",
            Self::Disconnected => "disconnected",
            Self::Idle => "idle",
            Self::InTransit => "in_transit",
            Self::AtWaypoint => "at_waypoint",
            Self::Quitting => "quitting",
        }
    }

    /// Can a waypoint request be enqueued in this state?
    pub fn accepts_waypoints(&self) -> bool {
        matches!(self, Self::Idle | Self::InTransit | Self::AtWaypoint)
    }

    /// Can a connect command be issued in this state?
    pub fn accepts_connect(&self) -> bool {
        matches!(
            self,
            Self::Disconnected | Self::Idle | Self::InTransit | Self::AtWaypoint
        )
    }

    /// Does this state own an outstanding motion or dwell tick?
    pub fn has_timer(&self) -> bool {
        matches!(self, Self::InTransit | Self::AtWaypoint)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Quitting)
    }

    /// Validate if transition to new_state is allowed from current state
    pub fn can_transition_to(&self, new_state: LifecycleState) -> bool {
        use LifecycleState::*;

        match (self, new_state) {
            // Nothing leaves Quitting
            (Quitting, _) => false,

            // Every other state may quit
            (_, Quitting) => true,

            // From Initialising
            (Initialising, Disconnected) => true, // Setup succeeded

            // From Disconnected
            (Disconnected, Idle) => true,         // Connect succeeded
            (Disconnected, Disconnected) => true, // Connect failed, stay retryable

            // From Idle
            (Idle, InTransit) => true,    // Waypoint accepted, start check passed
            (Idle, Idle) => true,         // Reconnected to a dispatcher
            (Idle, Disconnected) => true, // Reconnect failed

            // From InTransit
            (InTransit, AtWaypoint) => true,   // Arrived at queue head
            (InTransit, Idle) => true,         // Queue empty, or reconnected
            (InTransit, Disconnected) => true, // Reconnect failed

            // From AtWaypoint
            (AtWaypoint, InTransit) => true,    // Dwell over, more waypoints
            (AtWaypoint, Idle) => true,         // Dwell over, queue empty, or reconnected
            (AtWaypoint, Disconnected) => true, // Reconnect failed

            // All other transitions are invalid
            _ => false,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction of travel of the cabin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Motion {
    #[default]
    Stationary,
    MovingUp,
    MovingDown,
}

impl Motion {
    /// Motion needed to get from `floor` to `target`
    pub fn toward(floor: i32, target: i32) -> Self {
        match target.cmp(&floor) {
            std::cmp::Ordering::Greater => Self::MovingUp,
            std::cmp::Ordering::Less => Self::MovingDown,
            std::cmp::Ordering::Equal => Self::Stationary,
        }
    }

    /// Signed single-floor step for this motion
    pub fn step(&self) -> i32 {
        match self {
            Self::Stationary => 0,
            Self::MovingUp => 1,
            Self::MovingDown => -1,
        }
    }
}
