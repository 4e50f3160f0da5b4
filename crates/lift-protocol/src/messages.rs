use crate::state::LifecycleState;
use serde::{Deserialize, Serialize};

/// Commands an operator (or a dispatcher link) sends to an elevator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElevatorCommand {
    /// Connect to the dispatcher at host:port (replaces any current link)
    Connect { host: String, port: u16 },

    /// Request a visit to `floor`
    Waypoint { floor: i32 },

    /// Shut the elevator down
    Quit,
}

/// Commands an operator sends to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatcherCommand {
    /// Forward a waypoint to a registered elevator
    SendWaypoint { elevator: String, floor: i32 },

    /// Hall call, handed to the assignment policy
    Call { floor: i32 },

    /// Stop accepting peers and drop every link
    Shutdown,
}

/// Events from the actor system to whoever observes it (console, tests)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemEvent {
    /// Lifecycle state has changed
    StateChanged { state: LifecycleState },

    /// Cabin moved past a floor on its way to a waypoint
    FloorPassed { floor: i32 },

    /// Cabin stopped at a waypoint
    WaypointReached { floor: i32 },

    /// Link to the dispatcher established
    Connected { host: String, port: u16 },

    /// Link to the dispatcher went down
    ConnectionLost,

    /// A peer registered with the dispatcher
    PeerRegistered { name: String, kind: PeerKind },

    /// A registered peer disconnected
    PeerLost { name: String },

    /// Error occurred
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerKind {
    Elevator,
    Passenger,
}

/// Messages exchanged over a dispatcher link
///
/// Encoded as one JSON object per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// Elevator → dispatcher, once per established link
    RegisterElevator { name: String },

    /// Passenger → dispatcher
    RegisterPassenger { name: String },

    /// Passenger → dispatcher hall call
    Call { floor: i32 },

    /// Elevator → dispatcher on every lifecycle change
    Status { floor: i32, state: LifecycleState },

    /// Dispatcher → elevator
    Waypoint { floor: i32 },
}

impl WireMessage {
    /// Encode as a single newline-terminated line
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Decode one line (trailing `\r\n` tolerated)
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        Self::from_bytes(line.as_bytes())
    }

    /// Decode one raw line as read off the socket
    ///
    /// Bytes that are not valid UTF-8 are a decode error like any other
    /// malformed input.
    pub fn from_bytes(line: &[u8]) -> Result<Self, serde_json::Error> {
        let end = line
            .iter()
            .rposition(|b| *b != b'\n' && *b != b'\r')
            .map_or(0, |i| i + 1);
        serde_json::from_slice(line.get(..end).unwrap_or_default())
    }
}
