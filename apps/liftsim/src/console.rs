//! Line-oriented operator console
//!
//! Parsing is kept apart from stdin so every command form is testable.

use lift_protocol::SystemEvent;
use std::net::SocketAddr;

pub const ELEVATOR_USAGE: &str = "\
Commands:
  connect [host port]  connect to the dispatcher (defaults from config)
  waypoint <floor>     queue a floor
  floor                print the current floor
  state                print the lifecycle state
  quit                 stop this elevator";

pub const DISPATCHER_USAGE: &str = "\
Commands:
  list                       registered elevators and their last status
  passengers                 registered passengers
  send <elevator> <floor>    send a waypoint to an elevator
  call <floor>               place a hall call
  quit                       shut the dispatcher down";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElevatorLine {
    /// `None` means use the configured dispatcher address
    Connect(Option<(String, u16)>),
    Waypoint(i32),
    Floor,
    State,
    Quit,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatcherLine {
    List,
    Passengers,
    Send { elevator: String, floor: i32 },
    Call(i32),
    Quit,
    Help,
}

/// Parse one elevator console line; blank lines give `Ok(None)`
pub fn parse_elevator(line: &str) -> Result<Option<ElevatorLine>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let parsed = match words.as_slice() {
        [] => return Ok(None),
        ["connect"] => ElevatorLine::Connect(None),
        ["connect", host, port] => {
            ElevatorLine::Connect(Some((unbracket(host).to_string(), parse_port(port)?)))
        }
        ["waypoint", floor] => ElevatorLine::Waypoint(parse_floor(floor)?),
        ["floor"] => ElevatorLine::Floor,
        ["state"] => ElevatorLine::State,
        ["quit"] => ElevatorLine::Quit,
        ["help"] => ElevatorLine::Help,
        _ => return Err(format!("Unknown command '{}'", line.trim())),
    };
    Ok(Some(parsed))
}

/// Parse one dispatcher console line; blank lines give `Ok(None)`
pub fn parse_dispatcher(line: &str) -> Result<Option<DispatcherLine>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let parsed = match words.as_slice() {
        [] => return Ok(None),
        ["list"] => DispatcherLine::List,
        ["passengers"] => DispatcherLine::Passengers,
        ["send", elevator, floor] => DispatcherLine::Send {
            elevator: elevator.to_string(),
            floor: parse_floor(floor)?,
        },
        ["call", floor] => DispatcherLine::Call(parse_floor(floor)?),
        ["quit"] => DispatcherLine::Quit,
        ["help"] => DispatcherLine::Help,
        _ => return Err(format!("Unknown command '{}'", line.trim())),
    };
    Ok(Some(parsed))
}

/// Split `host:port`; IPv6 literals use `[addr]:port`
pub fn parse_endpoint(endpoint: &str) -> Result<(String, u16), String> {
    if let Ok(addr) = endpoint.parse::<SocketAddr>() {
        return Ok((addr.ip().to_string(), addr.port()));
    }
    let (host, port) = endpoint
        .rsplit_once(':')
        .ok_or_else(|| format!("Expected host:port, got '{}'", endpoint))?;
    let host = unbracket(host);
    if host.is_empty() {
        return Err(format!("Missing host in '{}'", endpoint));
    }
    Ok((host.to_string(), parse_port(port)?))
}

/// `[::1]` -> `::1`, the form name resolution expects
fn unbracket(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

fn parse_port(word: &str) -> Result<u16, String> {
    word.parse()
        .map_err(|_| format!("'{}' is not a port number (1-65535)", word))
}

fn parse_floor(word: &str) -> Result<i32, String> {
    word.parse()
        .map_err(|_| format!("'{}' is not a floor number", word))
}

/// One-line rendering of an event for the console
pub fn describe(event: &SystemEvent) -> String {
    match event {
        SystemEvent::StateChanged { state } => format!("state: {}", state),
        SystemEvent::FloorPassed { floor } => format!("passing floor {}", floor),
        SystemEvent::WaypointReached { floor } => format!("arrived at floor {}", floor),
        SystemEvent::Connected { host, port } => format!("connected to {}:{}", host, port),
        SystemEvent::ConnectionLost => {
            "lost connection to dispatcher, please reconnect or quit".to_string()
        }
        SystemEvent::PeerRegistered { name, kind } => format!("{:?} {} registered", kind, name),
        SystemEvent::PeerLost { name } => format!("{} went away", name),
        SystemEvent::Error { message } => format!("error: {}", message),
    }
}
