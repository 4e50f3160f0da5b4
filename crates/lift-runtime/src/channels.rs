use futures_channel::{mpsc, oneshot};
use lift_protocol::{
    ActorError, DispatcherCommand, ElevatorCommand, LifecycleState, PeerKind, SystemEvent,
    WireMessage,
};
use std::net::SocketAddr;
use tokio::net::TcpStream;

/// Identifier the dispatcher assigns to each accepted connection
pub type PeerId = u64;

/// Mailbox of the elevator actor
pub enum ElevatorMessage {
    /// Commands from the operator
    Command(ElevatorCommand),

    /// Self-scheduled timer tick
    Tick {
        /// Token of the timer that produced this tick
        token: u64,
    },

    /// Asynchronous connect result: socket is connected
    ConnectSucceeded {
        /// Attempt this result belongs to
        attempt: u64,
        stream: TcpStream,
    },

    /// Asynchronous connect result: resolve or connect failed
    ConnectFailed { attempt: u64, reason: String },

    /// Inbound message from the dispatcher link of `attempt`
    FromDispatcher { attempt: u64, msg: WireMessage },

    /// Liveness monitor: the dispatcher link of `attempt` went down
    DispatcherDown { attempt: u64 },

    /// Query: current floor
    GetCurrentFloor { reply: oneshot::Sender<i32> },

    /// Query: lifecycle state name
    GetStateName { reply: oneshot::Sender<String> },
}

// Manual Debug implementation to skip link internals and reply channels
impl std::fmt::Debug for ElevatorMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command(cmd) => f.debug_tuple("Command").field(cmd).finish(),
            Self::Tick { token } => f.debug_struct("Tick").field("token", token).finish(),
            Self::ConnectSucceeded { attempt, stream } => f
                .debug_struct("ConnectSucceeded")
                .field("attempt", attempt)
                .field("peer", &stream.peer_addr().ok())
                .finish(),
            Self::ConnectFailed { attempt, reason } => f
                .debug_struct("ConnectFailed")
                .field("attempt", attempt)
                .field("reason", reason)
                .finish(),
            Self::FromDispatcher { attempt, msg } => f
                .debug_struct("FromDispatcher")
                .field("attempt", attempt)
                .field("msg", msg)
                .finish(),
            Self::DispatcherDown { attempt } => f
                .debug_struct("DispatcherDown")
                .field("attempt", attempt)
                .finish(),
            Self::GetCurrentFloor { .. } => write!(f, "GetCurrentFloor"),
            Self::GetStateName { .. } => write!(f, "GetStateName"),
        }
    }
}

/// What the dispatcher last heard from a registered elevator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevatorSummary {
    pub name: String,
    pub floor: Option<i32>,
    pub state: Option<LifecycleState>,
}

/// Mailbox of the dispatcher actor
pub enum DispatcherMessage {
    /// Commands from the operator
    Command(DispatcherCommand),

    /// Listener accepted a new connection
    PeerConnected {
        peer: PeerId,
        addr: SocketAddr,
        stream: TcpStream,
    },

    /// Inbound message from a peer
    FromPeer { peer: PeerId, msg: WireMessage },

    /// Liveness monitor: a peer went down
    PeerDown { peer: PeerId },

    /// Query: registered elevators
    ListElevators {
        reply: oneshot::Sender<Vec<ElevatorSummary>>,
    },

    /// Query: registered peers of one kind
    ListPeers {
        kind: PeerKind,
        reply: oneshot::Sender<Vec<String>>,
    },
}

impl std::fmt::Debug for DispatcherMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command(cmd) => f.debug_tuple("Command").field(cmd).finish(),
            Self::PeerConnected { peer, addr, .. } => f
                .debug_struct("PeerConnected")
                .field("peer", peer)
                .field("addr", addr)
                .finish(),
            Self::FromPeer { peer, msg } => f
                .debug_struct("FromPeer")
                .field("peer", peer)
                .field("msg", msg)
                .finish(),
            Self::PeerDown { peer } => f.debug_struct("PeerDown").field("peer", peer).finish(),
            Self::ListElevators { .. } => write!(f, "ListElevators"),
            Self::ListPeers { kind, .. } => {
                f.debug_struct("ListPeers").field("kind", kind).finish()
            }
        }
    }
}

/// Handles for spawning actors
pub struct ActorHandles {
    pub elevator_rx: mpsc::Receiver<ElevatorMessage>,
    pub dispatcher_rx: mpsc::Receiver<DispatcherMessage>,
    pub event_tx: mpsc::Sender<SystemEvent>,
}

/// Channel manager for actor communication
///
/// This manages all communication channels between actors and provides
/// a unified interface for sending messages and running queries.
pub struct ChannelManager {
    // Using bounded channels to prevent memory exhaustion under load
    elevator_tx: mpsc::Sender<ElevatorMessage>,
    dispatcher_tx: mpsc::Sender<DispatcherMessage>,

    // Event receiver (NOT cloned, replaced with dummy in Clone impl)
    // Note: Clone creates a disconnected receiver - use take_event_receiver() before cloning
    event_rx: mpsc::Receiver<SystemEvent>,
}

impl Clone for ChannelManager {
    fn clone(&self) -> Self {
        // Dummy receiver, never receives; take the real one before cloning
        let (_dummy_tx, dummy_rx) = mpsc::channel(1);
        Self {
            elevator_tx: self.elevator_tx.clone(),
            dispatcher_tx: self.dispatcher_tx.clone(),
            event_rx: dummy_rx,
        }
    }
}

impl ChannelManager {
    /// Create a new channel manager and actor handles
    ///
    /// Returns (ChannelManager for the operator, ActorHandles for spawning actors)
    ///
    /// Channel capacities:
    /// - elevator_tx: 256 - commands, ticks and link traffic (low frequency)
    /// - dispatcher_tx: 256 - peer traffic from every connected peer
    /// - event_tx: 1024 - observer events, one per floor/state change
    pub fn new() -> (Self, ActorHandles) {
        let (elevator_tx, elevator_rx) = mpsc::channel(256);
        let (dispatcher_tx, dispatcher_rx) = mpsc::channel(256);
        let (event_tx, event_rx) = mpsc::channel(1024);

        let handles = ActorHandles {
            elevator_rx,
            dispatcher_rx,
            event_tx,
        };

        let manager = Self {
            elevator_tx,
            dispatcher_tx,
            event_rx,
        };

        (manager, handles)
    }

    /// Send an operator command to the elevator
    pub fn send_elevator_command(&self, cmd: ElevatorCommand) -> Result<(), ActorError> {
        send_to(&self.elevator_tx, ElevatorMessage::Command(cmd), "Elevator")
    }

    /// Send an operator command to the dispatcher
    pub fn send_dispatcher_command(&self, cmd: DispatcherCommand) -> Result<(), ActorError> {
        send_to(&self.dispatcher_tx, DispatcherMessage::Command(cmd), "Dispatcher")
    }

    /// Ask the elevator for its current floor
    pub async fn current_floor(&self) -> Result<i32, ActorError> {
        let (reply, rx) = oneshot::channel();
        send_to(
            &self.elevator_tx,
            ElevatorMessage::GetCurrentFloor { reply },
            "Elevator",
        )?;
        rx.await
            .map_err(|_| ActorError::ChannelClosed("Elevator dropped floor query".into()))
    }

    /// Ask the elevator for its lifecycle state name
    pub async fn state_name(&self) -> Result<String, ActorError> {
        let (reply, rx) = oneshot::channel();
        send_to(
            &self.elevator_tx,
            ElevatorMessage::GetStateName { reply },
            "Elevator",
        )?;
        rx.await
            .map_err(|_| ActorError::ChannelClosed("Elevator dropped state query".into()))
    }

    /// Ask the dispatcher which elevators are registered
    pub async fn elevators(&self) -> Result<Vec<ElevatorSummary>, ActorError> {
        let (reply, rx) = oneshot::channel();
        send_to(
            &self.dispatcher_tx,
            DispatcherMessage::ListElevators { reply },
            "Dispatcher",
        )?;
        rx.await
            .map_err(|_| ActorError::ChannelClosed("Dispatcher dropped elevator query".into()))
    }

    /// Ask the dispatcher which peers of `kind` are registered
    pub async fn peers(&self, kind: PeerKind) -> Result<Vec<String>, ActorError> {
        let (reply, rx) = oneshot::channel();
        send_to(
            &self.dispatcher_tx,
            DispatcherMessage::ListPeers { kind, reply },
            "Dispatcher",
        )?;
        rx.await
            .map_err(|_| ActorError::ChannelClosed("Dispatcher dropped peer query".into()))
    }

    pub fn elevator_sender(&self) -> mpsc::Sender<ElevatorMessage> {
        self.elevator_tx.clone()
    }

    pub fn dispatcher_sender(&self) -> mpsc::Sender<DispatcherMessage> {
        self.dispatcher_tx.clone()
    }

    /// Take ownership of event receiver
    ///
    /// Replaces it with a disconnected dummy receiver.
    pub fn take_event_receiver(&mut self) -> mpsc::Receiver<SystemEvent> {
        let (_dummy_tx, dummy_rx) = mpsc::channel(1);
        std::mem::replace(&mut self.event_rx, dummy_rx)
    }
}

fn send_to<M>(tx: &mpsc::Sender<M>, msg: M, actor: &str) -> Result<(), ActorError> {
    tx.clone().try_send(msg).map_err(|e| {
        if e.is_full() {
            ActorError::Other(format!(
                "System overloaded: {} mailbox full. Slow down and retry.",
                actor
            ))
        } else {
            ActorError::ChannelClosed(format!("{} has shut down", actor))
        }
    })
}
