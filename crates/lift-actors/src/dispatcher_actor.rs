use crate::constants::listener::ACCEPT_ERROR_PAUSE_MS;
use futures::SinkExt;
use futures_channel::mpsc;
use lift_protocol::{
    ActorError, DispatcherCommand, LifecycleState, PeerKind, SystemEvent, WireMessage,
};
use lift_runtime::{
    actor_debug, actor_info, actor_warn, Actor, DispatcherMessage, ElevatorSummary, PeerId,
    PeerLink,
};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::task::JoinHandle;

/// Decides which elevator serves a hall call
///
/// The dispatcher forwards the call as a waypoint to whatever elevator the
/// policy names. `None` leaves the call unassigned.
pub trait AssignmentPolicy: Send + 'static {
    fn assign(&mut self, floor: i32, elevators: &[ElevatorSummary]) -> Option<String>;
}

/// Default policy: accepts calls and assigns nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct Unassigned;

impl AssignmentPolicy for Unassigned {
    fn assign(&mut self, _floor: i32, _elevators: &[ElevatorSummary]) -> Option<String> {
        None
    }
}

/// One accepted connection
struct Peer {
    addr: SocketAddr,
    link: PeerLink,
    registration: Option<(PeerKind, String)>,
    last_status: Option<(i32, LifecycleState)>,
}

/// DispatcherActor keeps the registry of connected elevators and passengers
///
/// Responsibilities:
/// - Own one link per accepted connection
/// - Register peers by name and forget them when their link goes down
/// - Forward operator waypoints to a named elevator
/// - Hand calls to the assignment policy
pub struct DispatcherActor<P = Unassigned> {
    peers: HashMap<PeerId, Peer>,
    elevators: BTreeMap<String, PeerId>,
    passengers: BTreeMap<String, PeerId>,
    policy: P,

    // Channel to send messages to self (link traffic)
    self_tx: mpsc::Sender<DispatcherMessage>,
    event_tx: mpsc::Sender<SystemEvent>,

    listener: Option<JoinHandle<()>>,
    finished: bool,
}

impl DispatcherActor<Unassigned> {
    pub fn new(
        self_tx: mpsc::Sender<DispatcherMessage>,
        event_tx: mpsc::Sender<SystemEvent>,
    ) -> Self {
        Self {
            peers: HashMap::new(),
            elevators: BTreeMap::new(),
            passengers: BTreeMap::new(),
            policy: Unassigned,
            self_tx,
            event_tx,
            listener: None,
            finished: false,
        }
    }
}

impl<P: AssignmentPolicy> DispatcherActor<P> {
    pub fn with_policy<Q: AssignmentPolicy>(self, policy: Q) -> DispatcherActor<Q> {
        DispatcherActor {
            peers: self.peers,
            elevators: self.elevators,
            passengers: self.passengers,
            policy,
            self_tx: self.self_tx,
            event_tx: self.event_tx,
            listener: self.listener,
            finished: self.finished,
        }
    }

    /// Stop the accept loop when this dispatcher shuts down
    pub fn with_listener(mut self, listener: JoinHandle<()>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Registered names of `kind`, sorted
    pub fn registered(&self, kind: PeerKind) -> Vec<String> {
        self.registry(kind).keys().cloned().collect()
    }

    /// Registered elevators with the last status each reported
    pub fn elevators(&self) -> Vec<ElevatorSummary> {
        self.elevators
            .iter()
            .map(|(name, peer)| {
                let status = self.peers.get(peer).and_then(|p| p.last_status);
                ElevatorSummary {
                    name: name.clone(),
                    floor: status.map(|(floor, _)| floor),
                    state: status.map(|(_, state)| state),
                }
            })
            .collect()
    }

    fn registry(&self, kind: PeerKind) -> &BTreeMap<String, PeerId> {
        match kind {
            PeerKind::Elevator => &self.elevators,
            PeerKind::Passenger => &self.passengers,
        }
    }

    fn registry_mut(&mut self, kind: PeerKind) -> &mut BTreeMap<String, PeerId> {
        match kind {
            PeerKind::Elevator => &mut self.elevators,
            PeerKind::Passenger => &mut self.passengers,
        }
    }

    /// Send a non-critical observer event
    fn send_event(&self, event: SystemEvent) {
        if let Err(e) = self.event_tx.clone().try_send(event) {
            actor_debug!("[dispatcher] event dropped: {:?}", e.into_inner());
        }
    }

    fn handle_peer_connected(&mut self, peer: PeerId, addr: SocketAddr, stream: TcpStream) {
        let link = PeerLink::spawn(
            stream,
            self.self_tx.clone(),
            move |msg| DispatcherMessage::FromPeer { peer, msg },
            DispatcherMessage::PeerDown { peer },
        );
        actor_info!("[dispatcher] peer {} connected from {}", peer, addr);
        self.peers.insert(
            peer,
            Peer {
                addr,
                link,
                registration: None,
                last_status: None,
            },
        );
    }

    fn handle_from_peer(&mut self, peer: PeerId, msg: WireMessage) -> Result<(), ActorError> {
        if !self.peers.contains_key(&peer) {
            actor_debug!("[dispatcher] ignoring {:?} from departed peer {}", msg, peer);
            return Ok(());
        }

        match msg {
            WireMessage::RegisterElevator { name } => {
                self.register(peer, PeerKind::Elevator, name);
                Ok(())
            }
            WireMessage::RegisterPassenger { name } => {
                self.register(peer, PeerKind::Passenger, name);
                Ok(())
            }
            WireMessage::Status { floor, state } => {
                if let Some(entry) = self.peers.get_mut(&peer) {
                    entry.last_status = Some((floor, state));
                }
                actor_debug!("[dispatcher] peer {} at floor {} ({})", peer, floor, state);
                Ok(())
            }
            WireMessage::Call { floor } => self.handle_call(floor),
            WireMessage::Waypoint { floor } => Err(ActorError::UnexpectedMessage {
                state: "dispatching".into(),
                message: format!("waypoint {} from peer {}", floor, peer),
            }),
        }
    }

    /// Link `peer` into the registry under `name`
    ///
    /// Latest registration wins: a name taken by another peer moves to this
    /// one, and the previous holder stays connected but unregistered.
    fn register(&mut self, peer: PeerId, kind: PeerKind, name: String) {
        let previous = match self.peers.get_mut(&peer) {
            Some(entry) => entry.registration.replace((kind, name.clone())),
            None => return,
        };
        if let Some((old_kind, old_name)) = previous {
            self.unregister(peer, old_kind, &old_name);
        }

        if let Some(holder) = self.registry_mut(kind).insert(name.clone(), peer) {
            if holder != peer {
                actor_warn!(
                    "[dispatcher] {} re-registered by peer {}, dropping peer {}'s claim",
                    name,
                    peer,
                    holder
                );
                if let Some(entry) = self.peers.get_mut(&holder) {
                    entry.registration = None;
                }
            }
        }

        actor_info!("[dispatcher] registered {:?} {} (peer {})", kind, name, peer);
        self.send_event(SystemEvent::PeerRegistered { name, kind });
    }

    /// Remove `name` from the registry if it still points at `peer`
    fn unregister(&mut self, peer: PeerId, kind: PeerKind, name: &str) -> bool {
        let registry = self.registry_mut(kind);
        if registry.get(name) == Some(&peer) {
            registry.remove(name);
            true
        } else {
            false
        }
    }

    fn handle_peer_down(&mut self, peer: PeerId) {
        let Some(entry) = self.peers.remove(&peer) else {
            return;
        };
        match entry.registration {
            Some((kind, name)) => {
                if self.unregister(peer, kind, &name) {
                    actor_info!("[dispatcher] {} ({}) went away", name, entry.addr);
                    self.send_event(SystemEvent::PeerLost { name });
                }
            }
            None => actor_debug!("[dispatcher] unregistered peer {} went away", peer),
        }
    }

    fn send_waypoint(&self, elevator: &str, floor: i32) -> Result<(), ActorError> {
        let link = self
            .elevators
            .get(elevator)
            .and_then(|peer| self.peers.get(peer))
            .map(|entry| &entry.link)
            .ok_or_else(|| {
                ActorError::Other(format!(
                    "No elevator named '{}' is registered. Use list to see registered elevators.",
                    elevator
                ))
            })?;
        link.send(WireMessage::Waypoint { floor })?;
        actor_info!("[dispatcher] sent waypoint {} to {}", floor, elevator);
        Ok(())
    }

    fn handle_call(&mut self, floor: i32) -> Result<(), ActorError> {
        let elevators = self.elevators();
        match self.policy.assign(floor, &elevators) {
            Some(name) => self.send_waypoint(&name, floor),
            None => {
                actor_info!("[dispatcher] call at floor {} left unassigned", floor);
                Ok(())
            }
        }
    }

    fn handle_shutdown(&mut self) {
        actor_info!(
            "[dispatcher] shutting down, dropping {} peer(s)",
            self.peers.len()
        );
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.peers.clear();
        self.elevators.clear();
        self.passengers.clear();
        self.finished = true;
    }
}

impl<P: AssignmentPolicy> Actor for DispatcherActor<P> {
    type Message = DispatcherMessage;

    fn name(&self) -> &'static str {
        "DispatcherActor"
    }

    async fn handle(&mut self, msg: Self::Message) -> Result<(), ActorError> {
        match msg {
            DispatcherMessage::Command(DispatcherCommand::SendWaypoint { elevator, floor }) => {
                self.send_waypoint(&elevator, floor)
            }
            DispatcherMessage::Command(DispatcherCommand::Call { floor }) => {
                self.handle_call(floor)
            }
            DispatcherMessage::Command(DispatcherCommand::Shutdown) => {
                self.handle_shutdown();
                Ok(())
            }
            DispatcherMessage::PeerConnected { peer, addr, stream } => {
                self.handle_peer_connected(peer, addr, stream);
                Ok(())
            }
            DispatcherMessage::FromPeer { peer, msg } => self.handle_from_peer(peer, msg),
            DispatcherMessage::PeerDown { peer } => {
                self.handle_peer_down(peer);
                Ok(())
            }
            DispatcherMessage::ListElevators { reply } => {
                let _ = reply.send(self.elevators());
                Ok(())
            }
            DispatcherMessage::ListPeers { kind, reply } => {
                let _ = reply.send(self.registered(kind));
                Ok(())
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    async fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.peers.clear();
    }
}

/// Bind `addr` and hand every accepted connection to the dispatcher
///
/// Returns the bound address (useful with port 0) and the accept loop task.
/// The loop ends when the dispatcher's mailbox closes.
pub async fn listen<A: ToSocketAddrs>(
    addr: A,
    inbox: mpsc::Sender<DispatcherMessage>,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    actor_info!("[dispatcher] listening on {}", local_addr);
    Ok((local_addr, tokio::spawn(accept_loop(listener, inbox))))
}

async fn accept_loop(listener: TcpListener, mut inbox: mpsc::Sender<DispatcherMessage>) {
    let mut next_peer: PeerId = 0;
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                next_peer = next_peer.wrapping_add(1);
                let msg = DispatcherMessage::PeerConnected {
                    peer: next_peer,
                    addr,
                    stream,
                };
                if inbox.send(msg).await.is_err() {
                    actor_debug!("[dispatcher] mailbox closed, listener stopping");
                    return;
                }
            }
            Err(e) => {
                actor_warn!("[dispatcher] accept failed: {}", e);
                tokio::time::sleep(Duration::from_millis(ACCEPT_ERROR_PAUSE_MS)).await;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures_channel::oneshot;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

    fn create_test_actor() -> (
        DispatcherActor,
        mpsc::Receiver<DispatcherMessage>,
        mpsc::Receiver<SystemEvent>,
    ) {
        let (self_tx, self_rx) = mpsc::channel(100);
        let (event_tx, event_rx) = mpsc::channel(100);
        (DispatcherActor::new(self_tx, event_tx), self_rx, event_rx)
    }

    async fn pair() -> (TcpStream, TcpStream, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let (accepted, peer_addr) = accepted.unwrap();
        (client.unwrap(), accepted, peer_addr)
    }

    /// Connect a fake peer; returns the remote end
    async fn attach<P: AssignmentPolicy>(actor: &mut DispatcherActor<P>, peer: PeerId) -> TcpStream {
        let (remote, local, addr) = pair().await;
        actor
            .handle(DispatcherMessage::PeerConnected {
                peer,
                addr,
                stream: local,
            })
            .await
            .unwrap();
        remote
    }

    /// Write `msg` from the remote and let the actor handle what arrives
    async fn deliver<P: AssignmentPolicy>(
        actor: &mut DispatcherActor<P>,
        self_rx: &mut mpsc::Receiver<DispatcherMessage>,
        remote: &mut TcpStream,
        msg: WireMessage,
    ) -> Result<(), ActorError> {
        remote
            .write_all(msg.to_line().unwrap().as_bytes())
            .await
            .unwrap();
        let inbound = tokio::time::timeout(Duration::from_secs(5), self_rx.next())
            .await
            .unwrap()
            .unwrap();
        actor.handle(inbound).await
    }

    async fn read_wire(remote: TcpStream) -> WireMessage {
        let mut lines = BufReader::new(remote).lines();
        let line = tokio::time::timeout(Duration::from_secs(5), lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        WireMessage::from_line(&line).unwrap()
    }

    fn drain(rx: &mut mpsc::Receiver<SystemEvent>) -> Vec<SystemEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = rx.try_next() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_register_elevator() {
        let (mut actor, mut self_rx, mut event_rx) = create_test_actor();
        let mut remote = attach(&mut actor, 1).await;
        assert_eq!(actor.peer_count(), 1);

        deliver(
            &mut actor,
            &mut self_rx,
            &mut remote,
            WireMessage::RegisterElevator {
                name: "lift-1".into(),
            },
        )
        .await
        .unwrap();

        assert_eq!(actor.registered(PeerKind::Elevator), vec!["lift-1"]);
        assert!(actor.registered(PeerKind::Passenger).is_empty());
        assert_eq!(
            drain(&mut event_rx),
            vec![SystemEvent::PeerRegistered {
                name: "lift-1".into(),
                kind: PeerKind::Elevator
            }]
        );
    }

    #[tokio::test]
    async fn test_register_passenger() {
        let (mut actor, mut self_rx, _event_rx) = create_test_actor();
        let mut remote = attach(&mut actor, 4).await;

        deliver(
            &mut actor,
            &mut self_rx,
            &mut remote,
            WireMessage::RegisterPassenger {
                name: "alice".into(),
            },
        )
        .await
        .unwrap();

        let (reply, rx) = oneshot::channel();
        actor
            .handle(DispatcherMessage::ListPeers {
                kind: PeerKind::Passenger,
                reply,
            })
            .await
            .unwrap();
        assert_eq!(rx.await.unwrap(), vec!["alice"]);
        assert!(actor.elevators().is_empty());
    }

    #[tokio::test]
    async fn test_status_reaches_summary() {
        let (mut actor, mut self_rx, _event_rx) = create_test_actor();
        let mut remote = attach(&mut actor, 1).await;

        for msg in [
            WireMessage::Status {
                floor: 0,
                state: LifecycleState::Idle,
            },
            WireMessage::RegisterElevator {
                name: "lift-1".into(),
            },
            WireMessage::Status {
                floor: 1,
                state: LifecycleState::InTransit,
            },
        ] {
            deliver(&mut actor, &mut self_rx, &mut remote, msg)
                .await
                .unwrap();
        }

        let (reply, rx) = oneshot::channel();
        actor
            .handle(DispatcherMessage::ListElevators { reply })
            .await
            .unwrap();
        assert_eq!(
            rx.await.unwrap(),
            vec![ElevatorSummary {
                name: "lift-1".into(),
                floor: Some(1),
                state: Some(LifecycleState::InTransit),
            }]
        );
    }

    #[tokio::test]
    async fn test_send_waypoint_to_registered_elevator() {
        let (mut actor, mut self_rx, _event_rx) = create_test_actor();
        let mut remote = attach(&mut actor, 1).await;
        deliver(
            &mut actor,
            &mut self_rx,
            &mut remote,
            WireMessage::RegisterElevator {
                name: "lift-1".into(),
            },
        )
        .await
        .unwrap();

        actor
            .handle(DispatcherMessage::Command(DispatcherCommand::SendWaypoint {
                elevator: "lift-1".into(),
                floor: 7,
            }))
            .await
            .unwrap();

        assert_eq!(read_wire(remote).await, WireMessage::Waypoint { floor: 7 });
    }

    #[tokio::test]
    async fn test_send_waypoint_to_unknown_elevator() {
        let (mut actor, _self_rx, _event_rx) = create_test_actor();

        let err = actor
            .handle(DispatcherMessage::Command(DispatcherCommand::SendWaypoint {
                elevator: "ghost".into(),
                floor: 2,
            }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test]
    async fn test_peer_down_unregisters() {
        let (mut actor, mut self_rx, mut event_rx) = create_test_actor();
        let mut remote = attach(&mut actor, 1).await;
        deliver(
            &mut actor,
            &mut self_rx,
            &mut remote,
            WireMessage::RegisterElevator {
                name: "lift-1".into(),
            },
        )
        .await
        .unwrap();
        drain(&mut event_rx);

        drop(remote);
        let msg = tokio::time::timeout(Duration::from_secs(5), self_rx.next())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(msg, DispatcherMessage::PeerDown { peer: 1 }));
        actor.handle(msg).await.unwrap();

        assert_eq!(actor.peer_count(), 0);
        assert!(actor.registered(PeerKind::Elevator).is_empty());
        assert_eq!(
            drain(&mut event_rx),
            vec![SystemEvent::PeerLost {
                name: "lift-1".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_reregistration_moves_name() {
        let (mut actor, mut self_rx, _event_rx) = create_test_actor();
        let mut first = attach(&mut actor, 1).await;
        let mut second = attach(&mut actor, 2).await;
        let register = WireMessage::RegisterElevator {
            name: "lift-1".into(),
        };

        deliver(&mut actor, &mut self_rx, &mut first, register.clone())
            .await
            .unwrap();
        deliver(&mut actor, &mut self_rx, &mut second, register)
            .await
            .unwrap();
        assert_eq!(actor.elevators.get("lift-1"), Some(&2));

        // The old holder leaving must not remove the new registration
        actor
            .handle(DispatcherMessage::PeerDown { peer: 1 })
            .await
            .unwrap();
        assert_eq!(actor.registered(PeerKind::Elevator), vec!["lift-1"]);
    }

    #[tokio::test]
    async fn test_call_unassigned_by_default() {
        let (mut actor, mut self_rx, _event_rx) = create_test_actor();
        let mut remote = attach(&mut actor, 1).await;
        deliver(
            &mut actor,
            &mut self_rx,
            &mut remote,
            WireMessage::RegisterElevator {
                name: "lift-1".into(),
            },
        )
        .await
        .unwrap();

        actor
            .handle(DispatcherMessage::Command(DispatcherCommand::Call { floor: 3 }))
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let read = tokio::time::timeout(Duration::from_millis(200), remote.read(&mut buf)).await;
        assert!(read.is_err(), "nothing should be sent for an unassigned call");
    }

    #[tokio::test]
    async fn test_call_routed_through_policy() {
        struct FirstElevator;

        impl AssignmentPolicy for FirstElevator {
            fn assign(&mut self, _floor: i32, elevators: &[ElevatorSummary]) -> Option<String> {
                elevators.first().map(|e| e.name.clone())
            }
        }

        let (actor, mut self_rx, _event_rx) = create_test_actor();
        let mut actor = actor.with_policy(FirstElevator);
        let mut lift = attach(&mut actor, 1).await;
        let mut passenger = attach(&mut actor, 2).await;

        deliver(
            &mut actor,
            &mut self_rx,
            &mut lift,
            WireMessage::RegisterElevator {
                name: "lift-1".into(),
            },
        )
        .await
        .unwrap();
        deliver(
            &mut actor,
            &mut self_rx,
            &mut passenger,
            WireMessage::Call { floor: 5 },
        )
        .await
        .unwrap();

        assert_eq!(read_wire(lift).await, WireMessage::Waypoint { floor: 5 });
    }

    #[tokio::test]
    async fn test_shutdown_drops_peers() {
        let (mut actor, _self_rx, _event_rx) = create_test_actor();
        let mut remote = attach(&mut actor, 1).await;

        actor
            .handle(DispatcherMessage::Command(DispatcherCommand::Shutdown))
            .await
            .unwrap();

        assert!(actor.is_finished());
        assert_eq!(actor.peer_count(), 0);
        let mut buf = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), remote.read_to_end(&mut buf))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_listener_forwards_connections() {
        let (tx, mut rx) = mpsc::channel(8);
        let (addr, task) = listen("127.0.0.1:0", tx).await.unwrap();

        let _a = TcpStream::connect(addr).await.unwrap();
        let _b = TcpStream::connect(addr).await.unwrap();

        let mut peers = Vec::new();
        for _ in 0..2 {
            match tokio::time::timeout(Duration::from_secs(5), rx.next())
                .await
                .unwrap()
                .unwrap()
            {
                DispatcherMessage::PeerConnected { peer, .. } => peers.push(peer),
                other => panic!("Wrong message: {:?}", other),
            }
        }
        assert_eq!(peers, vec![1, 2]);
        task.abort();
    }
}
