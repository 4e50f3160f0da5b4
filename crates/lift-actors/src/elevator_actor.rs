use crate::connection::{spawn_connect, ConnectionManager};
use crate::lifecycle::{Effect, Event, Machine, TimerKind};
use futures_channel::mpsc;
use lift_protocol::{
    ActorError, ElevatorCommand, ElevatorConfig, ElevatorError, LifecycleState, SystemEvent,
    WireMessage,
};
use lift_runtime::{
    actor_debug, actor_error, actor_info, actor_warn, spawn_tick, Actor, ElevatorMessage,
    PeerLink, SupervisionConfig, TickHandle,
};
use tokio::net::TcpStream;

/// ElevatorActor owns one simulated cabin
///
/// Responsibilities:
/// - Drive the lifecycle machine and carry out its effects
/// - Own the single outstanding transit or dwell tick
/// - Connect to the dispatcher on command and register once linked
/// - Report state and floor changes to observers and the dispatcher
///
/// ## State Machine
///
/// See `lift-protocol/src/state.rs` for the diagram and `lifecycle.rs` for
/// the entry and exit hooks.
///
/// Key coordination patterns:
/// - **Async connect**: connect → ConnectSucceeded/ConnectFailed, matched by attempt id
/// - **Self-addressed ticks**: arm → Tick{token}, matched by token
/// - **Liveness loss**: DispatcherDown clears the link only; motion carries on
pub struct ElevatorActor {
    name: String,
    config: ElevatorConfig,
    machine: Machine,
    connection: ConnectionManager,
    supervision_config: SupervisionConfig,

    // Channel to send messages to self (ticks, connect results, link traffic)
    self_tx: mpsc::Sender<ElevatorMessage>,
    event_tx: mpsc::Sender<SystemEvent>,

    // At most one pending tick; dropping the handle cancels it
    pending_tick: Option<TickHandle>,
    tick_sequence: u64,

    terminated: bool,
}

impl ElevatorActor {
    pub fn new(
        name: impl Into<String>,
        config: ElevatorConfig,
        self_tx: mpsc::Sender<ElevatorMessage>,
        event_tx: mpsc::Sender<SystemEvent>,
    ) -> Self {
        let machine = Machine::new(&config);
        Self {
            name: name.into(),
            config,
            machine,
            connection: ConnectionManager::new(),
            supervision_config: SupervisionConfig::default(),
            self_tx,
            event_tx,
            pending_tick: None,
            tick_sequence: 0,
            terminated: false,
        }
    }

    pub fn with_supervision(mut self, supervision_config: SupervisionConfig) -> Self {
        self.supervision_config = supervision_config;
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.machine.state()
    }

    pub fn current_floor(&self) -> i32 {
        self.machine.cabin().floor()
    }

    /// Pending waypoints, head first
    pub fn waypoints(&self) -> Vec<i32> {
        self.machine.cabin().waypoints().iter().copied().collect()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Token of the outstanding tick, if any
    pub fn pending_tick(&self) -> Option<u64> {
        self.pending_tick.as_ref().map(TickHandle::token)
    }

    /// Diagnostic prefix: `[elevator][name][state][floor]`
    fn tag(&self) -> String {
        format!(
            "[elevator][{}][{}][{}]",
            self.name,
            self.state(),
            self.current_floor()
        )
    }

    /// Send a non-critical observer event
    ///
    /// Failures are logged but don't propagate; observers are optional.
    fn send_event(&self, event: SystemEvent) {
        if let Err(e) = self.event_tx.clone().try_send(event) {
            actor_debug!("{} event dropped: {:?}", self.tag(), e.into_inner());
        }
    }

    /// Tell the dispatcher where we are, if linked
    fn report_status(&self) {
        let status = WireMessage::Status {
            floor: self.current_floor(),
            state: self.state(),
        };
        if let Err(e) = self.connection.send(status) {
            actor_warn!("{} status report failed: {}", self.tag(), e);
        }
    }

    /// Feed one event to the machine and carry out the resulting effects
    fn apply(&mut self, event: Event) {
        let (machine, effects) = self.machine.clone().step(&self.config, event);
        self.machine = machine;
        for effect in effects {
            self.perform(effect);
        }
    }

    fn perform(&mut self, effect: Effect) {
        match effect {
            Effect::StateChanged(state) => {
                actor_info!("{} entered {}", self.tag(), state);
                self.send_event(SystemEvent::StateChanged { state });
                self.report_status();
            }
            Effect::ArmTimer(kind) => self.arm(kind),
            Effect::DisarmTimer => {
                if let Some(handle) = self.pending_tick.take() {
                    handle.cancel();
                    actor_debug!("{} cancelled tick {}", self.tag(), handle.token());
                }
            }
            Effect::Register => {
                let register = WireMessage::RegisterElevator {
                    name: self.name.clone(),
                };
                match self.connection.send(register) {
                    Ok(true) => actor_debug!("{} registered with dispatcher", self.tag()),
                    Ok(false) => actor_warn!("{} no link to register on", self.tag()),
                    Err(e) => actor_warn!("{} registration failed: {}", self.tag(), e),
                }
            }
            Effect::ReleaseConnection => self.connection.shutdown(),
            Effect::Terminate => {
                actor_info!("{} terminating", self.tag());
                self.terminated = true;
            }
            Effect::FloorPassed(floor) => {
                actor_debug!("{} passing floor {}", self.tag(), floor);
                self.send_event(SystemEvent::FloorPassed { floor });
                self.report_status();
            }
            Effect::WaypointReached(floor) => {
                actor_info!("{} reached waypoint {}", self.tag(), floor);
                self.send_event(SystemEvent::WaypointReached { floor });
            }
            Effect::WaypointRejected(floor) => {
                actor_debug!(
                    "{} dropping waypoint {}: outside [{}, {}]",
                    self.tag(),
                    floor,
                    self.config.floor_min,
                    self.config.floor_max
                );
            }
        }
    }

    /// Arm the single tick for the current state
    fn arm(&mut self, kind: TimerKind) {
        if let Some(stale) = self.pending_tick.take() {
            // Transitions always disarm first; reaching this is a bug
            actor_error!(
                "{} tick {} still pending while arming {:?}",
                self.tag(),
                stale.token(),
                kind
            );
        }

        self.tick_sequence = self.tick_sequence.wrapping_add(1);
        let token = self.tick_sequence;
        let delay = match kind {
            TimerKind::Transit => self.config.transit(),
            TimerKind::Dwell => self.config.dwell(),
        };
        self.pending_tick = Some(spawn_tick(
            self.self_tx.clone(),
            token,
            ElevatorMessage::Tick { token },
            delay,
        ));
    }

    fn handle_tick(&mut self, token: u64) {
        match self.pending_tick.take() {
            Some(handle) if handle.token() == token => self.apply(Event::Tick),
            other => {
                actor_debug!("{} ignoring stale tick {}", self.tag(), token);
                self.pending_tick = other;
            }
        }
    }

    fn handle_waypoint(&mut self, floor: i32) -> Result<(), ActorError> {
        if !self.state().accepts_waypoints() {
            return Err(ActorError::UnexpectedMessage {
                state: self.state().to_string(),
                message: format!("waypoint {}", floor),
            });
        }
        self.apply(Event::Waypoint(floor));
        Ok(())
    }

    fn handle_connect(&mut self, host: String, port: u16) -> Result<(), ActorError> {
        if !self.state().accepts_connect() {
            return Err(ActorError::UnexpectedMessage {
                state: self.state().to_string(),
                message: format!("connect {}:{}", host, port),
            });
        }

        let attempt = self.connection.begin(&host, port);
        actor_info!(
            "{} connecting to {}:{} (attempt {})",
            self.tag(),
            host,
            port,
            attempt
        );
        spawn_connect(
            host,
            port,
            attempt,
            self.supervision_config.connect_timeout(),
            self.self_tx.clone(),
        );
        Ok(())
    }

    fn handle_connect_succeeded(&mut self, attempt: u64, stream: TcpStream) {
        if !self.connection.is_current(attempt) {
            // Dropping the stream closes the orphaned socket
            actor_debug!(
                "{} discarding stale connect result (attempt {}, current {})",
                self.tag(),
                attempt,
                self.connection.attempt()
            );
            return;
        }

        let link = PeerLink::spawn(
            stream,
            self.self_tx.clone(),
            move |msg| ElevatorMessage::FromDispatcher { attempt, msg },
            ElevatorMessage::DispatcherDown { attempt },
        );
        self.connection.establish(attempt, link);

        if let Some((host, port)) = self.connection.target() {
            actor_info!("{} connected to {}:{}", self.tag(), host, port);
            self.send_event(SystemEvent::Connected {
                host: host.to_string(),
                port,
            });
        }
        self.apply(Event::Connected);
    }

    fn handle_connect_failed(&mut self, attempt: u64, reason: String) {
        let Some((host, port)) = self
            .connection
            .target()
            .filter(|_| self.connection.is_current(attempt))
        else {
            actor_debug!("{} discarding stale connect failure: {}", self.tag(), reason);
            return;
        };

        let error = ElevatorError::ConnectionFailure {
            host: host.to_string(),
            port,
            reason,
        };
        actor_warn!("{} {}", self.tag(), error);
        self.send_event(SystemEvent::Error {
            message: error.to_string(),
        });
        self.apply(Event::ConnectFailed);
    }

    fn handle_from_dispatcher(&mut self, attempt: u64, msg: WireMessage) -> Result<(), ActorError> {
        if !self.connection.owns_link(attempt) {
            actor_debug!("{} ignoring {:?} from old link", self.tag(), msg);
            return Ok(());
        }
        match msg {
            WireMessage::Waypoint { floor } => self.handle_waypoint(floor),
            other => {
                actor_debug!("{} ignoring {:?} from dispatcher", self.tag(), other);
                Ok(())
            }
        }
    }

    fn handle_dispatcher_down(&mut self, attempt: u64) {
        if !self.connection.lose(attempt) {
            return;
        }
        let error = ElevatorError::ConnectionLost("dispatcher went away".into());
        actor_warn!("{} {}", self.tag(), error);
        self.send_event(SystemEvent::ConnectionLost);
    }
}

impl Actor for ElevatorActor {
    type Message = ElevatorMessage;

    fn name(&self) -> &'static str {
        "ElevatorActor"
    }

    async fn init(&mut self) -> Result<(), ActorError> {
        match self.config.validate() {
            Ok(()) => self.apply(Event::Initialised { ok: true }),
            Err(e) => {
                if e.is_fatal() {
                    actor_error!("{} {}", self.tag(), e);
                } else {
                    actor_warn!("{} {}", self.tag(), e);
                }
                self.send_event(SystemEvent::Error {
                    message: e.to_string(),
                });
                self.apply(Event::Initialised { ok: !e.is_fatal() });
            }
        }
        Ok(())
    }

    async fn handle(&mut self, msg: Self::Message) -> Result<(), ActorError> {
        match msg {
            ElevatorMessage::Command(ElevatorCommand::Connect { host, port }) => {
                self.handle_connect(host, port)
            }
            ElevatorMessage::Command(ElevatorCommand::Waypoint { floor }) => {
                self.handle_waypoint(floor)
            }
            ElevatorMessage::Command(ElevatorCommand::Quit) => {
                self.apply(Event::Quit);
                Ok(())
            }
            ElevatorMessage::Tick { token } => {
                self.handle_tick(token);
                Ok(())
            }
            ElevatorMessage::ConnectSucceeded { attempt, stream } => {
                self.handle_connect_succeeded(attempt, stream);
                Ok(())
            }
            ElevatorMessage::ConnectFailed { attempt, reason } => {
                self.handle_connect_failed(attempt, reason);
                Ok(())
            }
            ElevatorMessage::FromDispatcher { attempt, msg } => {
                self.handle_from_dispatcher(attempt, msg)
            }
            ElevatorMessage::DispatcherDown { attempt } => {
                self.handle_dispatcher_down(attempt);
                Ok(())
            }
            ElevatorMessage::GetCurrentFloor { reply } => {
                let _ = reply.send(self.current_floor());
                Ok(())
            }
            ElevatorMessage::GetStateName { reply } => {
                let _ = reply.send(self.state().name().to_string());
                Ok(())
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.terminated
    }

    async fn shutdown(&mut self) {
        self.pending_tick = None;
        self.connection.shutdown();
        actor_debug!("{} shut down", self.tag());
    }
}
