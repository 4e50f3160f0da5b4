//! Integration tests for the actor system
//!
//! A real dispatcher listener and elevator talk over loopback TCP. Timings are
//! shortened so a whole trip takes well under a second.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use futures::stream::StreamExt;
use futures_channel::mpsc;
use lift_actors::{listen, DispatcherActor, ElevatorActor};
use lift_protocol::{
    DispatcherCommand, ElevatorCommand, ElevatorConfig, PeerKind, SystemEvent,
};
use lift_runtime::{spawn_actor, ActorHandles, ChannelManager};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task::JoinHandle;

fn fast_config() -> ElevatorConfig {
    ElevatorConfig {
        transit_ms: 20,
        dwell_ms: 20,
        ..ElevatorConfig::default()
    }
}

/// Wait until an event matching `pred` arrives
async fn wait_for<F>(events: &mut mpsc::Receiver<SystemEvent>, pred: F) -> SystemEvent
where
    F: Fn(&SystemEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.next().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("Timed out waiting for event")
}

/// Poll the elevator until it reports `state`
async fn wait_for_state(manager: &ChannelManager, state: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if manager.state_name().await.unwrap() == state {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Timed out waiting for state")
}

/// Spawn a dispatcher on an ephemeral port
async fn start_dispatcher(
    manager: &ChannelManager,
    dispatcher_rx: mpsc::Receiver<lift_runtime::DispatcherMessage>,
    event_tx: mpsc::Sender<SystemEvent>,
) -> (SocketAddr, JoinHandle<()>) {
    let (addr, listener) = listen("127.0.0.1:0", manager.dispatcher_sender())
        .await
        .expect("Should bind listener");
    let dispatcher = DispatcherActor::new(manager.dispatcher_sender(), event_tx.clone())
        .with_listener(listener);
    (addr, spawn_actor(dispatcher, dispatcher_rx, event_tx))
}

fn start_elevator(
    manager: &ChannelManager,
    elevator_rx: mpsc::Receiver<lift_runtime::ElevatorMessage>,
    event_tx: mpsc::Sender<SystemEvent>,
    config: ElevatorConfig,
) -> JoinHandle<()> {
    let elevator = ElevatorActor::new(
        "lift-1",
        config,
        manager.elevator_sender(),
        event_tx.clone(),
    );
    spawn_actor(elevator, elevator_rx, event_tx)
}

fn connect(manager: &ChannelManager, addr: SocketAddr) {
    manager
        .send_elevator_command(ElevatorCommand::Connect {
            host: addr.ip().to_string(),
            port: addr.port(),
        })
        .expect("Should send connect");
}

fn is_registered(event: &SystemEvent) -> bool {
    matches!(
        event,
        SystemEvent::PeerRegistered { name, kind: PeerKind::Elevator } if name == "lift-1"
    )
}

#[tokio::test]
async fn test_dispatcher_waypoint_moves_elevator() {
    let (mut manager, handles) = ChannelManager::new();
    let mut events = manager.take_event_receiver();
    let ActorHandles {
        elevator_rx,
        dispatcher_rx,
        event_tx,
    } = handles;

    let (addr, _dispatcher) = start_dispatcher(&manager, dispatcher_rx, event_tx.clone()).await;
    let _elevator = start_elevator(&manager, elevator_rx, event_tx, fast_config());

    connect(&manager, addr);
    wait_for(&mut events, is_registered).await;
    assert_eq!(manager.peers(PeerKind::Elevator).await.unwrap(), vec!["lift-1"]);

    manager
        .send_dispatcher_command(DispatcherCommand::SendWaypoint {
            elevator: "lift-1".into(),
            floor: 3,
        })
        .unwrap();

    wait_for(&mut events, |e| *e == SystemEvent::WaypointReached { floor: 3 }).await;
    assert_eq!(manager.current_floor().await.unwrap(), 3);
    wait_for_state(&manager, "idle").await;

    // Status reports reach the dispatcher's registry
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let elevators = manager.elevators().await.unwrap();
            if elevators.first().and_then(|e| e.floor) == Some(3) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Dispatcher should learn the new floor");
}

#[tokio::test]
async fn test_dispatcher_loss_leaves_elevator_running() {
    let (mut manager, handles) = ChannelManager::new();
    let mut events = manager.take_event_receiver();
    let ActorHandles {
        elevator_rx,
        dispatcher_rx,
        event_tx,
    } = handles;

    let (addr, dispatcher) = start_dispatcher(&manager, dispatcher_rx, event_tx.clone()).await;
    let _elevator = start_elevator(&manager, elevator_rx, event_tx, fast_config());

    connect(&manager, addr);
    wait_for(&mut events, is_registered).await;

    manager
        .send_dispatcher_command(DispatcherCommand::Shutdown)
        .unwrap();
    dispatcher.await.unwrap();

    wait_for(&mut events, |e| *e == SystemEvent::ConnectionLost).await;
    assert_eq!(manager.state_name().await.unwrap(), "idle");

    // Local waypoints still work without a dispatcher
    manager
        .send_elevator_command(ElevatorCommand::Waypoint { floor: 2 })
        .unwrap();
    wait_for(&mut events, |e| *e == SystemEvent::WaypointReached { floor: 2 }).await;

    // A fresh dispatcher accepts a later connect
    let (mut second, second_handles) = ChannelManager::new();
    let mut second_events = second.take_event_receiver();
    let (second_addr, _second_dispatcher) = start_dispatcher(
        &second,
        second_handles.dispatcher_rx,
        second_handles.event_tx.clone(),
    )
    .await;

    connect(&manager, second_addr);
    wait_for(&mut second_events, is_registered).await;
    wait_for(&mut events, |e| matches!(e, SystemEvent::Connected { .. })).await;
}

#[tokio::test]
async fn test_elevator_quit_unregisters() {
    let (mut manager, handles) = ChannelManager::new();
    let mut events = manager.take_event_receiver();
    let ActorHandles {
        elevator_rx,
        dispatcher_rx,
        event_tx,
    } = handles;

    let (addr, _dispatcher) = start_dispatcher(&manager, dispatcher_rx, event_tx.clone()).await;
    let elevator = start_elevator(&manager, elevator_rx, event_tx, fast_config());

    connect(&manager, addr);
    wait_for(&mut events, is_registered).await;

    manager
        .send_elevator_command(ElevatorCommand::Quit)
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), elevator)
        .await
        .expect("Elevator should stop after quit")
        .unwrap();

    wait_for(&mut events, |e| {
        *e == SystemEvent::PeerLost {
            name: "lift-1".into(),
        }
    })
    .await;
    assert!(manager.elevators().await.unwrap().is_empty());

    // Mailbox is gone with the actor
    assert!(manager
        .send_elevator_command(ElevatorCommand::Waypoint { floor: 1 })
        .is_err());
}

#[tokio::test]
async fn test_failed_connect_is_retryable() {
    let (mut manager, handles) = ChannelManager::new();
    let mut events = manager.take_event_receiver();
    let ActorHandles {
        elevator_rx,
        dispatcher_rx,
        event_tx,
    } = handles;

    let _elevator = start_elevator(&manager, elevator_rx, event_tx.clone(), fast_config());

    // Nobody listens on a port we just released
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    connect(&manager, closed);
    wait_for(&mut events, |e| {
        matches!(e, SystemEvent::Error { message } if message.contains("Cannot connect"))
    })
    .await;
    assert_eq!(manager.state_name().await.unwrap(), "disconnected");

    let (addr, _dispatcher) = start_dispatcher(&manager, dispatcher_rx, event_tx).await;
    connect(&manager, addr);
    wait_for(&mut events, is_registered).await;
    wait_for_state(&manager, "idle").await;
}

#[tokio::test]
async fn test_invalid_config_quits_immediately() {
    let (mut manager, handles) = ChannelManager::new();
    let mut events = manager.take_event_receiver();

    let config = ElevatorConfig {
        floor_min: 5,
        floor_max: 1,
        ..fast_config()
    };
    let elevator = start_elevator(&manager, handles.elevator_rx, handles.event_tx, config);

    wait_for(&mut events, |e| matches!(e, SystemEvent::Error { .. })).await;
    tokio::time::timeout(Duration::from_secs(5), elevator)
        .await
        .expect("Elevator should stop")
        .unwrap();
}
