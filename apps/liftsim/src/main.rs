//! liftsim: run a dispatcher or one simulated elevator
//!
//! ```text
//! liftsim dispatcher [--listen 0.0.0.0:4242]
//! liftsim elevator --name lift-1 [--connect 127.0.0.1:4242]
//! ```
//!
//! Both roles read operator commands from stdin and print observer events to
//! stdout. Logs go to stderr; set `RUST_LOG=debug` for the per-floor trace.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::todo
)]

mod config;
mod console;

use clap::{Parser, Subcommand};
use config::FileConfig;
use console::{DispatcherLine, ElevatorLine};
use futures::StreamExt;
use futures_channel::mpsc;
use lift_actors::{listen, DispatcherActor, ElevatorActor};
use lift_protocol::{
    ActorError, DispatcherCommand, ElevatorCommand, PeerKind, SystemEvent,
};
use lift_runtime::{actor_error, actor_info, spawn_actor, ChannelManager};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Parser)]
#[command(name = "liftsim", version, about = "Networked elevator simulator")]
struct Cli {
    /// TOML file with [elevator] and [network] sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    role: Role,
}

#[derive(Debug, Subcommand)]
enum Role {
    /// Accept elevator and passenger connections
    Dispatcher {
        /// Address to bind, host:port
        #[arg(long)]
        listen: Option<String>,
    },
    /// Run one simulated elevator
    Elevator {
        /// Name this elevator registers under
        #[arg(long, default_value = "lift-1")]
        name: String,

        /// Dispatcher to connect to on startup, host:port
        #[arg(long)]
        connect: Option<String>,

        /// Override the configured start floor
        #[arg(long)]
        start_floor: Option<i32>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match config::load(cli.config.as_deref()) {
        Ok(file_config) => match cli.role {
            Role::Dispatcher { listen } => run_dispatcher(file_config, listen).await,
            Role::Elevator {
                name,
                connect,
                start_floor,
            } => run_elevator(file_config, name, connect, start_floor).await,
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            actor_error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Print observer events until the channel closes
async fn print_events(mut events: mpsc::Receiver<SystemEvent>) {
    while let Some(event) = events.next().await {
        println!("{}", console::describe(&event));
    }
}

async fn run_elevator(
    file_config: FileConfig,
    name: String,
    connect: Option<String>,
    start_floor: Option<i32>,
) -> Result<(), ActorError> {
    let mut elevator_config = file_config.elevator;
    if let Some(floor) = start_floor {
        elevator_config.start_floor = floor;
    }
    let network = file_config.network;

    let (mut manager, handles) = ChannelManager::new();
    tokio::spawn(print_events(manager.take_event_receiver()));

    let elevator = ElevatorActor::new(
        name.clone(),
        elevator_config,
        manager.elevator_sender(),
        handles.event_tx.clone(),
    )
    .with_supervision(network.supervision());
    let mut task = spawn_actor(elevator, handles.elevator_rx, handles.event_tx);
    actor_info!("elevator {} started", name);

    if let Some(endpoint) = connect {
        let (host, port) = console::parse_endpoint(&endpoint).map_err(ActorError::Config)?;
        manager.send_elevator_command(ElevatorCommand::Connect { host, port })?;
    }

    println!("{}", console::ELEVATOR_USAGE);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = &mut task => {
                // Quit or failed initialisation
                return Ok(());
            }
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                // stdin closed: same as quit
                manager.send_elevator_command(ElevatorCommand::Quit)?;
                break;
            }
            Err(e) => return Err(ActorError::Other(format!("Cannot read stdin: {}", e))),
        };

        let command = match console::parse_elevator(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}\n{}", e, console::ELEVATOR_USAGE);
                continue;
            }
        };

        let outcome = match command {
            ElevatorLine::Connect(endpoint) => {
                let (host, port) = endpoint.unwrap_or_else(|| {
                    (network.dispatcher_host.clone(), network.dispatcher_port)
                });
                manager.send_elevator_command(ElevatorCommand::Connect { host, port })
            }
            ElevatorLine::Waypoint(floor) => {
                manager.send_elevator_command(ElevatorCommand::Waypoint { floor })
            }
            ElevatorLine::Floor => manager
                .current_floor()
                .await
                .map(|floor| println!("floor {}", floor)),
            ElevatorLine::State => manager
                .state_name()
                .await
                .map(|state| println!("state {}", state)),
            ElevatorLine::Quit => {
                manager.send_elevator_command(ElevatorCommand::Quit)?;
                break;
            }
            ElevatorLine::Help => {
                println!("{}", console::ELEVATOR_USAGE);
                Ok(())
            }
        };
        if let Err(e) = outcome {
            println!("error: {}", e);
        }
    }

    task.await
        .map_err(|e| ActorError::Other(format!("Elevator task failed: {}", e)))
}

async fn run_dispatcher(file_config: FileConfig, listen_at: Option<String>) -> Result<(), ActorError> {
    let addr = listen_at.unwrap_or_else(|| file_config.network.listen_addr());

    let (mut manager, handles) = ChannelManager::new();
    tokio::spawn(print_events(manager.take_event_receiver()));

    let (bound, listener) = listen(addr.as_str(), manager.dispatcher_sender())
        .await
        .map_err(|e| {
            ActorError::Transport(format!(
                "Cannot listen on {}: {}. Pick another address with --listen.",
                addr, e
            ))
        })?;
    let dispatcher = DispatcherActor::new(manager.dispatcher_sender(), handles.event_tx.clone())
        .with_listener(listener);
    let mut task = spawn_actor(dispatcher, handles.dispatcher_rx, handles.event_tx);
    actor_info!("dispatcher listening on {}", bound);

    println!("{}", console::DISPATCHER_USAGE);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = &mut task => return Ok(()),
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                manager.send_dispatcher_command(DispatcherCommand::Shutdown)?;
                break;
            }
            Err(e) => return Err(ActorError::Other(format!("Cannot read stdin: {}", e))),
        };

        let command = match console::parse_dispatcher(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}\n{}", e, console::DISPATCHER_USAGE);
                continue;
            }
        };

        let outcome = match command {
            DispatcherLine::List => manager.elevators().await.map(|elevators| {
                if elevators.is_empty() {
                    println!("no elevators registered");
                }
                for elevator in elevators {
                    let floor = elevator
                        .floor
                        .map_or_else(|| "?".to_string(), |f| f.to_string());
                    let state = elevator
                        .state
                        .map_or_else(|| "?".to_string(), |s| s.to_string());
                    println!("{}  floor {}  {}", elevator.name, floor, state);
                }
            }),
            DispatcherLine::Passengers => manager
                .peers(PeerKind::Passenger)
                .await
                .map(|names| println!("passengers: {}", names.join(", "))),
            DispatcherLine::Send { elevator, floor } => manager
                .send_dispatcher_command(DispatcherCommand::SendWaypoint { elevator, floor }),
            DispatcherLine::Call(floor) => {
                manager.send_dispatcher_command(DispatcherCommand::Call { floor })
            }
            DispatcherLine::Quit => {
                manager.send_dispatcher_command(DispatcherCommand::Shutdown)?;
                break;
            }
            DispatcherLine::Help => {
                println!("{}", console::DISPATCHER_USAGE);
                Ok(())
            }
        };
        if let Err(e) = outcome {
            println!("error: {}", e);
        }
    }

    task.await
        .map_err(|e| ActorError::Other(format!("Dispatcher task failed: {}", e)))
}
