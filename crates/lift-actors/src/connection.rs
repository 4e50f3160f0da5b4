//! Elevator side of the dispatcher connection
//!
//! Each connect command starts a new attempt with a fresh id. Resolution and
//! connect run on a background task that reports back to the elevator's
//! mailbox; only the result carrying the current attempt id is acted on, and
//! anything older is stale and discarded. The live link carries the id of the
//! attempt that produced it so its down notification can be matched the same
//! way.

use crate::constants::link;
use futures::SinkExt;
use futures_channel::mpsc;
use lift_protocol::{ActorError, WireMessage};
use lift_runtime::{actor_debug, ElevatorMessage, PeerLink};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

/// Attempt bookkeeping plus the remote dispatcher handle
#[derive(Debug, Default)]
pub struct ConnectionManager {
    /// Address of the latest connect command
    target: Option<(String, u16)>,
    attempt: u64,
    /// Remote dispatcher handle and the attempt that produced it
    link: Option<(u64, PeerLink)>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new attempt toward `host:port`
    ///
    /// Any established link is dropped first; results of older attempts
    /// become stale.
    pub fn begin(&mut self, host: &str, port: u16) -> u64 {
        self.release();
        self.attempt = self.attempt.wrapping_add(1);
        self.target = Some((host.to_string(), port));
        self.attempt
    }

    /// Does a connect result for `attempt` still matter?
    pub fn is_current(&self, attempt: u64) -> bool {
        self.target.is_some() && attempt == self.attempt
    }

    /// Does `attempt` own the live link?
    pub fn owns_link(&self, attempt: u64) -> bool {
        self.link.as_ref().is_some_and(|(owner, _)| *owner == attempt)
    }

    pub fn target(&self) -> Option<(&str, u16)> {
        self.target.as_ref().map(|(host, port)| (host.as_str(), *port))
    }

    /// Current attempt id (0 before the first connect)
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Install the link produced by `attempt`
    pub fn establish(&mut self, attempt: u64, link: PeerLink) {
        self.link = Some((attempt, link));
    }

    /// Forget the link of `attempt` after its peer went down
    ///
    /// Returns false when the notification is about a link that is no longer
    /// ours.
    pub fn lose(&mut self, attempt: u64) -> bool {
        if !self.owns_link(attempt) {
            return false;
        }
        self.link = None;
        true
    }

    /// Drop the live link, closing the socket
    pub fn release(&mut self) {
        if let Some((attempt, link)) = self.link.take() {
            actor_debug!(
                "Releasing dispatcher link {:?} (attempt {})",
                link.peer_addr(),
                attempt
            );
        }
    }

    /// Flush and close the link, and make every outstanding attempt stale
    pub fn shutdown(&mut self) {
        if let Some((attempt, link)) = self.link.take() {
            actor_debug!(
                "Closing dispatcher link {:?} (attempt {})",
                link.peer_addr(),
                attempt
            );
            link.close(Duration::from_millis(link::CLOSE_LINGER_MS));
        }
        self.target = None;
    }

    /// Send to the dispatcher if connected
    ///
    /// Returns Ok(false) when there is no link.
    pub fn send(&self, msg: WireMessage) -> Result<bool, ActorError> {
        match &self.link {
            Some((_, link)) => link.send(msg).map(|()| true),
            None => Ok(false),
        }
    }
}

/// Resolve and connect on a background task
///
/// Exactly one of `ConnectSucceeded` / `ConnectFailed` tagged with `attempt`
/// is posted to `inbox`, unless the elevator is gone by then.
pub fn spawn_connect(
    host: String,
    port: u16,
    attempt: u64,
    timeout: Duration,
    inbox: mpsc::Sender<ElevatorMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result =
            tokio::time::timeout(timeout, TcpStream::connect((host.as_str(), port))).await;

        let msg = match result {
            Ok(Ok(stream)) => ElevatorMessage::ConnectSucceeded { attempt, stream },
            Ok(Err(e)) => ElevatorMessage::ConnectFailed {
                attempt,
                reason: e.to_string(),
            },
            Err(_) => ElevatorMessage::ConnectFailed {
                attempt,
                reason: format!("no answer within {}s", timeout.as_secs()),
            },
        };

        let mut inbox = inbox;
        if inbox.send(msg).await.is_err() {
            actor_debug!("Elevator gone before connect attempt {} finished", attempt);
        }
    })
}
