//! TCP link between an elevator and the dispatcher
//!
//! A [`PeerLink`] owns one connected socket split into a reader task and a
//! writer task. Inbound lines are decoded as [`WireMessage`]s and forwarded to
//! the owning actor's mailbox; when the peer goes away (EOF or I/O error) the
//! actor receives exactly one "down" message. That is the liveness monitor.
//! Lines that fail to decode (bad JSON, invalid UTF-8, longer than
//! [`MAX_LINE_BYTES`]) are logged and skipped; they never count as a lost peer.
//!
//! Dropping the link aborts both tasks, which closes the socket. A deliberate
//! release therefore never produces a down message.

use crate::{actor_debug, actor_warn};
use futures::{SinkExt, StreamExt};
use futures_channel::mpsc;
use lift_protocol::{ActorError, WireMessage};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

/// Outbound queue depth per link
const OUTBOUND_CAPACITY: usize = 64;

/// Longest inbound line accepted; longer lines are skipped as malformed
pub const MAX_LINE_BYTES: usize = 64 * 1024;

pub struct PeerLink {
    peer_addr: Option<SocketAddr>,
    outbound: mpsc::Sender<WireMessage>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    /// Set by [`PeerLink::close`]: how long the writer may keep draining
    linger: Option<Duration>,
}

impl PeerLink {
    /// Start reader and writer tasks for `stream`
    ///
    /// * `inbox` - mailbox of the actor that owns this link
    /// * `on_message` - wraps each decoded inbound message for the mailbox
    /// * `on_down` - message delivered once when the peer disconnects
    pub fn spawn<M, F>(stream: TcpStream, inbox: mpsc::Sender<M>, on_message: F, on_down: M) -> Self
    where
        M: Send + 'static,
        F: Fn(WireMessage) -> M + Send + 'static,
    {
        let peer_addr = stream.peer_addr().ok();
        let _ = stream.set_nodelay(true);
        let (read_half, mut write_half) = stream.into_split();
        let (outbound, mut outbound_rx) = mpsc::channel::<WireMessage>(OUTBOUND_CAPACITY);

        let mut reader_inbox = inbox;
        let reader = tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);
            let mut line = Vec::new();
            // Still inside a line that was rejected for its length
            let mut skipping = false;
            loop {
                line.clear();
                let read = (&mut reader)
                    .take(MAX_LINE_BYTES as u64 + 1)
                    .read_until(b'\n', &mut line)
                    .await;
                match read {
                    Ok(0) => {
                        actor_debug!("Peer {:?} closed the link", peer_addr);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        actor_debug!("Read from {:?} failed: {}", peer_addr, e);
                        break;
                    }
                }

                let complete = line.last() == Some(&b'\n');
                if skipping {
                    skipping = !complete;
                    continue;
                }
                if !complete && line.len() > MAX_LINE_BYTES {
                    actor_warn!(
                        "Skipping line from {:?} longer than {} bytes",
                        peer_addr,
                        MAX_LINE_BYTES
                    );
                    skipping = true;
                    continue;
                }
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }

                match WireMessage::from_bytes(&line) {
                    Ok(msg) => {
                        if reader_inbox.send(on_message(msg)).await.is_err() {
                            // Owner is gone, nobody to notify
                            return;
                        }
                    }
                    Err(e) => {
                        actor_warn!("Skipping malformed line from {:?}: {}", peer_addr, e);
                    }
                }
            }
            let _ = reader_inbox.send(on_down).await;
        });

        let writer = tokio::spawn(async move {
            while let Some(msg) = outbound_rx.next().await {
                let line = match msg.to_line() {
                    Ok(line) => line,
                    Err(e) => {
                        actor_warn!("Cannot encode {:?}: {}", msg, e);
                        continue;
                    }
                };
                if let Err(e) = write_half.write_all(line.as_bytes()).await {
                    actor_debug!("Write to {:?} failed: {}", peer_addr, e);
                    // Reader will observe the broken socket and report down
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        });

        Self {
            peer_addr,
            outbound,
            reader,
            writer,
            linger: None,
        }
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Queue a message for the peer
    pub fn send(&self, msg: WireMessage) -> Result<(), ActorError> {
        self.outbound.clone().try_send(msg).map_err(|e| {
            if e.is_disconnected() {
                ActorError::ChannelClosed(format!("Link to {:?} has closed", self.peer_addr))
            } else {
                ActorError::Transport(format!(
                    "Link to {:?} overloaded, message dropped",
                    self.peer_addr
                ))
            }
        })
    }

    /// Flush already queued messages, then close the socket
    ///
    /// The reader stops at once, so no down message follows. The writer gets
    /// at most `linger` to drain before it is aborted.
    pub fn close(mut self, linger: Duration) {
        self.linger = Some(linger);
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        self.reader.abort();
        let Some(linger) = self.linger else {
            self.writer.abort();
            return;
        };

        // The writer finishes on its own once `outbound` is dropped and drained
        let writer = self.writer.abort_handle();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(linger).await;
                    writer.abort();
                });
            }
            Err(_) => writer.abort(),
        }
    }
}

impl std::fmt::Debug for PeerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerLink")
            .field("peer_addr", &self.peer_addr)
            .finish()
    }
}
