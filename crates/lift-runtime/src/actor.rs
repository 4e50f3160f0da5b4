use crate::{actor_debug, actor_warn};
use futures::stream::StreamExt;
use futures_channel::mpsc;
use lift_protocol::{ActorError, SystemEvent};
use std::future::Future;

/// Actor trait for implementing message-driven components
///
/// Actors are independent, stateful components that communicate through
/// message passing. Each actor has its own message queue and processes
/// messages sequentially, so its private state needs no locking.
///
/// # Lifecycle
///
/// 1. **init()** - Called once before message processing starts
/// 2. **handle()** - Called for each received message
/// 3. **is_finished()** - Checked after each message; `true` ends the loop
/// 4. **shutdown()** - Called when the actor is stopping
///
/// The futures are required to be `Send` so actors can be spawned on the
/// multi-threaded tokio runtime.
///
/// # Example
///
/// ```ignore
/// struct MyActor {
///     count: u32,
/// }
///
/// impl Actor for MyActor {
///     type Message = MyMessage;
///
///     fn name(&self) -> &'static str {
///         "MyActor"
///     }
///
///     async fn handle(&mut self, msg: Self::Message) -> Result<(), ActorError> {
///         self.count += 1;
///         Ok(())
///     }
/// }
/// ```
pub trait Actor: Send + Sized + 'static {
    /// Message type this actor processes
    type Message: Send + 'static;

    /// Actor name (used for logging and debugging)
    fn name(&self) -> &'static str;

    /// Initialize the actor before processing messages
    ///
    /// An error here stops the actor before any message is handled.
    fn init(&mut self) -> impl Future<Output = Result<(), ActorError>> + Send {
        async { Ok(()) }
    }

    /// Handle a single message
    fn handle(
        &mut self,
        msg: Self::Message,
    ) -> impl Future<Output = Result<(), ActorError>> + Send;

    /// Has the actor reached a terminal state?
    fn is_finished(&self) -> bool {
        false
    }

    /// Clean up before shutdown
    ///
    /// Called when the actor is stopping. Use this to close connections
    /// and release resources.
    fn shutdown(&mut self) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Main actor run loop (provided by runtime)
    ///
    /// Consumes the actor and runs it until its mailbox closes or it reports
    /// itself finished. Handler errors are reported as `SystemEvent::Error`
    /// and do not stop the loop.
    fn run(
        mut self,
        mut rx: mpsc::Receiver<Self::Message>,
        event_tx: mpsc::Sender<SystemEvent>,
    ) -> impl Future<Output = ()> + Send {
        async move {
            if let Err(e) = self.init().await {
                let _ = event_tx.clone().try_send(SystemEvent::Error {
                    message: format!("{} init failed: {}", self.name(), e),
                });
                return;
            }

            actor_debug!("{} started", self.name());

            while !self.is_finished() {
                let Some(msg) = rx.next().await else {
                    break;
                };
                if let Err(e) = self.handle(msg).await {
                    actor_warn!("{} error: {}", self.name(), e);
                    let _ = event_tx.clone().try_send(SystemEvent::Error {
                        message: format!("{} error: {}", self.name(), e),
                    });
                }
            }

            self.shutdown().await;

            actor_debug!("{} stopped", self.name());
        }
    }
}

/// Spawn an actor on the current tokio runtime
pub fn spawn_actor<A>(
    actor: A,
    rx: mpsc::Receiver<A::Message>,
    event_tx: mpsc::Sender<SystemEvent>,
) -> tokio::task::JoinHandle<()>
where
    A: Actor,
{
    tokio::spawn(actor.run(rx, event_tx))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use lift_protocol::PeerKind;

    struct TestActor {
        init_called: bool,
        messages_received: Vec<String>,
        event_tx: mpsc::Sender<SystemEvent>,
    }

    impl TestActor {
        fn new(event_tx: mpsc::Sender<SystemEvent>) -> Self {
            Self {
                init_called: false,
                messages_received: Vec::new(),
                event_tx,
            }
        }
    }

    impl Actor for TestActor {
        type Message = String;

        fn name(&self) -> &'static str {
            "TestActor"
        }

        async fn init(&mut self) -> Result<(), ActorError> {
            self.init_called = true;
            Ok(())
        }

        async fn handle(&mut self, msg: Self::Message) -> Result<(), ActorError> {
            assert!(self.init_called);
            self.messages_received.push(msg.clone());
            let _ = self.event_tx.clone().try_send(SystemEvent::PeerRegistered {
                name: msg,
                kind: PeerKind::Passenger,
            });
            Ok(())
        }

        fn is_finished(&self) -> bool {
            self.messages_received.last().is_some_and(|m| m == "stop")
        }
    }

    #[tokio::test]
    async fn test_actor_lifecycle() {
        let (mut tx, rx) = mpsc::channel(100);
        let (event_tx, event_rx) = mpsc::channel(100);

        let actor = TestActor::new(event_tx.clone());

        tx.try_send("msg1".into()).ok();
        tx.try_send("msg2".into()).ok();
        drop(tx); // Close channel to stop actor

        actor.run(rx, event_tx).await;

        let events: Vec<_> = event_rx.collect().await;
        assert_eq!(events.len(), 2);
        match &events[0] {
            SystemEvent::PeerRegistered { name, .. } => {
                assert_eq!(name, "msg1");
            }
            _ => panic!("Wrong event type"),
        }
        match &events[1] {
            SystemEvent::PeerRegistered { name, .. } => {
                assert_eq!(name, "msg2");
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[tokio::test]
    async fn test_actor_stops_when_finished() {
        let (mut tx, rx) = mpsc::channel(100);
        let (event_tx, event_rx) = mpsc::channel(100);

        tx.try_send("stop".into()).ok();
        tx.try_send("never handled".into()).ok();

        // Sender still alive: only is_finished() can end the loop
        TestActor::new(event_tx.clone()).run(rx, event_tx).await;

        let events: Vec<_> = event_rx.collect().await;
        assert_eq!(events.len(), 1);
        drop(tx);
    }

    #[tokio::test]
    async fn test_actor_error_handling() {
        struct FailingActor;

        impl Actor for FailingActor {
            type Message = String;

            fn name(&self) -> &'static str {
                "FailingActor"
            }

            async fn init(&mut self) -> Result<(), ActorError> {
                Err(ActorError::Other("Init failed".into()))
            }

            async fn handle(&mut self, _msg: Self::Message) -> Result<(), ActorError> {
                Ok(())
            }
        }

        let (_tx, rx) = mpsc::channel(100);
        let (event_tx, event_rx) = mpsc::channel(100);

        FailingActor.run(rx, event_tx).await;

        let events: Vec<_> = event_rx.collect().await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            SystemEvent::Error { message } => {
                assert!(message.contains("init failed"));
            }
            _ => panic!("Wrong event type"),
        }
    }
}
