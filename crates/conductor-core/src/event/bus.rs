//! Broadcast event bus for distributing `WorkflowEvent` to subscribers.
//!
//! Built on `tokio::sync::broadcast`. Publishing with no active subscribers
//! is a no-op. One engine can run several workflows at once, so observers
//! that follow a single run use [`RunSubscription`].

use conductor_types::event::WorkflowEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

/// Multi-consumer bus for workflow lifecycle events.
///
/// Cloning the bus clones the sender, so the engine and any number of
/// observers can share one channel.
pub struct EventBus {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }

    /// Follow the run with id `run_id`.
    pub fn subscribe_run(&self, run_id: Uuid) -> RunSubscription {
        RunSubscription::new(self.subscribe(), Some(run_id))
    }

    /// Follow whichever run starts next.
    ///
    /// Subscribe before calling `execute` so the `RunStarted` event is seen.
    pub fn subscribe_next_run(&self) -> RunSubscription {
        RunSubscription::new(self.subscribe(), None)
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no subscribers, the event is silently dropped.
    pub fn publish(&self, event: WorkflowEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RunSubscription
// ---------------------------------------------------------------------------

/// Events of a single workflow run, ending after its `RunFinished`.
pub struct RunSubscription {
    receiver: broadcast::Receiver<WorkflowEvent>,
    run_id: Option<Uuid>,
    finished: bool,
}

impl RunSubscription {
    fn new(receiver: broadcast::Receiver<WorkflowEvent>, run_id: Option<Uuid>) -> Self {
        Self {
            receiver,
            run_id,
            finished: false,
        }
    }

    /// The followed run, once known.
    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    /// Next event of the run. `None` once the run has finished or the bus
    /// is gone. Events lost to lag are skipped.
    pub async fn recv(&mut self) -> Option<WorkflowEvent> {
        while !self.finished {
            let event = match self.receiver.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "run subscriber lagged, events dropped");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            };

            match self.run_id {
                Some(id) if id != event.run_id() => continue,
                Some(_) => {}
                None if matches!(event, WorkflowEvent::RunStarted { .. }) => {
                    self.run_id = Some(event.run_id());
                }
                None => continue,
            }

            self.finished = matches!(event, WorkflowEvent::RunFinished { .. });
            return Some(event);
        }
        None
    }
}
