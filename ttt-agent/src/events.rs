//! State-change notifications for local observers.
//!
//! Every successful operation emits exactly one [`GameStateChanged`], after
//! the record is persisted. Rejected operations emit nothing.

use tokio::sync::broadcast;
use ttt_core::{GameRecord, GameState};
use ttt_types::GameId;

use crate::error::AgentError;

/// A game changed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameStateChanged {
    /// The record as persisted.
    pub record: GameRecord,
    /// State before the change, `None` when the record was just created.
    pub previous_state: Option<GameState>,
}

/// Receives state-change notifications. Fire-and-forget.
pub trait EventNotifier: Send + Sync {
    /// Announce a state change.
    fn notify(&self, event: GameStateChanged);
}

/// Fan-out to any number of in-process subscribers.
///
/// Subscribers see events in the order operations completed. A subscriber
/// that falls more than `capacity` events behind loses the oldest ones.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<GameStateChanged>,
}

impl BroadcastNotifier {
    /// Create a notifier buffering `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<GameStateChanged> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventNotifier for BroadcastNotifier {
    fn notify(&self, event: GameStateChanged) {
        if self.sender.send(event).is_err() {
            tracing::trace!("No subscribers for game state change");
        }
    }
}

/// Wait until it is the local player's turn.
///
/// Resolves with the first event whose record is `NotStarted` or `MyTurn`
/// (or `Done` when `until_done` is set). With `game` set, events of other
/// games are skipped; without it the first matching game wins, which is how
/// a responder learns the id of a game it was just invited to.
pub async fn wait_for_turn(
    events: &mut broadcast::Receiver<GameStateChanged>,
    game: Option<&GameId>,
    until_done: bool,
) -> Result<GameRecord, AgentError> {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!("Event subscriber lagged, {} events dropped", missed);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return Err(AgentError::EventsClosed),
        };

        if game.is_some_and(|id| *id != event.record.id) {
            continue;
        }
        let ready = match event.record.state {
            GameState::NotStarted | GameState::MyTurn => true,
            GameState::Done => until_done,
            GameState::TheirTurn => false,
        };
        if ready {
            return Ok(event.record);
        }
    }
}
