//! TicTacToeService - runs the game state machine against a store.
//!
//! The service owns no game state of its own. For each operation it locks the
//! game's thread, reads the record, asks `ttt-core` for the transition, and
//! interprets the returned actions:
//!
//! ```text
//! intent / inbound ──► lock(thread) ──► store ──► ttt-core transition
//!                                                      │
//!                  outbound message ◄── notify ◄── persist
//! ```
//!
//! A rejected transition returns before anything is persisted or emitted.

use std::time::{SystemTime, UNIX_EPOCH};
use ttt_core::{parse_move, Action, GameError, GameRecord, GameState, Transition};
use ttt_types::{
    ConnectionId, GameId, Inbound, MoveMessage, OutcomeMessage, ProtocolMessage, ThreadId,
};

use crate::error::{AgentError, Result};
use crate::events::{EventNotifier, GameStateChanged};
use crate::locks::GameLocks;
use crate::storage::{GameQuery, GameStore};

/// What an operation left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handled {
    /// The record as persisted.
    pub record: GameRecord,
    /// State before the operation, `None` if the record was created by it.
    pub previous_state: Option<GameState>,
    /// Message to send to the peer on the record's connection, if any.
    pub outbound: Option<ProtocolMessage>,
}

/// Game protocol engine bound to one party's store and notifier.
pub struct TicTacToeService<S, N> {
    store: S,
    notifier: N,
    locks: GameLocks,
}

impl<S, N> std::fmt::Debug for TicTacToeService<S, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicTacToeService")
            .field("locked_threads", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl<S: GameStore, N: EventNotifier> TicTacToeService<S, N> {
    /// Create a service over `store`, announcing changes to `notifier`.
    pub fn new(store: S, notifier: N) -> Self {
        Self {
            store,
            notifier,
            locks: GameLocks::new(),
        }
    }

    /// Get access to the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get access to the notifier.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Start a game on `connection_id`, optionally playing the first move.
    ///
    /// The outbound Move opens a new thread; its id is the thread id.
    pub async fn create_game(
        &self,
        connection_id: ConnectionId,
        first_move: Option<&str>,
    ) -> Result<Handled> {
        let first_move = first_move.map(parse_move).transpose()?;
        // Fresh thread id: nothing can contend for it yet.
        let transition = GameRecord::start(
            GameId::new(),
            current_timestamp(),
            connection_id,
            ThreadId::new(),
            first_move,
        );
        self.apply(transition).await
    }

    /// Apply an inbound Move.
    ///
    /// An unknown thread creates the game with this party as responder. A
    /// Move that finishes the game yields an Outcome for the sender.
    pub async fn process_move(&self, inbound: &Inbound<MoveMessage>) -> Result<Handled> {
        let message = &inbound.message;
        let _guard = self.locks.lock(&message.thread_id).await;

        let transition = match self.store.find_by_thread_id(&message.thread_id).await? {
            Some(record) => record.receive_move(message.move_token.as_ref())?,
            None => {
                tracing::debug!(
                    "Game for thread {} not found, starting a new one on {}",
                    message.thread_id,
                    inbound.connection_id
                );
                GameRecord::from_first_contact(
                    GameId::new(),
                    current_timestamp(),
                    inbound.connection_id.clone(),
                    message.thread_id,
                    message.move_token.clone(),
                )
            }
        };
        self.apply(transition).await
    }

    /// Apply an inbound Outcome.
    pub async fn process_outcome(&self, inbound: &Inbound<OutcomeMessage>) -> Result<Handled> {
        let message = &inbound.message;
        let _guard = self.locks.lock(&message.thread_id).await;

        let record = self
            .store
            .find_by_thread_id(&message.thread_id)
            .await?
            .ok_or_else(|| GameError::NotFound(message.thread_id.to_string()))?;

        let transition = record.receive_outcome(message.winner)?;
        self.apply(transition).await
    }

    /// Play `token` on game `game_id`.
    pub async fn make_move(&self, game_id: &GameId, token: &str) -> Result<Handled> {
        let token = parse_move(token)?;

        let thread_id = self.load(game_id).await?.thread_id;
        let _guard = self.locks.lock(&thread_id).await;

        // Re-read under the lock; an inbound message may have landed meanwhile.
        let record = self.load(game_id).await?;
        let transition = record.make_move(&token)?;
        self.apply(transition).await
    }

    /// Outcome message announcing the winner of a finished game.
    pub fn create_outcome(&self, record: &GameRecord) -> Result<OutcomeMessage> {
        match record.winner {
            Some(winner) => Ok(OutcomeMessage::in_thread(record.thread_id, winner)),
            None => Err(AgentError::NoWinner(record.id)),
        }
    }

    /// Get a game by id.
    pub async fn find_game(&self, game_id: &GameId) -> Result<Option<GameRecord>> {
        Ok(self.store.find_by_id(game_id).await?)
    }

    /// All games matching `query`, oldest first.
    pub async fn find_games(&self, query: &GameQuery) -> Result<Vec<GameRecord>> {
        Ok(self.store.find_by_query(query).await?)
    }

    async fn load(&self, game_id: &GameId) -> Result<GameRecord> {
        self.store
            .find_by_id(game_id)
            .await?
            .ok_or_else(|| GameError::NotFound(game_id.to_string()).into())
    }

    /// Persist the transition's record, then carry out its actions in order.
    async fn apply(&self, transition: Transition) -> Result<Handled> {
        if transition.is_new() {
            self.store.create(&transition.record).await?;
        } else {
            self.store.update(&transition.record).await?;
        }

        let Transition {
            record,
            previous_state,
            actions,
        } = transition;

        let mut outbound: Option<ProtocolMessage> = None;
        for action in actions {
            match action {
                Action::OpenThread { token } => {
                    outbound = Some(MoveMessage::opening(record.thread_id, token).into());
                }
                Action::SendMove { token } => {
                    outbound = Some(MoveMessage::in_thread(record.thread_id, Some(token)).into());
                }
                Action::SendOutcome { .. } => {
                    outbound = Some(self.create_outcome(&record)?.into());
                }
                Action::EmitStateChanged { previous_state } => {
                    self.notifier.notify(GameStateChanged {
                        record: record.clone(),
                        previous_state,
                    });
                }
            }
        }

        match previous_state {
            Some(previous) => tracing::info!(
                "Game {} ({}): {} -> {}",
                record.id,
                record.thread_id,
                previous,
                record.state
            ),
            None => tracing::info!(
                "Game {} ({}) created on {} in state {}",
                record.id,
                record.thread_id,
                record.connection_id,
                record.state
            ),
        }

        Ok(Handled {
            record,
            previous_state,
            outbound,
        })
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BroadcastNotifier;
    use crate::storage::{MemoryGameStore, SqliteGameStore};
    use std::sync::Arc;
    use tokio::sync::broadcast;
    use ttt_core::IllegalMove;
    use ttt_types::{Mark, MoveToken};

    type Service = TicTacToeService<MemoryGameStore, BroadcastNotifier>;

    fn service() -> (Service, broadcast::Receiver<GameStateChanged>) {
        let notifier = BroadcastNotifier::new(32);
        let rx = notifier.subscribe();
        (TicTacToeService::new(MemoryGameStore::new(), notifier), rx)
    }

    fn token(s: &str) -> MoveToken {
        s.parse().unwrap()
    }

    fn inbound_move(thread_id: ThreadId, mv: Option<&str>) -> Inbound<MoveMessage> {
        Inbound::new(
            MoveMessage::in_thread(thread_id, mv.map(token)),
            ConnectionId::new("peer"),
        )
    }

    fn opening_move(mv: Option<&str>) -> Inbound<MoveMessage> {
        Inbound::new(
            MoveMessage::open_thread(mv.map(token)),
            ConnectionId::new("peer"),
        )
    }

    fn move_of(handled: &Handled) -> &MoveMessage {
        match &handled.outbound {
            Some(ProtocolMessage::Move(m)) => m,
            other => panic!("expected Move, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn create_game_with_first_move() {
        let (service, mut rx) = service();

        let handled = service
            .create_game(ConnectionId::new("peer"), Some("X:A1"))
            .await
            .unwrap();

        let record = &handled.record;
        assert_eq!(record.moves, vec![token("X:A1")]);
        assert_eq!(record.my_mark, Some(Mark::Cross));
        assert_eq!(record.state, GameState::TheirTurn);

        let message = move_of(&handled);
        assert_eq!(message.thread_id, record.thread_id);
        assert_eq!(ThreadId::from(message.id), record.thread_id);
        assert_eq!(message.move_token, Some(token("X:A1")));

        assert_eq!(
            service.find_game(&record.id).await.unwrap().as_ref(),
            Some(record)
        );
        // Starting a game is not announced.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn create_game_invitation() {
        let (service, _rx) = service();
        let handled = service
            .create_game(ConnectionId::new("peer"), None)
            .await
            .unwrap();

        assert_eq!(handled.record.state, GameState::NotStarted);
        assert_eq!(move_of(&handled).move_token, None);
    }

    #[tokio::test]
    async fn create_game_rejects_bad_token() {
        let (service, _rx) = service();
        let err = service
            .create_game(ConnectionId::new("peer"), Some("X:D4"))
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Game(GameError::InvalidMove(_))));
        assert!(service.find_games(&GameQuery::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn first_contact_creates_responder_game() {
        let (service, mut rx) = service();
        let inbound = opening_move(Some("X:A1"));

        let handled = service.process_move(&inbound).await.unwrap();

        assert_eq!(handled.record.my_mark, Some(Mark::Circle));
        assert_eq!(handled.record.state, GameState::MyTurn);
        assert_eq!(handled.record.thread_id, inbound.message.thread_id);
        assert_eq!(handled.record.connection_id, ConnectionId::new("peer"));
        assert_eq!(handled.outbound, None);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.previous_state, None);
        assert_eq!(event.record, handled.record);
    }

    #[tokio::test]
    async fn responder_move_goes_out_on_thread() {
        let (service, mut rx) = service();
        let inbound = opening_move(Some("X:A1"));
        let game = service.process_move(&inbound).await.unwrap().record;
        let _ = rx.try_recv();

        let handled = service.make_move(&game.id, "O:B1").await.unwrap();

        assert_eq!(handled.record.state, GameState::TheirTurn);
        assert_eq!(handled.record.moves, vec![token("X:A1"), token("O:B1")]);
        let message = move_of(&handled);
        assert_eq!(message.thread_id, inbound.message.thread_id);
        assert_ne!(message.id, inbound.message.id);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.previous_state, Some(GameState::MyTurn));
    }

    #[tokio::test]
    async fn make_move_rejections_leave_no_trace() {
        let (service, mut rx) = service();
        let game = service
            .process_move(&opening_move(Some("X:A1")))
            .await
            .unwrap()
            .record;
        let _ = rx.try_recv();

        let err = service.make_move(&game.id, "X:B1").await.unwrap_err();
        assert_eq!(
            err.as_game_error(),
            Some(&GameError::IllegalMove(IllegalMove::OpponentMark(Mark::Cross)))
        );

        let err = service.make_move(&game.id, "O:A1").await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Game(GameError::IllegalMove(IllegalMove::CellOccupied(_)))
        ));

        let err = service.make_move(&game.id, "O:A9").await.unwrap_err();
        assert!(matches!(err, AgentError::Game(GameError::InvalidMove(_))));

        assert_eq!(service.find_game(&game.id).await.unwrap(), Some(game));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn make_move_unknown_game_is_not_found() {
        let (service, _rx) = service();
        let err = service.make_move(&GameId::new(), "X:A1").await.unwrap_err();
        assert!(matches!(err, AgentError::Game(GameError::NotFound(_))));
    }

    #[tokio::test]
    async fn empty_move_on_existing_thread_is_illegal() {
        let (service, _rx) = service();
        let started = service
            .create_game(ConnectionId::new("peer"), Some("X:A1"))
            .await
            .unwrap()
            .record;

        let err = service
            .process_move(&inbound_move(started.thread_id, None))
            .await
            .unwrap_err();
        assert_eq!(
            err.as_game_error(),
            Some(&GameError::IllegalMove(IllegalMove::EmptyMove))
        );
    }

    #[tokio::test]
    async fn occupied_cell_inbound_is_rejected_unchanged() {
        let (service, mut rx) = service();
        let started = service
            .create_game(ConnectionId::new("peer"), Some("X:A1"))
            .await
            .unwrap()
            .record;

        let err = service
            .process_move(&inbound_move(started.thread_id, Some("O:A1")))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AgentError::Game(GameError::IllegalMove(IllegalMove::CellOccupied(_)))
        ));
        let stored = service.find_game(&started.id).await.unwrap().unwrap();
        assert_eq!(stored.moves, vec![token("X:A1")]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn winning_inbound_move_replies_with_outcome() {
        let (service, mut rx) = service();
        let opening = opening_move(Some("X:A1"));
        let thread = opening.message.thread_id;
        let game = service.process_move(&opening).await.unwrap().record;

        service.make_move(&game.id, "O:B1").await.unwrap();
        service
            .process_move(&inbound_move(thread, Some("X:A2")))
            .await
            .unwrap();
        service.make_move(&game.id, "O:B2").await.unwrap();
        let handled = service
            .process_move(&inbound_move(thread, Some("X:A3")))
            .await
            .unwrap();

        assert_eq!(handled.record.state, GameState::Done);
        assert_eq!(handled.record.winner, Some(Mark::Cross));
        match handled.outbound {
            Some(ProtocolMessage::Outcome(ref outcome)) => {
                assert_eq!(outcome.thread_id, thread);
                assert_eq!(outcome.winner, Mark::Cross);
            }
            ref other => panic!("expected Outcome, got {:?}", other),
        }

        let last = std::iter::from_fn(|| rx.try_recv().ok()).last().unwrap();
        assert_eq!(last.record.state, GameState::Done);
        assert_eq!(last.previous_state, Some(GameState::TheirTurn));
    }

    #[tokio::test]
    async fn outcome_closes_movers_game() {
        let (service, _rx) = service();
        let game = service
            .create_game(ConnectionId::new("peer"), Some("X:A1"))
            .await
            .unwrap()
            .record;
        let thread = game.thread_id;

        service
            .process_move(&inbound_move(thread, Some("O:B1")))
            .await
            .unwrap();
        service.make_move(&game.id, "X:A2").await.unwrap();
        service
            .process_move(&inbound_move(thread, Some("O:B2")))
            .await
            .unwrap();
        let after_win = service.make_move(&game.id, "X:A3").await.unwrap();
        // The mover waits for the peer to announce the win.
        assert_eq!(after_win.record.state, GameState::TheirTurn);

        let outcome = Inbound::new(
            OutcomeMessage::in_thread(thread, Mark::Cross),
            ConnectionId::new("peer"),
        );
        let handled = service.process_outcome(&outcome).await.unwrap();

        assert_eq!(handled.record.state, GameState::Done);
        assert_eq!(handled.record.winner, Some(Mark::Cross));
        assert_eq!(handled.outbound, None);
    }

    #[tokio::test]
    async fn false_outcome_is_wrong_winner() {
        let (service, _rx) = service();
        let game = service
            .create_game(ConnectionId::new("peer"), Some("X:A1"))
            .await
            .unwrap()
            .record;

        let outcome = Inbound::new(
            OutcomeMessage::in_thread(game.thread_id, Mark::Circle),
            ConnectionId::new("peer"),
        );
        let err = service.process_outcome(&outcome).await.unwrap_err();

        assert!(matches!(
            err,
            AgentError::Game(GameError::WrongWinner {
                declared: Mark::Circle,
                actual: None
            })
        ));
        let stored = service.find_game(&game.id).await.unwrap().unwrap();
        assert_eq!(stored.state, GameState::TheirTurn);
    }

    #[tokio::test]
    async fn outcome_for_unknown_thread_is_not_found() {
        let (service, _rx) = service();
        let outcome = Inbound::new(
            OutcomeMessage::in_thread(ThreadId::new(), Mark::Cross),
            ConnectionId::new("peer"),
        );
        let err = service.process_outcome(&outcome).await.unwrap_err();
        assert!(matches!(err, AgentError::Game(GameError::NotFound(_))));
    }

    #[tokio::test]
    async fn create_outcome_requires_winner() {
        let (service, _rx) = service();
        let game = service
            .create_game(ConnectionId::new("peer"), None)
            .await
            .unwrap()
            .record;
        assert!(matches!(
            service.create_outcome(&game),
            Err(AgentError::NoWinner(id)) if id == game.id
        ));
    }

    #[tokio::test]
    async fn concurrent_moves_on_one_game_admit_one() {
        let notifier = BroadcastNotifier::new(32);
        let service = Arc::new(TicTacToeService::new(
            SqliteGameStore::in_memory().await.unwrap(),
            notifier,
        ));
        let game = service
            .process_move(&opening_move(Some("X:A1")))
            .await
            .unwrap()
            .record;

        let tasks: Vec<_> = ["O:B1", "O:B2", "O:C3", "O:A3"]
            .into_iter()
            .map(|mv| {
                let service = service.clone();
                let id = game.id;
                tokio::spawn(async move { service.make_move(&id, mv).await })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 1);
        let stored = service.find_game(&game.id).await.unwrap().unwrap();
        assert_eq!(stored.moves.len(), 2);
        assert_eq!(stored.state, GameState::TheirTurn);
    }

    #[tokio::test]
    async fn finished_operations_release_their_locks() {
        let (service, _rx) = service();
        for _ in 0..1000 {
            service
                .create_game(ConnectionId::new("peer"), Some("X:A1"))
                .await
                .unwrap();
        }
        assert!(service.locks.is_empty());

        let game = service
            .process_move(&opening_move(Some("X:A1")))
            .await
            .unwrap()
            .record;
        service.make_move(&game.id, "O:B1").await.unwrap();
        service
            .process_move(&inbound_move(game.thread_id, Some("X:A2")))
            .await
            .unwrap();
        // Rejected operations release too.
        service.make_move(&game.id, "O:A1").await.unwrap_err();
        service
            .process_outcome(&Inbound::new(
                OutcomeMessage::in_thread(game.thread_id, Mark::Circle),
                ConnectionId::new("peer"),
            ))
            .await
            .unwrap_err();

        assert_eq!(service.locks.len(), 0);
    }

    #[tokio::test]
    async fn find_games_by_state() {
        let (service, _rx) = service();
        service
            .create_game(ConnectionId::new("peer"), None)
            .await
            .unwrap();
        service
            .process_move(&opening_move(Some("X:B2")))
            .await
            .unwrap();

        let mine = service
            .find_games(&GameQuery::all().state(GameState::MyTurn))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].my_mark, Some(Mark::Circle));
    }
}
