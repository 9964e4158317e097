//! TicTacToeApi - the agent-facing entry points.
//!
//! Wraps [`TicTacToeService`] with a [`Transport`]: local intents send their
//! Move to the game's peer, and inbound messages are routed to the service
//! with any reply sent back on the connection they arrived on.
//!
//! # Example
//!
//! ```ignore
//! let (alice, bob) = LoopbackNetwork::pair("alice", "bob", 16);
//! let api = TicTacToeApi::new(
//!     TicTacToeService::new(MemoryGameStore::new(), BroadcastNotifier::new(16)),
//!     alice.endpoint,
//! );
//! let game = api.start_game(&alice.connection_id, Some("X:A1")).await?;
//! api.make_move(&game.id, "X:B2").await?;
//! ```

use tokio::sync::broadcast;
use ttt_core::GameRecord;
use ttt_types::{ConnectionId, GameId, Inbound, ProtocolMessage};

use crate::error::{AgentError, Result};
use crate::events::{BroadcastNotifier, EventNotifier, GameStateChanged};
use crate::service::{Handled, TicTacToeService};
use crate::storage::{GameQuery, GameStore};
use crate::transport::{Inbox, Transport};

/// A game-playing agent: service plus transport.
pub struct TicTacToeApi<S, N, T> {
    service: TicTacToeService<S, N>,
    transport: T,
}

impl<S, N, T> std::fmt::Debug for TicTacToeApi<S, N, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicTacToeApi")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl<S: GameStore, N: EventNotifier, T: Transport> TicTacToeApi<S, N, T> {
    /// Create an agent from its service and transport.
    pub fn new(service: TicTacToeService<S, N>, transport: T) -> Self {
        Self { service, transport }
    }

    /// Get access to the service.
    pub fn service(&self) -> &TicTacToeService<S, N> {
        &self.service
    }

    /// Get access to the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Start a game with the peer on `connection_id` and send the opening Move.
    ///
    /// The record is persisted before the send; a transport failure is
    /// returned but does not undo it.
    pub async fn start_game(
        &self,
        connection_id: &ConnectionId,
        first_move: Option<&str>,
    ) -> Result<GameRecord> {
        if !self.transport.has_connection(connection_id) {
            return Err(AgentError::UnknownConnection(connection_id.to_string()));
        }
        let handled = self
            .service
            .create_game(connection_id.clone(), first_move)
            .await?;
        self.deliver(connection_id, handled).await
    }

    /// Play `token` on `game_id` and send it to the peer.
    pub async fn make_move(&self, game_id: &GameId, token: &str) -> Result<GameRecord> {
        let handled = self.service.make_move(game_id, token).await?;
        let connection_id = handled.record.connection_id.clone();
        self.deliver(&connection_id, handled).await
    }

    /// Route one inbound message to the service.
    ///
    /// A Move that finishes the game is answered with an Outcome on the
    /// connection it arrived on.
    pub async fn dispatch(&self, inbound: Inbound<ProtocolMessage>) -> Result<GameRecord> {
        let Inbound {
            message,
            connection_id,
        } = inbound;

        let handled = match message {
            ProtocolMessage::Move(message) => {
                self.service
                    .process_move(&Inbound::new(message, connection_id.clone()))
                    .await?
            }
            ProtocolMessage::Outcome(message) => {
                self.service
                    .process_outcome(&Inbound::new(message, connection_id.clone()))
                    .await?
            }
        };
        self.deliver(&connection_id, handled).await
    }

    /// Dispatch every message from `inbox` until it closes.
    ///
    /// Rejected messages are logged and skipped; one bad message does not
    /// stop the agent.
    pub async fn run(&self, mut inbox: Inbox) {
        while let Some(inbound) = inbox.recv().await {
            let kind = inbound.message.message_type();
            let thread_id = inbound.message.thread_id();
            let from = inbound.connection_id.clone();

            match self.dispatch(inbound).await {
                Ok(record) => tracing::debug!(
                    "Handled {} on thread {}, game {} now {}",
                    kind.uri(),
                    thread_id,
                    record.id,
                    record.state
                ),
                Err(e) => tracing::warn!(
                    "Rejected {} from {} on thread {}: {}",
                    kind.uri(),
                    from,
                    thread_id,
                    e
                ),
            }
        }
        tracing::debug!("Inbox closed");
    }

    /// Get a game by id.
    pub async fn find_game(&self, game_id: &GameId) -> Result<Option<GameRecord>> {
        self.service.find_game(game_id).await
    }

    /// All games matching `query`, oldest first.
    pub async fn find_games(&self, query: &GameQuery) -> Result<Vec<GameRecord>> {
        self.service.find_games(query).await
    }

    async fn deliver(&self, connection_id: &ConnectionId, handled: Handled) -> Result<GameRecord> {
        if let Some(message) = handled.outbound {
            let kind = message.message_type();
            self.transport.send(connection_id, message).await?;
            tracing::info!(
                "Sent {} for game {} on {}",
                kind.uri(),
                handled.record.id,
                connection_id
            );
        }
        Ok(handled.record)
    }
}

impl<S: GameStore, T: Transport> TicTacToeApi<S, BroadcastNotifier, T> {
    /// Subscribe to this agent's state-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<GameStateChanged> {
        self.service.notifier().subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryGameStore;
    use crate::transport::{MockTransport, TransportError};
    use ttt_core::{GameError, GameState};
    use ttt_types::{Mark, MoveMessage, OutcomeMessage, ThreadId};

    type Api = TicTacToeApi<MemoryGameStore, BroadcastNotifier, MockTransport>;

    fn api() -> (Api, MockTransport) {
        let transport = MockTransport::new();
        let service = TicTacToeService::new(MemoryGameStore::new(), BroadcastNotifier::new(16));
        (TicTacToeApi::new(service, transport.clone()), transport)
    }

    fn peer() -> ConnectionId {
        ConnectionId::new("peer")
    }

    #[tokio::test]
    async fn start_game_sends_opening_move() {
        let (api, transport) = api();

        let game = api.start_game(&peer(), Some("X:A1")).await.unwrap();

        let (conn, message) = transport.last_sent().unwrap();
        assert_eq!(conn, peer());
        assert_eq!(message.thread_id(), game.thread_id);
        // The opening message's own id is the thread id.
        assert_eq!(ThreadId::from(message.id()), game.thread_id);
    }

    #[tokio::test]
    async fn start_game_on_unknown_connection_fails_before_persisting() {
        let (api, transport) = api();
        transport.close(&peer());

        let err = api.start_game(&peer(), Some("X:A1")).await.unwrap_err();

        assert!(matches!(err, AgentError::UnknownConnection(_)));
        assert!(api.find_games(&GameQuery::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_failure_is_reported_after_persisting() {
        let (api, transport) = api();
        transport.fail_next_send("boom");

        let err = api.start_game(&peer(), Some("X:A1")).await.unwrap_err();

        assert!(matches!(
            err,
            AgentError::Transport(TransportError::SendFailed(_))
        ));
        assert_eq!(api.find_games(&GameQuery::all()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dispatch_first_contact_sends_nothing() {
        let (api, transport) = api();
        let mut events = api.subscribe();

        let record = api
            .dispatch(Inbound::new(
                MoveMessage::open_thread(Some("X:A1".parse().unwrap())).into(),
                peer(),
            ))
            .await
            .unwrap();

        assert_eq!(record.state, GameState::MyTurn);
        assert!(transport.sent_messages().is_empty());
        assert_eq!(events.try_recv().unwrap().record.id, record.id);
    }

    #[tokio::test]
    async fn dispatch_winning_move_answers_on_arrival_connection() {
        let (api, transport) = api();
        let opening = MoveMessage::open_thread(Some("X:A1".parse().unwrap()));
        let thread = opening.thread_id;
        let arrival = ConnectionId::new("arrival");

        let game = api
            .dispatch(Inbound::new(opening.into(), arrival.clone()))
            .await
            .unwrap();
        api.make_move(&game.id, "O:B1").await.unwrap();
        api.dispatch(Inbound::new(
            MoveMessage::in_thread(thread, Some("X:A2".parse().unwrap())).into(),
            arrival.clone(),
        ))
        .await
        .unwrap();
        api.make_move(&game.id, "O:B2").await.unwrap();
        let done = api
            .dispatch(Inbound::new(
                MoveMessage::in_thread(thread, Some("X:A3".parse().unwrap())).into(),
                arrival.clone(),
            ))
            .await
            .unwrap();

        assert_eq!(done.state, GameState::Done);
        let (conn, message) = transport.last_sent().unwrap();
        assert_eq!(conn, arrival);
        assert_eq!(
            message,
            ProtocolMessage::Outcome(OutcomeMessage {
                id: message.id(),
                thread_id: thread,
                winner: Mark::Cross,
                comment: None,
            })
        );
    }

    #[tokio::test]
    async fn dispatch_outcome_for_unknown_thread_is_not_found() {
        let (api, _transport) = api();
        let err = api
            .dispatch(Inbound::new(
                OutcomeMessage::in_thread(ThreadId::new(), Mark::Circle).into(),
                peer(),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Game(GameError::NotFound(_))));
    }

    #[tokio::test]
    async fn run_skips_rejected_messages() {
        let (api, _transport) = api();
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let opening = MoveMessage::open_thread(Some("X:A1".parse().unwrap()));
        let thread = opening.thread_id;

        tx.send(Inbound::new(opening.into(), peer())).await.unwrap();
        // Not the opponent's turn: rejected, logged, skipped.
        tx.send(Inbound::new(
            MoveMessage::in_thread(thread, Some("X:B1".parse().unwrap())).into(),
            peer(),
        ))
        .await
        .unwrap();
        tx.send(Inbound::new(
            MoveMessage::open_thread(None).into(),
            peer(),
        ))
        .await
        .unwrap();
        drop(tx);

        api.run(rx).await;

        let games = api.find_games(&GameQuery::all()).await.unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].moves.len(), 1);
        assert_eq!(games[1].state, GameState::NotStarted);
    }
}
