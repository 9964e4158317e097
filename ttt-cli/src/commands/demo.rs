//! Two agents, Alice and Bob, play a game over a loopback network.
//!
//! Alice opens with X:A1 and plays down column A; Bob answers O:B1, O:B2.
//! Each agent runs its own inbox loop and waits on its own state-change
//! events before moving, as two separate processes would.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use ttt_agent::{
    wait_for_turn, AgentConfig, BroadcastNotifier, GameStateChanged, GameStore,
    LoopbackEndpoint, LoopbackNetwork, LoopbackPeer, TicTacToeApi, TicTacToeService,
};
use ttt_core::GameRecord;
use ttt_types::{ConnectionId, GameId};

type Agent = Arc<TicTacToeApi<Arc<dyn GameStore>, BroadcastNotifier, LoopbackEndpoint>>;

const ALICE_MOVES: [&str; 3] = ["X:A1", "X:A2", "X:A3"];
const BOB_MOVES: [&str; 2] = ["O:B1", "O:B2"];

/// Run the demo command.
pub async fn run(config: &AgentConfig, timeout: Duration) -> Result<()> {
    let (alice, bob) = play(config, timeout).await?;

    for (name, record) in [("Alice", &alice), ("Bob", &bob)] {
        println!("=== {} ===", name);
        print_record(record);
        println!();
    }
    println!(
        "{}",
        alice.board().context("Alice's record holds an invalid board")?
    );
    Ok(())
}

/// Play the scripted game and return Alice's and Bob's final records.
pub async fn play(config: &AgentConfig, timeout: Duration) -> Result<(GameRecord, GameRecord)> {
    let (a, b) = LoopbackNetwork::pair("alice", "bob", config.events.capacity);
    let alice = Player::spawn(&config.for_agent("alice"), a).await?;
    let bob = Player::spawn(&config.for_agent("bob"), b).await?;
    tracing::info!(
        "Agents ready ({} storage), starting the game",
        config.storage.backend
    );

    let bob_task = tokio::spawn(bob.respond(timeout));
    let alice_done = alice.open(timeout).await?;
    let bob_done = bob_task.await.context("Bob's task failed")??;

    Ok((alice_done, bob_done))
}

struct Player {
    api: Agent,
    connection: ConnectionId,
    events: broadcast::Receiver<GameStateChanged>,
}

impl Player {
    async fn spawn(config: &AgentConfig, peer: LoopbackPeer) -> Result<Self> {
        let store = config
            .open_store()
            .await
            .with_context(|| format!("Failed to open store for {}", config.agent.name))?;
        let api: Agent = Arc::new(TicTacToeApi::new(
            TicTacToeService::new(store, config.notifier()),
            peer.endpoint,
        ));
        let events = api.subscribe();

        let runner = api.clone();
        let inbox = peer.inbox;
        tokio::spawn(async move { runner.run(inbox).await });

        Ok(Self {
            api,
            connection: peer.connection_id,
            events,
        })
    }

    async fn wait(
        &mut self,
        game: Option<&GameId>,
        until_done: bool,
        timeout: Duration,
    ) -> Result<GameRecord> {
        let record = tokio::time::timeout(timeout, wait_for_turn(&mut self.events, game, until_done))
            .await
            .context("Timed out waiting for the other player")??;
        Ok(record)
    }

    /// Alice: start the game, then move whenever it is her turn.
    async fn open(mut self, timeout: Duration) -> Result<GameRecord> {
        let game = self
            .api
            .start_game(&self.connection, Some(ALICE_MOVES[0]))
            .await?;
        for mv in &ALICE_MOVES[1..] {
            self.wait(Some(&game.id), false, timeout).await?;
            self.api.make_move(&game.id, mv).await?;
        }
        self.wait(Some(&game.id), true, timeout).await
    }

    /// Bob: wait for the invitation, then answer each move.
    async fn respond(mut self, timeout: Duration) -> Result<GameRecord> {
        let game = self.wait(None, false, timeout).await?;
        for (i, mv) in BOB_MOVES.iter().enumerate() {
            if i > 0 {
                self.wait(Some(&game.id), false, timeout).await?;
            }
            self.api.make_move(&game.id, mv).await?;
        }
        self.wait(Some(&game.id), true, timeout).await
    }
}

fn print_record(record: &GameRecord) {
    let moves: Vec<&str> = record.moves.iter().map(|m| m.as_str()).collect();
    println!("  Game:   {}", record.id);
    println!("  Thread: {}", record.thread_id);
    println!("  Peer:   {}", record.connection_id);
    println!("  State:  {}", record.state);
    println!(
        "  Mark:   {}",
        record.my_mark.map_or("-".to_string(), |m| m.to_string())
    );
    println!(
        "  Winner: {}",
        record.winner.map_or("-".to_string(), |m| m.to_string())
    );
    println!("  Moves:  {}", moves.join(" "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttt_agent::StorageBackend;
    use ttt_core::GameState;
    use ttt_types::Mark;

    #[tokio::test]
    async fn demo_game_ends_with_cross_winning() {
        let (alice, bob) = play(&AgentConfig::default(), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(alice.state, GameState::Done);
        assert_eq!(bob.state, GameState::Done);
        assert_eq!(alice.winner, Some(Mark::Cross));
        assert_eq!(bob.winner, Some(Mark::Cross));
        assert_eq!(alice.moves, bob.moves);
        assert_eq!(alice.thread_id, bob.thread_id);
    }

    #[tokio::test]
    async fn demo_runs_on_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AgentConfig::default();
        config.storage.backend = StorageBackend::Sqlite;
        config.storage.database = dir.path().join("demo.db");

        run(&config, Duration::from_secs(5)).await.unwrap();

        assert!(dir.path().join("demo-alice.db").exists());
        assert!(dir.path().join("demo-bob.db").exists());
    }
}
