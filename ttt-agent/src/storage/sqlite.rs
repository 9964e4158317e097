//! SQLite storage backend.

use super::{GameQuery, GameStore};
use crate::error::StorageError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use ttt_core::{GameRecord, GameState};
use ttt_types::{ConnectionId, GameId, Mark, MoveToken, ThreadId};

/// SQLite-based game storage.
///
/// Uses WAL mode for concurrent reads/writes. Moves are stored as a JSON
/// array of tokens; records are validated when read back.
#[derive(Clone)]
pub struct SqliteGameStore {
    pool: SqlitePool,
}

impl SqliteGameStore {
    /// Open (or create) the database at `path`.
    pub async fn new(path: &Path) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(StorageError::Database)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(":memory:")
            .map_err(StorageError::Database)?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        // One connection: every `:memory:` connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(StorageError::Database)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS games (
                id TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL,
                thread_id TEXT NOT NULL UNIQUE,
                connection_id TEXT NOT NULL,
                moves TEXT NOT NULL,
                state TEXT NOT NULL,
                my_mark TEXT,
                winner TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_games_connection ON games(connection_id)")
            .execute(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_games_state ON games(state)")
            .execute(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        Ok(())
    }
}

#[async_trait]
impl GameStore for SqliteGameStore {
    async fn create(&self, record: &GameRecord) -> Result<(), StorageError> {
        let moves = serde_json::to_string(&record.moves)?;

        sqlx::query(
            r#"
            INSERT INTO games (id, created_at, thread_id, connection_id, moves, state, my_mark, winner)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.created_at as i64)
        .bind(record.thread_id.to_string())
        .bind(record.connection_id.as_str())
        .bind(moves)
        .bind(record.state.as_str())
        .bind(record.my_mark.map(|m| m.to_string()))
        .bind(record.winner.map(|m| m.to_string()))
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                if db.message().contains("games.thread_id") {
                    StorageError::DuplicateThread {
                        thread_id: record.thread_id.to_string(),
                    }
                } else {
                    StorageError::DuplicateGame {
                        game_id: record.id.to_string(),
                    }
                }
            }
            other => StorageError::Database(other),
        })?;

        Ok(())
    }

    async fn update(&self, record: &GameRecord) -> Result<(), StorageError> {
        let moves = serde_json::to_string(&record.moves)?;

        let result = sqlx::query(
            r#"
            UPDATE games SET moves = ?2, state = ?3, my_mark = ?4, winner = ?5
            WHERE id = ?1
            "#,
        )
        .bind(record.id.to_string())
        .bind(moves)
        .bind(record.state.as_str())
        .bind(record.my_mark.map(|m| m.to_string()))
        .bind(record.winner.map(|m| m.to_string()))
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound {
                game_id: record.id.to_string(),
            });
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &GameId) -> Result<Option<GameRecord>, StorageError> {
        let row = sqlx::query_as::<_, GameRow>(
            r#"
            SELECT id, created_at, thread_id, connection_id, moves, state, my_mark, winner
            FROM games
            WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        row.map(GameRecord::try_from).transpose()
    }

    async fn find_by_thread_id(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<GameRecord>, StorageError> {
        let row = sqlx::query_as::<_, GameRow>(
            r#"
            SELECT id, created_at, thread_id, connection_id, moves, state, my_mark, winner
            FROM games
            WHERE thread_id = ?1
            "#,
        )
        .bind(thread_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        row.map(GameRecord::try_from).transpose()
    }

    async fn find_by_query(&self, query: &GameQuery) -> Result<Vec<GameRecord>, StorageError> {
        let rows = sqlx::query_as::<_, GameRow>(
            r#"
            SELECT id, created_at, thread_id, connection_id, moves, state, my_mark, winner
            FROM games
            WHERE (?1 IS NULL OR connection_id = ?1)
              AND (?2 IS NULL OR state = ?2)
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(query.connection_id.as_ref().map(|c| c.as_str().to_string()))
        .bind(query.state.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        rows.into_iter().map(GameRecord::try_from).collect()
    }
}

/// Internal row type for SQLite queries.
#[derive(sqlx::FromRow)]
struct GameRow {
    id: String,
    created_at: i64,
    thread_id: String,
    connection_id: String,
    moves: String,
    state: String,
    my_mark: Option<String>,
    winner: Option<String>,
}

impl TryFrom<GameRow> for GameRecord {
    type Error = StorageError;

    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StorageError::Corrupt {
            game_id: row.id.clone(),
            reason,
        };
        let mark = |value: &Option<String>| -> Result<Option<Mark>, StorageError> {
            value
                .as_deref()
                .map(Mark::from_str)
                .transpose()
                .map_err(|e| corrupt(e.to_string()))
        };

        let record = GameRecord {
            id: GameId::from_str(&row.id).map_err(|e| corrupt(e.to_string()))?,
            created_at: row.created_at as u64,
            thread_id: ThreadId::from_str(&row.thread_id).map_err(|e| corrupt(e.to_string()))?,
            connection_id: ConnectionId::new(row.connection_id.as_str()),
            moves: serde_json::from_str::<Vec<MoveToken>>(&row.moves)
                .map_err(|e| corrupt(e.to_string()))?,
            state: GameState::from_str(&row.state).map_err(|e| corrupt(e.to_string()))?,
            my_mark: mark(&row.my_mark)?,
            winner: mark(&row.winner)?,
        };
        record.validate().map_err(|e| corrupt(e.to_string()))?;
        Ok(record)
    }
}
