use anyhow::{Context, Result};
use rusqlite::Connection;
use slotkeeper_core::db::{open_db, open_db_in_memory};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinError;

/// Shared application state.
///
/// One connection serves every request. Holding the lock for a whole
/// operation keeps conflict checks and the following insert together.
#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = open_db(db_path)
            .with_context(|| format!("failed to open event store at {}", db_path.display()))?;
        Ok(Self::from_connection(conn))
    }

    pub fn in_memory() -> Result<Self> {
        let conn = open_db_in_memory().context("failed to open in-memory event store")?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        AppState {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `op` against the store on the blocking pool, holding the lock
    /// until it returns.
    pub async fn with_store<T, F>(&self, op: F) -> Result<T, JoinError>
    where
        F: FnOnce(&Connection) -> T + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn).lock_owned().await;
        tokio::task::spawn_blocking(move || op(&conn)).await
    }
}

#[cfg(test)]
mod tests {
    use super::AppState;

    fn count(conn: &rusqlite::Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM event;", [], |row| row.get(0))
            .unwrap()
    }

    #[tokio::test]
    async fn with_store_returns_the_closure_result() {
        let state = AppState::in_memory().unwrap();
        let rows = state
            .with_store(|conn| {
                conn.execute(
                    "INSERT INTO event (title, recurring, recurring_days, start_time, end_time)
                     VALUES ('x', 1, '0', 0, 60);",
                    [],
                )
                .unwrap();
                count(conn)
            })
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn panicking_operation_releases_the_store() {
        let state = AppState::in_memory().unwrap();

        let result = state
            .with_store(|_| -> i64 { panic!("store operation failed") })
            .await;
        assert!(result.unwrap_err().is_panic());

        assert_eq!(state.with_store(count).await.unwrap(), 0);
    }
}
