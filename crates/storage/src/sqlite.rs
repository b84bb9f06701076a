use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite, Transaction,
};
use tokio::sync::Mutex;
use tracing::debug;

use shared::domain::{canned_commands, Command, CommandId, NewCommand};

use crate::{CommanderRepo, NotFound};

type PendingTx = Option<Transaction<'static, Sqlite>>;

/// SQLite-backed repository. Staged writes run inside one open transaction
/// that `commit` finishes; reads go through that transaction while it is open.
#[derive(Clone)]
pub struct SqliteCommanderRepo {
    pool: Pool<Sqlite>,
    pending: Arc<Mutex<PendingTx>>,
}

impl SqliteCommanderRepo {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            pool,
            pending: Arc::new(Mutex::new(None)),
        })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// True while staged writes hold an open transaction.
    pub async fn has_pending_changes(&self) -> bool {
        self.pending.lock().await.is_some()
    }

    /// Inserts the demo commands with their fixed ids, skipping any id that is
    /// already taken. Returns how many rows were added.
    pub async fn seed_canned_commands(&self) -> Result<u64> {
        let mut inserted = 0;
        for command in canned_commands() {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO commands (id, how_to, line, platform) VALUES (?, ?, ?, ?)",
            )
            .bind(command.id.0)
            .bind(&command.how_to)
            .bind(&command.line)
            .bind(&command.platform)
            .execute(&self.pool)
            .await
            .context("failed to seed commands")?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    async fn open_transaction<'a>(
        &self,
        slot: &'a mut PendingTx,
    ) -> Result<&'a mut Transaction<'static, Sqlite>> {
        let tx = match slot.take() {
            Some(tx) => tx,
            None => self
                .pool
                .begin()
                .await
                .context("failed to begin sqlite transaction")?,
        };
        Ok(slot.insert(tx))
    }
}

/// Rolls back a transaction that holds no staged work, releasing the write lock.
async fn discard_transaction(slot: &mut PendingTx) -> Result<()> {
    if let Some(tx) = slot.take() {
        tx.rollback()
            .await
            .context("failed to roll back sqlite transaction")?;
    }
    Ok(())
}

fn command_from_row(row: &SqliteRow) -> Command {
    Command {
        id: CommandId(row.get::<i64, _>("id")),
        how_to: row.get::<String, _>("how_to"),
        line: row.get::<String, _>("line"),
        platform: row.get::<String, _>("platform"),
    }
}

#[async_trait]
impl CommanderRepo for SqliteCommanderRepo {
    async fn list_all(&self) -> Result<Vec<Command>> {
        let query = sqlx::query("SELECT id, how_to, line, platform FROM commands ORDER BY id");
        let mut pending = self.pending.lock().await;
        let rows = match pending.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await?,
            None => query.fetch_all(&self.pool).await?,
        };
        Ok(rows.iter().map(command_from_row).collect())
    }

    async fn get_by_id(&self, id: CommandId) -> Result<Option<Command>> {
        let query =
            sqlx::query("SELECT id, how_to, line, platform FROM commands WHERE id = ?").bind(id.0);
        let mut pending = self.pending.lock().await;
        let row = match pending.as_mut() {
            Some(tx) => query.fetch_optional(&mut **tx).await?,
            None => query.fetch_optional(&self.pool).await?,
        };
        Ok(row.as_ref().map(command_from_row))
    }

    async fn create(&self, command: NewCommand) -> Result<Command> {
        let mut pending = self.pending.lock().await;
        let tx = self.open_transaction(&mut pending).await?;
        let row = sqlx::query(
            "INSERT INTO commands (how_to, line, platform) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&command.how_to)
        .bind(&command.line)
        .bind(&command.platform)
        .fetch_one(&mut **tx)
        .await
        .context("failed to insert command")?;
        let id = CommandId(row.get::<i64, _>(0));
        debug!(%id, "staged command insert");
        Ok(command.with_id(id))
    }

    async fn update(&self, command: &Command) -> Result<()> {
        let mut pending = self.pending.lock().await;
        let had_pending = pending.is_some();
        let tx = self.open_transaction(&mut pending).await?;
        let result =
            sqlx::query("UPDATE commands SET how_to = ?, line = ?, platform = ? WHERE id = ?")
                .bind(&command.how_to)
                .bind(&command.line)
                .bind(&command.platform)
                .bind(command.id.0)
                .execute(&mut **tx)
                .await
                .context("failed to update command")?;
        if result.rows_affected() == 0 {
            if !had_pending {
                discard_transaction(&mut pending).await?;
            }
            return Err(NotFound { id: command.id }.into());
        }
        debug!(id = %command.id, "staged command update");
        Ok(())
    }

    async fn delete(&self, command: &Command) -> Result<()> {
        let mut pending = self.pending.lock().await;
        let had_pending = pending.is_some();
        let tx = self.open_transaction(&mut pending).await?;
        let result = sqlx::query("DELETE FROM commands WHERE id = ?")
            .bind(command.id.0)
            .execute(&mut **tx)
            .await
            .context("failed to delete command")?;
        if result.rows_affected() == 0 {
            if !had_pending {
                discard_transaction(&mut pending).await?;
            }
            return Err(NotFound { id: command.id }.into());
        }
        debug!(id = %command.id, "staged command delete");
        Ok(())
    }

    async fn commit(&self) -> Result<bool> {
        let mut pending = self.pending.lock().await;
        if let Some(tx) = pending.take() {
            tx.commit().await.context("failed to commit sqlite transaction")?;
        }
        Ok(true)
    }

    async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}
