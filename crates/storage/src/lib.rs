use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use shared::domain::{Command, CommandId, NewCommand};

mod memory;
mod mock;
mod sqlite;

pub use memory::InMemoryCommanderRepo;
pub use mock::MockCommanderRepo;
pub use sqlite::SqliteCommanderRepo;

/// Storage capability behind the command service.
///
/// Mutations are staged and only become durable once [`CommanderRepo::commit`]
/// succeeds. Reads through the same repository observe staged changes.
#[async_trait]
pub trait CommanderRepo: Send + Sync {
    /// Every stored command in ascending id order.
    async fn list_all(&self) -> Result<Vec<Command>>;

    async fn get_by_id(&self, id: CommandId) -> Result<Option<Command>>;

    /// Stages a new command and returns it with its freshly assigned id.
    async fn create(&self, command: NewCommand) -> Result<Command>;

    async fn update(&self, command: &Command) -> Result<()>;

    async fn delete(&self, command: &Command) -> Result<()>;

    /// Persists staged changes. `Ok(true)` means they are durable.
    async fn commit(&self) -> Result<bool>;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Raised by backends that do not support an operation.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("{operation} is not implemented by the {backend} repository")]
pub struct Unimplemented {
    pub backend: &'static str,
    pub operation: &'static str,
}

/// Raised by `update` and `delete` when the command is not stored.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("command {id} does not exist")]
pub struct NotFound {
    pub id: CommandId,
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
