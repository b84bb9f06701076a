use anyhow::Result;
use async_trait::async_trait;

use shared::domain::{canned_commands, Command, CommandId, NewCommand};

use crate::{CommanderRepo, Unimplemented};

/// Read-only backend serving a fixed pair of commands.
#[derive(Debug, Clone, Default)]
pub struct MockCommanderRepo;

impl MockCommanderRepo {
    pub fn new() -> Self {
        Self
    }

    fn unimplemented(operation: &'static str) -> anyhow::Error {
        Unimplemented {
            backend: "mock",
            operation,
        }
        .into()
    }
}

#[async_trait]
impl CommanderRepo for MockCommanderRepo {
    async fn list_all(&self) -> Result<Vec<Command>> {
        Ok(canned_commands())
    }

    async fn get_by_id(&self, id: CommandId) -> Result<Option<Command>> {
        Ok(canned_commands().into_iter().find(|command| command.id == id))
    }

    async fn create(&self, _command: NewCommand) -> Result<Command> {
        Err(Self::unimplemented("create"))
    }

    async fn update(&self, _command: &Command) -> Result<()> {
        Err(Self::unimplemented("update"))
    }

    async fn delete(&self, _command: &Command) -> Result<()> {
        Err(Self::unimplemented("delete"))
    }

    async fn commit(&self) -> Result<bool> {
        Err(Self::unimplemented("commit"))
    }
}
