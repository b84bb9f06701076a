use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use shared::domain::{canned_commands, Command, CommandId, NewCommand};

use crate::{CommanderRepo, NotFound};

type CommandMap = BTreeMap<CommandId, Command>;

#[derive(Debug)]
struct State {
    committed: CommandMap,
    staged: Option<CommandMap>,
    next_id: CommandId,
}

impl State {
    fn view(&self) -> &CommandMap {
        self.staged.as_ref().unwrap_or(&self.committed)
    }

    fn staged_mut(&mut self) -> &mut CommandMap {
        let committed = &self.committed;
        self.staged.get_or_insert_with(|| committed.clone())
    }
}

/// Map-backed repository. Staged writes go to a working copy that replaces the
/// committed map on `commit`. Ids are never reused.
#[derive(Debug)]
pub struct InMemoryCommanderRepo {
    state: Mutex<State>,
}

impl Default for InMemoryCommanderRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCommanderRepo {
    pub fn new() -> Self {
        Self::with_commands(Vec::new())
    }

    /// Starts with the two demo commands, so the next id handed out is 2.
    pub fn with_canned_commands() -> Self {
        Self::with_commands(canned_commands())
    }

    pub fn with_commands(commands: Vec<Command>) -> Self {
        let next_id = commands
            .iter()
            .map(|command| command.id)
            .max()
            .map_or(CommandId(0), CommandId::next);
        let committed = commands
            .into_iter()
            .map(|command| (command.id, command))
            .collect();
        Self {
            state: Mutex::new(State {
                committed,
                staged: None,
                next_id,
            }),
        }
    }

    pub async fn has_pending_changes(&self) -> bool {
        self.state.lock().await.staged.is_some()
    }
}

#[async_trait]
impl CommanderRepo for InMemoryCommanderRepo {
    async fn list_all(&self) -> Result<Vec<Command>> {
        let state = self.state.lock().await;
        Ok(state.view().values().cloned().collect())
    }

    async fn get_by_id(&self, id: CommandId) -> Result<Option<Command>> {
        let state = self.state.lock().await;
        Ok(state.view().get(&id).cloned())
    }

    async fn create(&self, command: NewCommand) -> Result<Command> {
        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id = id.next();
        let command = command.with_id(id);
        state.staged_mut().insert(id, command.clone());
        debug!(%id, "staged command insert");
        Ok(command)
    }

    async fn update(&self, command: &Command) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(stored) = state.staged_mut().get_mut(&command.id) else {
            return Err(NotFound { id: command.id }.into());
        };
        *stored = command.clone();
        debug!(id = %command.id, "staged command update");
        Ok(())
    }

    async fn delete(&self, command: &Command) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.staged_mut().remove(&command.id).is_none() {
            return Err(NotFound { id: command.id }.into());
        }
        debug!(id = %command.id, "staged command delete");
        Ok(())
    }

    async fn commit(&self) -> Result<bool> {
        let mut state = self.state.lock().await;
        if let Some(staged) = state.staged.take() {
            state.committed = staged;
        }
        Ok(true)
    }
}
