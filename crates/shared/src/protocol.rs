//! Wire representations of a [`Command`] and the mapping between them and the
//! entity.

use serde::{Deserialize, Serialize};

use crate::domain::{Command, CommandId, NewCommand};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandReadDto {
    pub id: CommandId,
    pub how_to: String,
    pub line: String,
    pub platform: String,
}

/// Missing keys decode as empty strings so they are reported by validation
/// instead of failing the whole body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandCreateDto {
    pub how_to: String,
    pub line: String,
    pub platform: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandUpdateDto {
    pub how_to: String,
    pub line: String,
    pub platform: String,
}

impl From<Command> for CommandReadDto {
    fn from(command: Command) -> Self {
        Self {
            id: command.id,
            how_to: command.how_to,
            line: command.line,
            platform: command.platform,
        }
    }
}

impl From<CommandCreateDto> for NewCommand {
    fn from(dto: CommandCreateDto) -> Self {
        Self {
            how_to: dto.how_to,
            line: dto.line,
            platform: dto.platform,
        }
    }
}

impl From<&Command> for CommandUpdateDto {
    fn from(command: &Command) -> Self {
        Self {
            how_to: command.how_to.clone(),
            line: command.line.clone(),
            platform: command.platform.clone(),
        }
    }
}

impl CommandUpdateDto {
    /// Overwrites every mutable field of `command`; the id is left alone.
    pub fn apply_to(self, command: &mut Command) {
        command.how_to = self.how_to;
        command.line = self.line;
        command.platform = self.platform;
    }
}

pub fn command_location(id: CommandId) -> String {
    format!("/api/commands/{id}")
}
