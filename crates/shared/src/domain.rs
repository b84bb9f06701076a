use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(CommandId);

impl CommandId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// A stored shell tip. `id` is assigned by the repository on creation and
/// never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub id: CommandId,
    pub how_to: String,
    pub line: String,
    pub platform: String,
}

/// A command that has not been given an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommand {
    pub how_to: String,
    pub line: String,
    pub platform: String,
}

impl NewCommand {
    pub fn with_id(self, id: CommandId) -> Command {
        Command {
            id,
            how_to: self.how_to,
            line: self.line,
            platform: self.platform,
        }
    }
}

/// The two commands every demo backend starts with.
pub fn canned_commands() -> Vec<Command> {
    vec![
        Command {
            id: CommandId(0),
            how_to: "Boil an egg".into(),
            line: "Boil water".into(),
            platform: "Kettle and Pan".into(),
        },
        Command {
            id: CommandId(1),
            how_to: "Make Ramen".into(),
            line: "Boil water".into(),
            platform: "Pan".into(),
        },
    ]
}
