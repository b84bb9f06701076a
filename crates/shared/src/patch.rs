//! JSON Patch (RFC 6902) documents addressed at the fields of a
//! [`CommandUpdateDto`].
//!
//! Only the three top-level fields are addressable. Property names match
//! case-insensitively, so `/howTo` and `/HowTo` are the same target. `add`
//! behaves like `replace` because every target already exists, and `remove`
//! clears the field back to an empty string.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::FieldErrors, protocol::CommandUpdateDto};

/// Key used for errors that cannot be attributed to a known field.
pub const PATCH_ERROR_KEY: &str = "patch";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
    Move { from: String, path: String },
    Copy { from: String, path: String },
    Test { path: String, value: Value },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonPatchDocument(pub Vec<PatchOperation>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchField {
    HowTo,
    Line,
    Platform,
}

impl PatchField {
    pub fn parse(path: &str) -> Option<Self> {
        let segment = path.strip_prefix('/')?;
        match segment.to_ascii_lowercase().as_str() {
            "howto" => Some(Self::HowTo),
            "line" => Some(Self::Line),
            "platform" => Some(Self::Platform),
            _ => None,
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            Self::HowTo => "howTo",
            Self::Line => "line",
            Self::Platform => "platform",
        }
    }

    fn slot(self, dto: &mut CommandUpdateDto) -> &mut String {
        match self {
            Self::HowTo => &mut dto.how_to,
            Self::Line => &mut dto.line,
            Self::Platform => &mut dto.platform,
        }
    }
}

impl JsonPatchDocument {
    pub fn operations(&self) -> &[PatchOperation] {
        &self.0
    }

    /// Applies every operation in order. A failing operation is recorded and
    /// skipped; the caller should discard `dto` if any error is returned.
    pub fn apply_to(&self, dto: &mut CommandUpdateDto) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        for operation in &self.0 {
            if let Err((key, message)) = apply_operation(operation, dto) {
                errors.entry(key).or_default().push(message);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

type OperationError = (String, String);

fn apply_operation(
    operation: &PatchOperation,
    dto: &mut CommandUpdateDto,
) -> Result<(), OperationError> {
    match operation {
        PatchOperation::Add { path, value } | PatchOperation::Replace { path, value } => {
            let field = resolve(path)?;
            *field.slot(dto) = string_value(field, value)?;
        }
        PatchOperation::Remove { path } => {
            let field = resolve(path)?;
            field.slot(dto).clear();
        }
        PatchOperation::Move { from, path } => {
            let source = resolve(from)?;
            let target = resolve(path)?;
            if source != target {
                let moved = std::mem::take(source.slot(dto));
                *target.slot(dto) = moved;
            }
        }
        PatchOperation::Copy { from, path } => {
            let source = resolve(from)?;
            let target = resolve(path)?;
            let copied = source.slot(dto).clone();
            *target.slot(dto) = copied;
        }
        PatchOperation::Test { path, value } => {
            let field = resolve(path)?;
            let expected = string_value(field, value)?;
            let current = field.slot(dto);
            if *current != expected {
                return Err((
                    field.wire_name().to_string(),
                    format!(
                        "The current value '{current}' at path '{}' is not equal to the test value '{expected}'.",
                        field.wire_name()
                    ),
                ));
            }
        }
    }
    Ok(())
}

fn resolve(path: &str) -> Result<PatchField, OperationError> {
    PatchField::parse(path).ok_or_else(|| {
        (
            PATCH_ERROR_KEY.to_string(),
            format!("The target location specified by path '{path}' was not found."),
        )
    })
}

fn string_value(field: PatchField, value: &Value) -> Result<String, OperationError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Null => Ok(String::new()),
        other => Err((
            field.wire_name().to_string(),
            format!("The value '{other}' is invalid for target location."),
        )),
    }
}
