use crate::{
    error::FieldErrors,
    protocol::{CommandCreateDto, CommandUpdateDto},
};

pub const MAX_HOW_TO_CHARS: usize = 250;
pub const MAX_LINE_CHARS: usize = 250;
pub const MAX_PLATFORM_CHARS: usize = 100;

struct FieldRule {
    wire_name: &'static str,
    display_name: &'static str,
    max_chars: usize,
}

const HOW_TO: FieldRule = FieldRule {
    wire_name: "howTo",
    display_name: "HowTo",
    max_chars: MAX_HOW_TO_CHARS,
};
const LINE: FieldRule = FieldRule {
    wire_name: "line",
    display_name: "Line",
    max_chars: MAX_LINE_CHARS,
};
const PLATFORM: FieldRule = FieldRule {
    wire_name: "platform",
    display_name: "Platform",
    max_chars: MAX_PLATFORM_CHARS,
};

/// Implemented by every DTO that carries user-supplied command fields.
pub trait Validate {
    /// Returns every failing field, not just the first one.
    fn validate(&self) -> Result<(), FieldErrors>;
}

impl Validate for CommandCreateDto {
    fn validate(&self) -> Result<(), FieldErrors> {
        validate_fields(&self.how_to, &self.line, &self.platform)
    }
}

impl Validate for CommandUpdateDto {
    fn validate(&self) -> Result<(), FieldErrors> {
        validate_fields(&self.how_to, &self.line, &self.platform)
    }
}

fn validate_fields(how_to: &str, line: &str, platform: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    check(&HOW_TO, how_to, &mut errors);
    check(&LINE, line, &mut errors);
    check(&PLATFORM, platform, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check(rule: &FieldRule, value: &str, errors: &mut FieldErrors) {
    if value.trim().is_empty() {
        errors
            .entry(rule.wire_name.to_string())
            .or_default()
            .push(format!("The {} field is required.", rule.display_name));
        return;
    }
    if value.chars().count() > rule.max_chars {
        errors
            .entry(rule.wire_name.to_string())
            .or_default()
            .push(format!(
                "The field {} must be a string with a maximum length of {}.",
                rule.display_name, rule.max_chars
            ));
    }
}
