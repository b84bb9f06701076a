use std::sync::Arc;

use shared::{
    domain::{Command, CommandId, NewCommand},
    error::{ApiError, ErrorCode},
    patch::JsonPatchDocument,
    protocol::{command_location, CommandCreateDto, CommandReadDto, CommandUpdateDto},
    validation::Validate,
};
use storage::{CommanderRepo, NotFound, Unimplemented};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct ApiContext {
    pub repo: Arc<dyn CommanderRepo>,
}

impl ApiContext {
    pub fn new(repo: Arc<dyn CommanderRepo>) -> Self {
        Self { repo }
    }
}

/// A freshly created command together with the path it can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedCommand {
    pub location: String,
    pub command: CommandReadDto,
}

pub fn commands_route() -> &'static str {
    "/api/commands"
}

pub async fn list_commands(ctx: &ApiContext) -> Result<Vec<CommandReadDto>, ApiError> {
    let commands = ctx.repo.list_all().await.map_err(storage_error)?;
    debug!(count = commands.len(), "listed commands");
    Ok(commands.into_iter().map(CommandReadDto::from).collect())
}

pub async fn get_command(ctx: &ApiContext, id: CommandId) -> Result<CommandReadDto, ApiError> {
    let command = find_command(ctx, id).await?;
    Ok(command.into())
}

pub async fn create_command(
    ctx: &ApiContext,
    input: CommandCreateDto,
) -> Result<CreatedCommand, ApiError> {
    input.validate().map_err(|errors| {
        warn!(fields = ?errors.keys().collect::<Vec<_>>(), "rejected command create");
        ApiError::validation(errors)
    })?;

    let command = ctx
        .repo
        .create(NewCommand::from(input))
        .await
        .map_err(storage_error)?;
    commit(ctx).await?;

    info!(id = %command.id, "created command");
    Ok(CreatedCommand {
        location: command_location(command.id),
        command: command.into(),
    })
}

pub async fn replace_command(
    ctx: &ApiContext,
    id: CommandId,
    input: CommandUpdateDto,
) -> Result<(), ApiError> {
    input.validate().map_err(|errors| {
        warn!(%id, fields = ?errors.keys().collect::<Vec<_>>(), "rejected command replace");
        ApiError::validation(errors)
    })?;
    let mut command = find_command(ctx, id).await?;

    input.apply_to(&mut command);
    ctx.repo.update(&command).await.map_err(storage_error)?;
    commit(ctx).await?;

    info!(%id, "replaced command");
    Ok(())
}

/// Applies `patch` to a copy of the stored command and only writes it back
/// when the patched copy passes full validation.
pub async fn patch_command(
    ctx: &ApiContext,
    id: CommandId,
    patch: &JsonPatchDocument,
) -> Result<(), ApiError> {
    let mut command = find_command(ctx, id).await?;

    let mut candidate = CommandUpdateDto::from(&command);
    patch
        .apply_to(&mut candidate)
        .and_then(|()| candidate.validate())
        .map_err(|errors| {
            warn!(%id, fields = ?errors.keys().collect::<Vec<_>>(), "rejected command patch");
            ApiError::validation(errors)
        })?;

    candidate.apply_to(&mut command);
    ctx.repo.update(&command).await.map_err(storage_error)?;
    commit(ctx).await?;

    info!(%id, operations = patch.operations().len(), "patched command");
    Ok(())
}

pub async fn delete_command(ctx: &ApiContext, id: CommandId) -> Result<(), ApiError> {
    let command = find_command(ctx, id).await?;
    ctx.repo.delete(&command).await.map_err(storage_error)?;
    commit(ctx).await?;

    info!(%id, "deleted command");
    Ok(())
}

pub async fn health(ctx: &ApiContext) -> Result<(), ApiError> {
    ctx.repo
        .health_check()
        .await
        .map_err(|e| ApiError::new(ErrorCode::Unavailable, e.to_string()))
}

async fn find_command(ctx: &ApiContext, id: CommandId) -> Result<Command, ApiError> {
    ctx.repo
        .get_by_id(id)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| {
            debug!(%id, "command not found");
            ApiError::not_found(format!("command {id} not found"))
        })
}

async fn commit(ctx: &ApiContext) -> Result<(), ApiError> {
    if ctx.repo.commit().await.map_err(storage_error)? {
        Ok(())
    } else {
        Err(ApiError::new(
            ErrorCode::Internal,
            "repository refused to persist changes",
        ))
    }
}

fn storage_error(err: anyhow::Error) -> ApiError {
    if let Some(missing) = err.downcast_ref::<NotFound>() {
        return ApiError::not_found(missing.to_string());
    }
    if let Some(unimplemented) = err.downcast_ref::<Unimplemented>() {
        return ApiError::new(ErrorCode::Unimplemented, unimplemented.to_string());
    }
    ApiError::new(ErrorCode::Internal, format!("{err:#}"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
