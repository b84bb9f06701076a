use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        DefaultBodyLimit, Path, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use server_api::{
    commands_route, create_command, delete_command, get_command, health, list_commands,
    patch_command, replace_command, ApiContext,
};
use shared::{
    domain::CommandId,
    error::{ApiError, ErrorCode, FieldErrors},
    patch::JsonPatchDocument,
    protocol::{CommandCreateDto, CommandReadDto, CommandUpdateDto},
};
use storage::{CommanderRepo, InMemoryCommanderRepo, MockCommanderRepo, SqliteCommanderRepo};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, Settings, StorageBackend};

const MAX_BODY_BYTES: usize = 64 * 1024;

type HttpError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let repo = open_repository(&settings).await?;
    let state = AppState {
        api: ApiContext::new(repo),
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, storage = %settings.storage, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn open_repository(settings: &Settings) -> anyhow::Result<Arc<dyn CommanderRepo>> {
    let repo: Arc<dyn CommanderRepo> = match settings.storage {
        StorageBackend::Memory => Arc::new(InMemoryCommanderRepo::with_canned_commands()),
        StorageBackend::Mock => Arc::new(MockCommanderRepo::new()),
        StorageBackend::Sqlite => {
            let database_url = &settings.database_url;
            let repo = SqliteCommanderRepo::new(database_url).await.map_err(|error| {
                error!(
                    %database_url,
                    %error,
                    "failed to open SQLite database; verify parent directory exists and permissions are correct"
                );
                error
            })?;
            Arc::new(repo)
        }
    };
    Ok(repo)
}

fn build_router(state: Arc<AppState>) -> Router {
    let commands = Router::new()
        .route("/", get(http_list_commands).post(http_create_command))
        .route(
            "/:id",
            get(http_get_command)
                .put(http_replace_command)
                .patch(http_patch_command)
                .delete(http_delete_command),
        );

    Router::new()
        .route("/healthz", get(healthz))
        .nest(commands_route(), commands)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    health(&state.api).await.map_err(http_error)?;
    Ok("ok")
}

async fn http_list_commands(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CommandReadDto>>, HttpError> {
    let commands = list_commands(&state.api).await.map_err(http_error)?;
    Ok(Json(commands))
}

async fn http_get_command(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<CommandReadDto>, HttpError> {
    let id = command_id(id)?;
    let command = get_command(&state.api, id).await.map_err(http_error)?;
    Ok(Json(command))
}

async fn http_create_command(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CommandCreateDto>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(input) = body.map_err(bad_body)?;
    let created = create_command(&state.api, input)
        .await
        .map_err(http_error)?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, created.location)],
        Json(created.command),
    ))
}

async fn http_replace_command(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<CommandUpdateDto>, JsonRejection>,
) -> Result<StatusCode, HttpError> {
    let id = command_id(id)?;
    let Json(input) = body.map_err(bad_body)?;
    replace_command(&state.api, id, input)
        .await
        .map_err(http_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_patch_command(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<JsonPatchDocument>, JsonRejection>,
) -> Result<StatusCode, HttpError> {
    let id = command_id(id)?;
    let Json(patch) = body.map_err(bad_body)?;
    patch_command(&state.api, id, &patch)
        .await
        .map_err(http_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_delete_command(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, HttpError> {
    let id = command_id(id)?;
    delete_command(&state.api, id).await.map_err(http_error)?;
    Ok(StatusCode::NO_CONTENT)
}

fn command_id(raw: Result<Path<i64>, PathRejection>) -> Result<CommandId, HttpError> {
    let Path(id) = raw.map_err(|rejection| {
        let errors = FieldErrors::from([("id".to_string(), vec![rejection.body_text()])]);
        http_error(ApiError::validation(errors))
    })?;
    Ok(CommandId(id))
}

fn bad_body(rejection: JsonRejection) -> HttpError {
    let err = ApiError::new(ErrorCode::Validation, rejection.body_text());
    match rejection {
        JsonRejection::MissingJsonContentType(_) => (rejection.status(), Json(err)),
        _ => http_error(err),
    }
}

fn http_error(err: ApiError) -> HttpError {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(code = ?err.code, message = %err.message, "request failed");
    }
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
