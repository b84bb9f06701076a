use super::*;

use async_trait::async_trait;
use serde_json::json;
use shared::domain::canned_commands;
use storage::{InMemoryCommanderRepo, MockCommanderRepo};

fn setup() -> ApiContext {
    ApiContext::new(Arc::new(InMemoryCommanderRepo::with_canned_commands()))
}

fn create_dto(how_to: &str, line: &str, platform: &str) -> CommandCreateDto {
    CommandCreateDto {
        how_to: how_to.into(),
        line: line.into(),
        platform: platform.into(),
    }
}

fn update_dto(how_to: &str, line: &str, platform: &str) -> CommandUpdateDto {
    CommandUpdateDto {
        how_to: how_to.into(),
        line: line.into(),
        platform: platform.into(),
    }
}

fn patch(raw: serde_json::Value) -> JsonPatchDocument {
    serde_json::from_value(raw).expect("patch document")
}

#[tokio::test]
async fn create_assigns_next_id_and_location() {
    let ctx = setup();
    let created = create_command(&ctx, create_dto("Boil an egg", "Boil water", "Pan"))
        .await
        .expect("create");

    assert_eq!(
        created.command,
        CommandReadDto {
            id: CommandId(2),
            how_to: "Boil an egg".into(),
            line: "Boil water".into(),
            platform: "Pan".into(),
        }
    );
    assert_eq!(created.location, "/api/commands/2");

    let fetched = get_command(&ctx, created.command.id).await.expect("get");
    assert_eq!(fetched, created.command);
}

#[tokio::test]
async fn create_rejects_missing_fields() {
    let ctx = setup();
    let err = create_command(&ctx, create_dto("", "Boil water", ""))
        .await
        .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Validation);
    assert!(err.errors.contains_key("howTo"));
    assert!(err.errors.contains_key("platform"));
    assert_eq!(list_commands(&ctx).await.expect("list").len(), 2);
}

#[tokio::test]
async fn list_returns_commands_in_id_order() {
    let ctx = setup();
    let listed = list_commands(&ctx).await.expect("list");
    let ids: Vec<_> = listed.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![CommandId(0), CommandId(1)]);
}

#[tokio::test]
async fn unknown_id_is_not_found_for_every_operation() {
    let ctx = setup();
    let missing = CommandId(404);

    let err = get_command(&ctx, missing).await.expect_err("get");
    assert_eq!(err.code, ErrorCode::NotFound);

    let err = replace_command(&ctx, missing, update_dto("a", "b", "c"))
        .await
        .expect_err("replace");
    assert_eq!(err.code, ErrorCode::NotFound);

    let err = patch_command(
        &ctx,
        missing,
        &patch(json!([{ "op": "replace", "path": "/line", "value": "x" }])),
    )
    .await
    .expect_err("patch");
    assert_eq!(err.code, ErrorCode::NotFound);

    let err = delete_command(&ctx, missing).await.expect_err("delete");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn replace_overwrites_every_field() {
    let ctx = setup();
    replace_command(
        &ctx,
        CommandId(1),
        update_dto("Make udon", "Heat broth", "Pot"),
    )
    .await
    .expect("replace");

    let fetched = get_command(&ctx, CommandId(1)).await.expect("get");
    assert_eq!(fetched.how_to, "Make udon");
    assert_eq!(fetched.line, "Heat broth");
    assert_eq!(fetched.platform, "Pot");
}

#[tokio::test]
async fn replace_rejects_invalid_body_and_keeps_command() {
    let ctx = setup();
    let before = get_command(&ctx, CommandId(1)).await.expect("get");

    let err = replace_command(&ctx, CommandId(1), update_dto("", "x", ""))
        .await
        .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Validation);
    assert!(err.errors.contains_key("howTo"));
    assert!(err.errors.contains_key("platform"));
    assert!(!err.errors.contains_key("line"));

    let after = get_command(&ctx, CommandId(1)).await.expect("get");
    assert_eq!(after, before);
}

#[tokio::test]
async fn replace_rejects_invalid_body_before_looking_up_id() {
    let ctx = setup();
    let err = replace_command(&ctx, CommandId(404), update_dto("", "x", ""))
        .await
        .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn patch_updates_only_addressed_fields() {
    let ctx = setup();
    patch_command(
        &ctx,
        CommandId(0),
        &patch(json!([{ "op": "replace", "path": "/platform", "value": "Saucepan" }])),
    )
    .await
    .expect("patch");

    let fetched = get_command(&ctx, CommandId(0)).await.expect("get");
    assert_eq!(fetched.platform, "Saucepan");
    assert_eq!(fetched.how_to, "Boil an egg");
}

#[tokio::test]
async fn invalid_patch_leaves_stored_command_unchanged() {
    let ctx = setup();
    let before = get_command(&ctx, CommandId(0)).await.expect("get");

    let err = patch_command(
        &ctx,
        CommandId(0),
        &patch(json!([
            { "op": "replace", "path": "/howTo", "value": "Boil two eggs" },
            { "op": "remove", "path": "/line" }
        ])),
    )
    .await
    .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Validation);
    assert_eq!(err.errors["line"], vec!["The Line field is required."]);

    let after = get_command(&ctx, CommandId(0)).await.expect("get");
    assert_eq!(after, before);
}

#[tokio::test]
async fn delete_makes_command_unreachable() {
    let ctx = setup();
    delete_command(&ctx, CommandId(1)).await.expect("delete");
    let err = get_command(&ctx, CommandId(1)).await.expect_err("gone");
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(list_commands(&ctx).await.expect("list").len(), 1);
}

#[tokio::test]
async fn mock_backend_reports_unimplemented_mutations() {
    let ctx = ApiContext::new(Arc::new(MockCommanderRepo::new()));
    assert_eq!(list_commands(&ctx).await.expect("list").len(), 2);

    let err = create_command(&ctx, create_dto("a", "b", "c"))
        .await
        .expect_err("unimplemented");
    assert_eq!(err.code, ErrorCode::Unimplemented);

    let err = delete_command(&ctx, CommandId(0))
        .await
        .expect_err("unimplemented");
    assert_eq!(err.code, ErrorCode::Unimplemented);
}

/// Reads see the canned commands while writes go to an empty store, as when
/// another request deletes the row between lookup and write.
struct DeletedUnderneath {
    writes: InMemoryCommanderRepo,
}

#[async_trait]
impl CommanderRepo for DeletedUnderneath {
    async fn list_all(&self) -> anyhow::Result<Vec<Command>> {
        Ok(canned_commands())
    }

    async fn get_by_id(&self, id: CommandId) -> anyhow::Result<Option<Command>> {
        Ok(canned_commands().into_iter().find(|c| c.id == id))
    }

    async fn create(&self, command: NewCommand) -> anyhow::Result<Command> {
        self.writes.create(command).await
    }

    async fn update(&self, command: &Command) -> anyhow::Result<()> {
        self.writes.update(command).await
    }

    async fn delete(&self, command: &Command) -> anyhow::Result<()> {
        self.writes.delete(command).await
    }

    async fn commit(&self) -> anyhow::Result<bool> {
        self.writes.commit().await
    }
}

#[tokio::test]
async fn row_removed_between_lookup_and_write_is_not_found() {
    let ctx = ApiContext::new(Arc::new(DeletedUnderneath {
        writes: InMemoryCommanderRepo::new(),
    }));

    let err = replace_command(&ctx, CommandId(0), update_dto("a", "b", "c"))
        .await
        .expect_err("replace");
    assert_eq!(err.code, ErrorCode::NotFound);

    let err = patch_command(
        &ctx,
        CommandId(0),
        &patch(json!([{ "op": "replace", "path": "/line", "value": "x" }])),
    )
    .await
    .expect_err("patch");
    assert_eq!(err.code, ErrorCode::NotFound);

    let err = delete_command(&ctx, CommandId(1)).await.expect_err("delete");
    assert_eq!(err.code, ErrorCode::NotFound);
}
