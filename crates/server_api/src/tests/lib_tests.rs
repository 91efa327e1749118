use super::*;
use serde_json::json;
use shared::{domain::AssignmentMap, error::ErrorCode};
use storage::MemoryDocumentStore;

fn setup() -> ApiContext {
    let storage = Storage::from_backend(MemoryDocumentStore::with_document(json!({
        "general": { "mode": "auto" },
        "training_strategy": {
            "templates": { "Speed_Build": {}, "Stamina_Build": {} },
            "timeline": { "Junior Year Early Jan": "Speed_Build" }
        }
    })));
    ApiContext::new(storage, Calendar::default_season())
}

fn assign(turn: &str, template: &str) -> TimelineCommand {
    TimelineCommand::Assign {
        turn: turn.into(),
        template: template.into(),
    }
}

async fn stored_timeline(ctx: &ApiContext) -> AssignmentMap {
    ctx.storage
        .load_document()
        .await
        .expect("document")
        .timeline()
        .expect("timeline")
}

#[tokio::test]
async fn view_carries_templates_forward() {
    let ctx = setup();
    let view = timeline_view(&ctx).await.expect("view");
    assert_eq!(view.turns.len(), 73);
    assert!(view
        .turns
        .iter()
        .all(|t| t.effective_template.as_ref().map(TemplateName::as_str) == Some("Speed_Build")));
    assert_eq!(view.spans.len(), 1);
    assert!(view.dangling.is_empty());
    assert_eq!(view.templates.len(), 2);
}

#[tokio::test]
async fn assign_persists_and_keeps_other_sections() {
    let ctx = setup();
    let update = apply_command(&ctx, assign("Classic Year Early Jan", "Stamina_Build"))
        .await
        .expect("assign");
    assert_eq!(update.view.spans.len(), 2);
    assert!(matches!(update.event, ConfigEvent::TimelineUpdated { ref timeline, .. } if timeline.len() == 2));

    let raw = load_config(&ctx).await.expect("config");
    assert_eq!(raw["general"]["mode"], "auto");
    assert_eq!(
        raw["training_strategy"]["timeline"]["Classic Year Early Jan"],
        "Stamina_Build"
    );
}

#[tokio::test]
async fn unknown_turn_and_empty_template_are_rejected() {
    let ctx = setup();
    let err = apply_command(&ctx, assign("Junior Year Smarch", "Speed_Build"))
        .await
        .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Validation);

    let err = apply_command(&ctx, assign("Junior Year Late Jan", "  "))
        .await
        .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Validation);
    assert_eq!(stored_timeline(&ctx).await.len(), 1);
}

#[tokio::test]
async fn unknown_template_names_are_allowed_but_reported() {
    let ctx = setup();
    let update = apply_command(&ctx, assign("Senior Year Early Jan", "Ghost"))
        .await
        .expect("assign");
    assert_eq!(
        update.view.dangling,
        vec![DanglingAssignment {
            turn: "Senior Year Early Jan".into(),
            template: "Ghost".into(),
        }]
    );
}

#[tokio::test]
async fn move_from_inherited_turn_is_noop() {
    let ctx = setup();
    apply_command(
        &ctx,
        TimelineCommand::Move {
            source: "Junior Year Late Jan".into(),
            destination: "Senior Year Early Jan".into(),
        },
    )
    .await
    .expect("move");
    let timeline = stored_timeline(&ctx).await;
    let expected: AssignmentMap = [("Junior Year Early Jan", "Speed_Build")].into_iter().collect();
    assert_eq!(timeline, expected);
}

#[tokio::test]
async fn orphaned_keys_can_be_unassigned() {
    let storage = Storage::from_backend(MemoryDocumentStore::with_document(json!({
        "training_strategy": { "timeline": { "Pre-Debut": "Speed_Build" } }
    })));
    let ctx = ApiContext::new(storage, Calendar::default_season());
    let view = timeline_view(&ctx).await.expect("view");
    assert_eq!(view.orphaned, vec![TurnKey::from("Pre-Debut")]);

    apply_command(&ctx, TimelineCommand::Unassign { turn: "Pre-Debut".into() })
        .await
        .expect("unassign");
    assert!(stored_timeline(&ctx).await.is_empty());
}

#[tokio::test]
async fn delete_template_removes_body_and_assignments() {
    let ctx = setup();
    apply_command(&ctx, assign("Classic Year Early Jan", "Stamina_Build"))
        .await
        .expect("assign");
    apply_command(&ctx, assign("Senior Year Early Jan", "Speed_Build"))
        .await
        .expect("assign");

    let update = delete_template(&ctx, &"Speed_Build".into())
        .await
        .expect("delete");
    assert_eq!(update.view.templates, vec![TemplateName::from("Stamina_Build")]);
    let expected: AssignmentMap = [("Classic Year Early Jan", "Stamina_Build")].into_iter().collect();
    assert_eq!(stored_timeline(&ctx).await, expected);

    let err = delete_template(&ctx, &"Speed_Build".into())
        .await
        .expect_err("already deleted");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn rename_template_rewrites_body_and_references() {
    let ctx = setup();
    apply_command(
        &ctx,
        TimelineCommand::RenameTemplate {
            from: "Speed_Build".into(),
            to: "Sprint_Build".into(),
        },
    )
    .await
    .expect("rename");
    let raw = load_config(&ctx).await.expect("config");
    assert!(raw["training_strategy"]["templates"].get("Sprint_Build").is_some());
    assert_eq!(
        raw["training_strategy"]["timeline"]["Junior Year Early Jan"],
        "Sprint_Build"
    );

    let err = apply_command(
        &ctx,
        TimelineCommand::RenameTemplate {
            from: "Sprint_Build".into(),
            to: "Stamina_Build".into(),
        },
    )
    .await
    .expect_err("name taken");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn save_config_rejects_malformed_timeline() {
    let ctx = setup();
    let err = save_config(&ctx, json!({ "training_strategy": { "timeline": ["oops"] } }))
        .await
        .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Validation);
    let err = save_config(&ctx, json!("text")).await.expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Validation);

    save_config(&ctx, json!({ "general": {} })).await.expect("save");
    assert_eq!(load_config(&ctx).await.expect("config"), json!({ "general": {} }));
}

#[tokio::test]
async fn concurrent_commands_all_land() {
    let ctx = setup();
    let turns = ["Junior Year Late Jan", "Classic Year Early Jan", "Classic Year Late Jan", "Senior Year Early Jan"];
    let tasks: Vec<_> = turns
        .iter()
        .map(|turn| {
            let ctx = ctx.clone();
            let command = assign(turn, "Stamina_Build");
            tokio::spawn(async move { apply_command(&ctx, command).await })
        })
        .collect();
    for task in tasks {
        task.await.expect("join").expect("command");
    }
    assert_eq!(stored_timeline(&ctx).await.len(), 5);
}
