use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{
    domain::{TemplateName, TurnKey},
    error::ApiError,
    protocol::{ConfigEvent, TimelineCommand},
};
use storage::{ConfigDocument, DocumentError, Storage};
use timeline::{
    dangling_assignments, orphaned_keys, resolve, spans, Calendar, DerivedTurn, Mutation,
    TemplateSpan, Turn,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub calendar: Arc<Calendar>,
    /// Serializes read-modify-write cycles on the document.
    write_lock: Arc<Mutex<()>>,
}

impl ApiContext {
    pub fn new(storage: Storage, calendar: Calendar) -> Self {
        Self {
            storage,
            calendar: Arc::new(calendar),
            write_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingAssignment {
    pub turn: TurnKey,
    pub template: TemplateName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineView {
    pub turns: Vec<DerivedTurn>,
    pub spans: Vec<TemplateSpan>,
    pub templates: Vec<TemplateName>,
    pub dangling: Vec<DanglingAssignment>,
    pub orphaned: Vec<TurnKey>,
}

#[derive(Debug, Clone)]
pub struct TimelineUpdate {
    pub view: TimelineView,
    pub event: ConfigEvent,
}

pub fn calendar_turns(ctx: &ApiContext) -> Vec<Turn> {
    ctx.calendar.flatten()
}

pub async fn load_config(ctx: &ApiContext) -> Result<Value, ApiError> {
    ctx.storage.load_raw().await.map_err(internal)
}

/// Replaces the whole document. The timeline section is parsed first so a
/// malformed editor payload never reaches disk.
pub async fn save_config(ctx: &ApiContext, document: Value) -> Result<ConfigEvent, ApiError> {
    let document = ConfigDocument::new(document).map_err(invalid_document)?;
    document.timeline().map_err(invalid_document)?;
    document.template_names().map_err(invalid_document)?;

    let _guard = ctx.write_lock.lock().await;
    ctx.storage
        .save_document(&document)
        .await
        .map_err(internal)?;
    Ok(ConfigEvent::ConfigSaved {
        saved_at: Utc::now(),
    })
}

pub async fn timeline_view(ctx: &ApiContext) -> Result<TimelineView, ApiError> {
    let document = ctx.storage.load_document().await.map_err(internal)?;
    build_view(ctx, &document)
}

pub async fn apply_command(ctx: &ApiContext, command: TimelineCommand) -> Result<TimelineUpdate, ApiError> {
    let _guard = ctx.write_lock.lock().await;
    let mut document = ctx.storage.load_document().await.map_err(internal)?;
    let timeline = document.timeline().map_err(invalid_document)?;

    validate_command(ctx, &command, &timeline)?;
    if let TimelineCommand::RenameTemplate { from, to } = &command {
        document
            .rename_template(from, to)
            .map_err(invalid_document)?;
    }

    let command_name = command.name();
    let next = Mutation::from(command).apply(&timeline);
    document.set_timeline(&next).map_err(invalid_document)?;
    ctx.storage
        .save_document(&document)
        .await
        .map_err(internal)?;
    info!(
        command = command_name,
        assignments = next.len(),
        "timeline command applied"
    );

    Ok(TimelineUpdate {
        view: build_view(ctx, &document)?,
        event: ConfigEvent::TimelineUpdated {
            timeline: next,
            saved_at: Utc::now(),
        },
    })
}

/// Deletes the template body and every assignment that references it.
pub async fn delete_template(ctx: &ApiContext, template: &TemplateName) -> Result<TimelineUpdate, ApiError> {
    let _guard = ctx.write_lock.lock().await;
    let mut document = ctx.storage.load_document().await.map_err(internal)?;
    let timeline = document.timeline().map_err(invalid_document)?;

    if !document.remove_template(template).map_err(invalid_document)? {
        return Err(ApiError::not_found(format!("template '{template}' not found")));
    }
    let next = Mutation::RemoveTemplate {
        template: template.clone(),
    }
    .apply(&timeline);
    document.set_timeline(&next).map_err(invalid_document)?;
    ctx.storage
        .save_document(&document)
        .await
        .map_err(internal)?;
    info!(
        %template,
        removed = timeline.len() - next.len(),
        "template deleted"
    );

    Ok(TimelineUpdate {
        view: build_view(ctx, &document)?,
        event: ConfigEvent::TimelineUpdated {
            timeline: next,
            saved_at: Utc::now(),
        },
    })
}

fn build_view(ctx: &ApiContext, document: &ConfigDocument) -> Result<TimelineView, ApiError> {
    let timeline = document.timeline().map_err(invalid_document)?;
    let templates = document.template_names().map_err(invalid_document)?;
    let known: HashSet<TemplateName> = templates.iter().cloned().collect();
    let turns = ctx.calendar.flatten();

    let derived = resolve(&turns, &timeline);
    let orphaned: Vec<TurnKey> = orphaned_keys(&turns, &timeline)
        .into_iter()
        .cloned()
        .collect();
    if !orphaned.is_empty() {
        warn!(count = orphaned.len(), "timeline holds turns missing from the calendar");
    }

    Ok(TimelineView {
        spans: spans(&derived),
        turns: derived,
        dangling: dangling_assignments(&timeline, &known)
            .into_iter()
            .map(|(turn, template)| DanglingAssignment {
                turn: turn.clone(),
                template: template.clone(),
            })
            .collect(),
        templates,
        orphaned,
    })
}

fn validate_command(
    ctx: &ApiContext,
    command: &TimelineCommand,
    timeline: &shared::domain::AssignmentMap,
) -> Result<(), ApiError> {
    let known_turn = |turn: &TurnKey| -> Result<(), ApiError> {
        if ctx.calendar.contains(turn.as_str()) {
            Ok(())
        } else {
            Err(ApiError::validation(format!("unknown turn '{turn}'")))
        }
    };
    let named = |template: &TemplateName| -> Result<(), ApiError> {
        if template.as_str().trim().is_empty() {
            Err(ApiError::validation("template name cannot be empty"))
        } else {
            Ok(())
        }
    };

    match command {
        TimelineCommand::Assign { turn, template } => {
            known_turn(turn)?;
            named(template)
        }
        TimelineCommand::Unassign { turn } => {
            // Orphaned keys may still be removed.
            if timeline.contains(turn.as_str()) {
                Ok(())
            } else {
                known_turn(turn)
            }
        }
        TimelineCommand::Move {
            source,
            destination,
        } => {
            known_turn(source)?;
            known_turn(destination)
        }
        TimelineCommand::RemoveTemplateAssignments { template } => named(template),
        TimelineCommand::RenameTemplate { from, to } => {
            named(from)?;
            named(to)
        }
    }
}

fn invalid_document(err: DocumentError) -> ApiError {
    ApiError::validation(err.to_string())
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::internal(format!("{err:#}"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
