use shared::domain::{AssignmentMap, TemplateName, TurnKey};
use tracing::debug;

use crate::{
    assignment::Mutation,
    calendar::{Calendar, Turn},
    gesture::{DragSession, GestureEvent},
    resolver::{resolve, spans, DerivedTurn, TemplateSpan},
};

/// Owns the latest assignment snapshot for one timeline view and reports every
/// change through `on_change`. All mutations are applied to the snapshot held
/// here, never to a copy captured earlier by the caller.
pub struct TimelineEditor<F>
where
    F: FnMut(&AssignmentMap),
{
    turns: Vec<Turn>,
    assignments: AssignmentMap,
    session: DragSession,
    on_change: F,
}

impl<F> TimelineEditor<F>
where
    F: FnMut(&AssignmentMap),
{
    pub fn new(calendar: &Calendar, assignments: AssignmentMap, on_change: F) -> Self {
        Self {
            turns: calendar.flatten(),
            assignments,
            session: DragSession::new(),
            on_change,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn assignments(&self) -> &AssignmentMap {
        &self.assignments
    }

    pub fn session(&self) -> &DragSession {
        &self.session
    }

    pub fn timeline(&self) -> Vec<DerivedTurn> {
        resolve(&self.turns, &self.assignments)
    }

    pub fn spans(&self) -> Vec<TemplateSpan> {
        spans(&self.timeline())
    }

    /// Adopts a snapshot loaded by the owner. Does not invoke `on_change`.
    pub fn replace_assignments(&mut self, assignments: AssignmentMap) {
        self.assignments = assignments;
    }

    /// Returns whether the map changed.
    pub fn apply(&mut self, mutation: Mutation) -> bool {
        let next = mutation.apply(&self.assignments);
        if next == self.assignments {
            return false;
        }
        self.assignments = next;
        (self.on_change)(&self.assignments);
        true
    }

    pub fn handle(&mut self, event: GestureEvent) -> bool {
        debug!(?event, "timeline gesture");
        match self.session.handle(event, &self.assignments) {
            Some(mutation) => self.apply(mutation),
            None => false,
        }
    }

    pub fn assign(&mut self, turn: impl Into<TurnKey>, template: impl Into<TemplateName>) -> bool {
        self.apply(Mutation::Assign {
            turn: turn.into(),
            template: template.into(),
        })
    }

    pub fn unassign(&mut self, turn: impl Into<TurnKey>) -> bool {
        self.apply(Mutation::Unassign { turn: turn.into() })
    }

    pub fn move_assignment(&mut self, source: impl Into<TurnKey>, destination: impl Into<TurnKey>) -> bool {
        self.apply(Mutation::Move {
            source: source.into(),
            destination: destination.into(),
        })
    }

    /// Call when a template is deleted from the palette.
    pub fn remove_template(&mut self, template: impl Into<TemplateName>) -> bool {
        self.apply(Mutation::RemoveTemplate {
            template: template.into(),
        })
    }

    pub fn rename_template(&mut self, from: impl Into<TemplateName>, to: impl Into<TemplateName>) -> bool {
        self.apply(Mutation::RenameTemplate {
            from: from.into(),
            to: to.into(),
        })
    }
}
