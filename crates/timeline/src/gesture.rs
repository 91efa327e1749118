//! Headless drag/drop state machine for editing the timeline.
//!
//! The host UI forwards its pointer events as [`GestureEvent`]s. The session
//! never touches the assignment map itself; it answers each event with the
//! [`Mutation`] (if any) the owner should apply to its latest snapshot.
//!
//! A gesture that picks up an assigned slot and is released anywhere other
//! than a timeline slot discards that assignment.

use serde::{Deserialize, Serialize};
use shared::domain::{AssignmentMap, TemplateName, TurnKey};
use tracing::debug;

use crate::assignment::Mutation;

/// What travels with a drag. Palette drags have no origin turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<TurnKey>,
}

impl DragPayload {
    pub fn from_palette(template: impl Into<TemplateName>) -> Self {
        Self {
            template: Some(template.into()),
            origin: None,
        }
    }

    /// Payload for dragging the content of `turn`; `None` when the slot has
    /// no explicit assignment and therefore nothing to pick up.
    pub fn from_slot(assignments: &AssignmentMap, turn: &TurnKey) -> Option<Self> {
        assignments.get(turn.as_str()).map(|template| Self {
            template: Some(template.clone()),
            origin: Some(turn.clone()),
        })
    }

    fn template_name(&self) -> Option<&TemplateName> {
        self.template.as_ref().filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum GestureEvent {
    DragStart(DragPayload),
    DragOver(TurnKey),
    DragLeave,
    Drop { target: TurnKey, payload: DragPayload },
    DragEnd,
    /// Aborted by the host (escape key, window blur) before any drag end.
    Cancel,
    Click(TurnKey),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragPayload),
}

/// How the last completed gesture ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragResolution {
    DroppedOnTimelineSlot(TurnKey),
    DroppedOutside,
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct DragSession {
    state: DragState,
    hovered: Option<TurnKey>,
    drop_target: Option<TurnKey>,
    resolved: bool,
    last_resolution: Option<DragResolution>,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Slot currently under the pointer. Display only.
    pub fn hovered(&self) -> Option<&TurnKey> {
        self.hovered.as_ref()
    }

    pub fn last_resolution(&self) -> Option<&DragResolution> {
        self.last_resolution.as_ref()
    }

    pub fn handle(&mut self, event: GestureEvent, assignments: &AssignmentMap) -> Option<Mutation> {
        match event {
            GestureEvent::DragStart(payload) => {
                self.start(payload, assignments);
                None
            }
            GestureEvent::DragOver(turn) => {
                self.hovered = Some(turn);
                None
            }
            GestureEvent::DragLeave => {
                self.hovered = None;
                None
            }
            GestureEvent::Drop { target, payload } => self.drop_on(target, &payload),
            GestureEvent::DragEnd => self.end(false),
            GestureEvent::Cancel => self.end(true),
            GestureEvent::Click(turn) => {
                if self.is_dragging() || !assignments.contains(turn.as_str()) {
                    return None;
                }
                Some(Mutation::Unassign { turn })
            }
        }
    }

    fn start(&mut self, payload: DragPayload, assignments: &AssignmentMap) {
        if let Some(origin) = &payload.origin {
            if assignments.get(origin.as_str()) != payload.template.as_ref() {
                debug!(%origin, "ignoring drag from slot without explicit assignment");
                self.state = DragState::Idle;
                self.hovered = None;
                self.drop_target = None;
                return;
            }
        }
        self.state = DragState::Dragging(payload);
        self.hovered = None;
        self.drop_target = None;
        self.resolved = false;
    }

    fn drop_on(&mut self, target: TurnKey, payload: &DragPayload) -> Option<Mutation> {
        self.hovered = None;
        if self.is_dragging() {
            self.drop_target = Some(target.clone());
        }

        let Some(template) = payload.template_name() else {
            debug!(%target, "ignoring drop without template name");
            return None;
        };

        match &payload.origin {
            Some(origin) if *origin == target => None,
            Some(origin) => Some(Mutation::Move {
                source: origin.clone(),
                destination: target,
            }),
            None => Some(Mutation::Assign {
                turn: target,
                template: template.clone(),
            }),
        }
    }

    fn end(&mut self, cancelled: bool) -> Option<Mutation> {
        let state = std::mem::take(&mut self.state);
        self.hovered = None;
        let DragState::Dragging(payload) = state else {
            return None;
        };
        if self.resolved {
            return None;
        }
        self.resolved = true;

        let resolution = match (self.drop_target.take(), cancelled) {
            (Some(target), _) => DragResolution::DroppedOnTimelineSlot(target),
            (None, true) => DragResolution::Cancelled,
            (None, false) => DragResolution::DroppedOutside,
        };
        debug!(?resolution, "drag gesture resolved");

        let mutation = match (&resolution, payload.origin) {
            (DragResolution::DroppedOnTimelineSlot(_), _) | (_, None) => None,
            (_, Some(origin)) => Some(Mutation::Unassign { turn: origin }),
        };
        self.last_resolution = Some(resolution);
        mutation
    }
}

#[cfg(test)]
#[path = "tests/gesture_tests.rs"]
mod tests;
