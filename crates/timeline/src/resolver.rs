//! Derives the per-turn view of the timeline from the sparse assignment map.
//!
//! An explicit assignment stays in effect for every following turn until the
//! next explicit assignment, so the map only needs one entry per change.

use serde::{Deserialize, Serialize};
use shared::domain::{AssignmentMap, TemplateName, TurnKey};

use crate::calendar::Turn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedTurn {
    #[serde(flatten)]
    pub turn: Turn,
    pub explicit_template: Option<TemplateName>,
    pub effective_template: Option<TemplateName>,
    pub year_start: bool,
    pub year_end: bool,
}

impl DerivedTurn {
    pub fn key(&self) -> &TurnKey {
        &self.turn.key
    }
}

/// A run of consecutive turns sharing one effective template. `start` is
/// always the turn holding the explicit assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSpan {
    pub template: TemplateName,
    pub start: TurnKey,
    pub end: TurnKey,
    pub len: usize,
}

pub fn resolve(turns: &[Turn], assignments: &AssignmentMap) -> Vec<DerivedTurn> {
    let mut current: Option<&TemplateName> = None;
    turns
        .iter()
        .enumerate()
        .map(|(index, turn)| {
            let explicit = explicit_at(assignments, &turn.key);
            if explicit.is_some() {
                current = explicit;
            }
            DerivedTurn {
                turn: turn.clone(),
                explicit_template: explicit.cloned(),
                effective_template: current.cloned(),
                year_start: index == 0 || turns[index - 1].year != turn.year,
                year_end: index + 1 == turns.len() || turns[index + 1].year != turn.year,
            }
        })
        .collect()
}

pub fn effective_at<'a>(
    turns: &[Turn],
    assignments: &'a AssignmentMap,
    key: &str,
) -> Option<&'a TemplateName> {
    let position = turns.iter().position(|turn| turn.key.as_str() == key)?;
    turns[..=position]
        .iter()
        .rev()
        .find_map(|turn| explicit_at(assignments, &turn.key))
}

fn explicit_at<'a>(assignments: &'a AssignmentMap, key: &TurnKey) -> Option<&'a TemplateName> {
    assignments
        .get(key.as_str())
        .filter(|template| !template.is_empty())
}

pub fn spans(timeline: &[DerivedTurn]) -> Vec<TemplateSpan> {
    let mut spans: Vec<TemplateSpan> = Vec::new();
    for entry in timeline {
        if let Some(template) = &entry.explicit_template {
            spans.push(TemplateSpan {
                template: template.clone(),
                start: entry.turn.key.clone(),
                end: entry.turn.key.clone(),
                len: 1,
            });
        } else if let Some(span) = spans.last_mut() {
            span.end = entry.turn.key.clone();
            span.len += 1;
        }
    }
    spans
}

/// Assignment keys that do not name any turn of the calendar. They are kept
/// in the map but never take effect.
pub fn orphaned_keys<'a>(turns: &[Turn], assignments: &'a AssignmentMap) -> Vec<&'a TurnKey> {
    assignments
        .iter()
        .map(|(key, _)| key)
        .filter(|key| !turns.iter().any(|turn| turn.key == **key))
        .collect()
}
