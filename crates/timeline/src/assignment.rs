//! Pure operations over the assignment map. Every function takes the current
//! snapshot and returns a new map; the input is never modified.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use shared::{
    domain::{AssignmentMap, TemplateName, TurnKey},
    protocol::TimelineCommand,
};
use tracing::debug;

/// An empty template name is not an assignment; the map is returned unchanged.
pub fn assign(map: &AssignmentMap, turn: &TurnKey, template: &TemplateName) -> AssignmentMap {
    let mut next = map.clone();
    if template.is_empty() {
        return next;
    }
    next.insert(turn.clone(), template.clone());
    next
}

pub fn unassign(map: &AssignmentMap, turn: &TurnKey) -> AssignmentMap {
    let mut next = map.clone();
    next.remove(turn.as_str());
    next
}

/// Moves the explicit assignment at `source` onto `destination`, overwriting
/// whatever `destination` held. A source that only inherits a template has
/// nothing to move.
pub fn move_assignment(map: &AssignmentMap, source: &TurnKey, destination: &TurnKey) -> AssignmentMap {
    if source == destination {
        return map.clone();
    }
    let Some(template) = map.get(source.as_str()) else {
        return map.clone();
    };
    assign(&unassign(map, source), destination, template)
}

pub fn remove_all_assignments_for_template(map: &AssignmentMap, template: &TemplateName) -> AssignmentMap {
    let mut next = map.clone();
    next.retain(|_, assigned| *assigned != *template);
    next
}

pub fn rename_template(map: &AssignmentMap, from: &TemplateName, to: &TemplateName) -> AssignmentMap {
    let mut next = map.clone();
    for assigned in next.values_mut() {
        if *assigned == *from {
            *assigned = to.clone();
        }
    }
    next
}

/// Assignments whose template is not in `known`, in map order.
pub fn dangling_assignments<'a>(
    map: &'a AssignmentMap,
    known: &HashSet<TemplateName>,
) -> Vec<(&'a TurnKey, &'a TemplateName)> {
    map.iter()
        .filter(|(_, template)| !known.contains(*template))
        .collect()
}

/// A single edit to the assignment map, as emitted by gestures and commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    Assign { turn: TurnKey, template: TemplateName },
    Unassign { turn: TurnKey },
    Move { source: TurnKey, destination: TurnKey },
    RemoveTemplate { template: TemplateName },
    RenameTemplate { from: TemplateName, to: TemplateName },
}

impl Mutation {
    pub fn apply(&self, map: &AssignmentMap) -> AssignmentMap {
        let next = match self {
            Self::Assign { turn, template } => assign(map, turn, template),
            Self::Unassign { turn } => unassign(map, turn),
            Self::Move {
                source,
                destination,
            } => move_assignment(map, source, destination),
            Self::RemoveTemplate { template } => remove_all_assignments_for_template(map, template),
            Self::RenameTemplate { from, to } => rename_template(map, from, to),
        };
        debug!(
            mutation = ?self,
            before = map.len(),
            after = next.len(),
            changed = next != *map,
            "applied timeline mutation"
        );
        next
    }
}

impl From<TimelineCommand> for Mutation {
    fn from(command: TimelineCommand) -> Self {
        match command {
            TimelineCommand::Assign { turn, template } => Self::Assign { turn, template },
            TimelineCommand::Unassign { turn } => Self::Unassign { turn },
            TimelineCommand::Move {
                source,
                destination,
            } => Self::Move {
                source,
                destination,
            },
            TimelineCommand::RemoveTemplateAssignments { template } => Self::RemoveTemplate { template },
            TimelineCommand::RenameTemplate { from, to } => Self::RenameTemplate { from, to },
        }
    }
}

#[cfg(test)]
#[path = "tests/assignment_tests.rs"]
mod tests;
