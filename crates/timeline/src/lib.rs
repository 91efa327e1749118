//! Timeline model for mapping training strategy templates onto season turns.

pub mod assignment;
pub mod calendar;
pub mod editor;
pub mod gesture;
pub mod resolver;

pub use assignment::{
    assign, dangling_assignments, move_assignment, remove_all_assignments_for_template,
    rename_template, unassign, Mutation,
};
pub use calendar::{flatten, Calendar, CalendarError, Turn};
pub use editor::TimelineEditor;
pub use gesture::{DragPayload, DragResolution, DragSession, DragState, GestureEvent};
pub use resolver::{effective_at, orphaned_keys, resolve, spans, DerivedTurn, TemplateSpan};
