use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AssignmentMap, TemplateName, TurnKey};

/// One timeline mutation as sent by the editor or the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TimelineCommand {
    Assign {
        turn: TurnKey,
        template: TemplateName,
    },
    Unassign {
        turn: TurnKey,
    },
    Move {
        source: TurnKey,
        destination: TurnKey,
    },
    RemoveTemplateAssignments {
        template: TemplateName,
    },
    RenameTemplate {
        from: TemplateName,
        to: TemplateName,
    },
}

impl TimelineCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Assign { .. } => "assign",
            Self::Unassign { .. } => "unassign",
            Self::Move { .. } => "move",
            Self::RemoveTemplateAssignments { .. } => "remove_template_assignments",
            Self::RenameTemplate { .. } => "rename_template",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveConfigResponse {
    pub status: String,
    pub data: serde_json::Value,
}

impl SaveConfigResponse {
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            status: "success".into(),
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ConfigEvent {
    ConfigSaved {
        saved_at: DateTime<Utc>,
    },
    TimelineUpdated {
        timeline: AssignmentMap,
        saved_at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_use_tagged_snake_case_encoding() {
        let command: TimelineCommand = serde_json::from_value(serde_json::json!({
            "type": "move",
            "payload": { "source": "Junior Year Early Jan", "destination": "Finale Underway" }
        }))
        .expect("decode");
        assert_eq!(
            command,
            TimelineCommand::Move {
                source: "Junior Year Early Jan".into(),
                destination: "Finale Underway".into(),
            }
        );
        assert_eq!(command.name(), "move");
    }

    #[test]
    fn events_use_tagged_snake_case_encoding() {
        let saved_at = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .expect("timestamp")
            .with_timezone(&Utc);
        let event = ConfigEvent::TimelineUpdated {
            timeline: [("Finale Underway", "Speed_Build")].into_iter().collect(),
            saved_at,
        };
        assert_eq!(
            serde_json::to_value(&event).expect("encode"),
            serde_json::json!({
                "type": "timeline_updated",
                "payload": {
                    "timeline": { "Finale Underway": "Speed_Build" },
                    "saved_at": "2024-05-01T12:00:00Z"
                }
            })
        );

        let decoded: ConfigEvent = serde_json::from_value(serde_json::json!({
            "type": "config_saved",
            "payload": { "saved_at": "2024-05-01T12:00:00Z" }
        }))
        .expect("decode");
        assert!(matches!(decoded, ConfigEvent::ConfigSaved { saved_at: at } if at == saved_at));
        assert!(serde_json::from_value::<ConfigEvent>(serde_json::json!({
            "type": "error",
            "payload": { "code": "internal", "message": "boom" }
        }))
        .is_err());
    }
}
