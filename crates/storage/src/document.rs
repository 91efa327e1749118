//! Typed access to the parts of the configuration document the timeline
//! editor owns. Everything else in the document is passed through untouched.

use serde_json::{Map, Value};
use shared::domain::{AssignmentMap, TemplateName};
use thiserror::Error;

pub const TRAINING_STRATEGY: &str = "training_strategy";
pub const TIMELINE: &str = "timeline";
pub const TEMPLATES: &str = "templates";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("configuration document must be a JSON object")]
    NotAnObject,
    #[error("'{0}' must be a JSON object")]
    InvalidSection(&'static str),
    #[error("timeline must map turn names to template names: {0}")]
    InvalidTimeline(String),
    #[error("template '{0}' already exists")]
    TemplateExists(TemplateName),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument(Map<String, Value>);

impl ConfigDocument {
    pub fn new(value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(DocumentError::NotAnObject),
        }
    }

    pub fn empty() -> Self {
        Self(Map::new())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    fn strategy(&self) -> Result<Option<&Map<String, Value>>, DocumentError> {
        match self.0.get(TRAINING_STRATEGY) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(section)) => Ok(Some(section)),
            Some(_) => Err(DocumentError::InvalidSection(TRAINING_STRATEGY)),
        }
    }

    fn strategy_mut(&mut self) -> Result<&mut Map<String, Value>, DocumentError> {
        let section = self
            .0
            .entry(TRAINING_STRATEGY)
            .or_insert_with(|| Value::Object(Map::new()));
        if section.is_null() {
            *section = Value::Object(Map::new());
        }
        section
            .as_object_mut()
            .ok_or(DocumentError::InvalidSection(TRAINING_STRATEGY))
    }

    /// Reads `training_strategy.timeline`. Missing sections read as empty and
    /// empty template names are treated as unassigned.
    pub fn timeline(&self) -> Result<AssignmentMap, DocumentError> {
        let Some(raw) = self.strategy()?.and_then(|section| section.get(TIMELINE)) else {
            return Ok(AssignmentMap::new());
        };
        if raw.is_null() {
            return Ok(AssignmentMap::new());
        }
        let mut timeline: AssignmentMap = serde_json::from_value(raw.clone())
            .map_err(|e| DocumentError::InvalidTimeline(e.to_string()))?;
        timeline.retain(|_, template| !template.is_empty());
        Ok(timeline)
    }

    pub fn set_timeline(&mut self, timeline: &AssignmentMap) -> Result<(), DocumentError> {
        let value = serde_json::to_value(timeline)
            .map_err(|e| DocumentError::InvalidTimeline(e.to_string()))?;
        self.strategy_mut()?.insert(TIMELINE.to_string(), value);
        Ok(())
    }

    /// Template names in document order.
    pub fn template_names(&self) -> Result<Vec<TemplateName>, DocumentError> {
        let Some(templates) = self.strategy()?.and_then(|section| section.get(TEMPLATES)) else {
            return Ok(Vec::new());
        };
        match templates {
            Value::Null => Ok(Vec::new()),
            Value::Object(map) => Ok(map.keys().map(|name| TemplateName::from(name.as_str())).collect()),
            _ => Err(DocumentError::InvalidSection(TEMPLATES)),
        }
    }

    fn templates_mut(&mut self) -> Result<&mut Map<String, Value>, DocumentError> {
        let templates = self
            .strategy_mut()?
            .entry(TEMPLATES)
            .or_insert_with(|| Value::Object(Map::new()));
        if templates.is_null() {
            *templates = Value::Object(Map::new());
        }
        templates
            .as_object_mut()
            .ok_or(DocumentError::InvalidSection(TEMPLATES))
    }

    /// Removes the template body only. Assignments referencing it are left to
    /// the caller.
    pub fn remove_template(&mut self, name: &TemplateName) -> Result<bool, DocumentError> {
        Ok(self.templates_mut()?.remove(name.as_str()).is_some())
    }

    pub fn rename_template(&mut self, from: &TemplateName, to: &TemplateName) -> Result<bool, DocumentError> {
        let templates = self.templates_mut()?;
        if from == to {
            return Ok(templates.contains_key(from.as_str()));
        }
        if templates.contains_key(to.as_str()) {
            return Err(DocumentError::TemplateExists(to.clone()));
        }
        match templates.remove(from.as_str()) {
            Some(body) => {
                templates.insert(to.to_string(), body);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> ConfigDocument {
        ConfigDocument::new(json!({
            "general": { "window": "Umamusume" },
            "training_strategy": {
                "templates": { "Speed_Build": { "spd": 600 }, "Stamina_Build": { "sta": 500 } },
                "timeline": { "Junior Year Early Jan": "Speed_Build", "Junior Year Late Jan": "" }
            }
        }))
        .expect("document")
    }

    #[test]
    fn reads_timeline_and_skips_empty_names() {
        let timeline = sample().timeline().expect("timeline");
        assert_eq!(timeline.len(), 1);
        assert_eq!(
            timeline.get("Junior Year Early Jan").map(TemplateName::as_str),
            Some("Speed_Build")
        );
    }

    #[test]
    fn missing_sections_read_as_empty_and_are_created_on_write() {
        let mut doc = ConfigDocument::empty();
        assert!(doc.timeline().expect("timeline").is_empty());
        assert!(doc.template_names().expect("names").is_empty());

        let map: AssignmentMap = [("Finale Underway", "Speed_Build")].into_iter().collect();
        doc.set_timeline(&map).expect("set");
        assert_eq!(
            doc.into_value(),
            json!({ "training_strategy": { "timeline": { "Finale Underway": "Speed_Build" } } })
        );
    }

    #[test]
    fn set_timeline_preserves_unrelated_fields() {
        let mut doc = sample();
        doc.set_timeline(&AssignmentMap::new()).expect("set");
        let value = doc.into_value();
        assert_eq!(value["general"]["window"], "Umamusume");
        assert_eq!(value["training_strategy"]["templates"]["Speed_Build"]["spd"], 600);
        assert_eq!(value["training_strategy"]["timeline"], json!({}));
    }

    #[test]
    fn rejects_non_object_documents_and_bad_timelines() {
        assert!(matches!(ConfigDocument::new(json!([1])), Err(DocumentError::NotAnObject)));
        let doc = ConfigDocument::new(json!({ "training_strategy": { "timeline": { "A": 3 } } }))
            .expect("document");
        assert!(matches!(doc.timeline(), Err(DocumentError::InvalidTimeline(_))));
        let doc = ConfigDocument::new(json!({ "training_strategy": "nope" })).expect("document");
        assert!(matches!(
            doc.timeline(),
            Err(DocumentError::InvalidSection(TRAINING_STRATEGY))
        ));
    }

    #[test]
    fn template_names_keep_document_order() {
        let names = sample().template_names().expect("names");
        assert_eq!(
            names,
            vec![TemplateName::from("Speed_Build"), TemplateName::from("Stamina_Build")]
        );
    }

    #[test]
    fn removes_and_renames_template_bodies() {
        let mut doc = sample();
        assert!(doc.remove_template(&"Speed_Build".into()).expect("remove"));
        assert!(!doc.remove_template(&"Speed_Build".into()).expect("remove again"));

        assert!(doc
            .rename_template(&"Stamina_Build".into(), &"Long_Distance".into())
            .expect("rename"));
        let value = doc.to_value();
        assert_eq!(value["training_strategy"]["templates"]["Long_Distance"]["sta"], 500);

        let mut doc = sample();
        assert!(matches!(
            doc.rename_template(&"Speed_Build".into(), &"Stamina_Build".into()),
            Err(DocumentError::TemplateExists(_))
        ));
    }
}
