//! Outline and storyboard documents.

use crate::path_component;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One planned section in an outline.
///
/// Fields beyond `id` and `title` are kept verbatim so the storyboard stage
/// sees everything the outline produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    /// Section identifier
    pub id: String,
    /// Human-readable title
    pub title: String,
    /// Any additional planning fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Structured lecture plan produced from a topic.
///
/// Created once per topic and never edited; regeneration replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    /// Lecture title
    pub topic: String,
    /// Intended audience
    pub target_audience: String,
    /// Ordered section plans
    pub sections: Vec<SectionSpec>,
    /// Any additional planning fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One independently rendered unit of the storyboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Section {
    /// Identifier, unique within a topic; storyboard position defines merge order
    pub id: String,
    /// Section title
    pub title: String,
    /// Narration lines shown beside the animation
    #[serde(default)]
    pub lecture_lines: Vec<String>,
    /// Ordered animation directives
    #[serde(default)]
    pub animations: Vec<String>,
}

impl Section {
    /// Default render entry point when none can be discovered in the source.
    ///
    /// # Examples
    ///
    /// ```
    /// use lumiere_core::Section;
    ///
    /// let section = Section {
    ///     id: "section_2".into(),
    ///     title: "Core loop".into(),
    ///     lecture_lines: vec![],
    ///     animations: vec![],
    /// };
    /// assert_eq!(section.default_scene_name(), "Section2Scene");
    /// ```
    pub fn default_scene_name(&self) -> String {
        let camel: String = self
            .id
            .split('_')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                    None => String::new(),
                }
            })
            .collect();
        format!("{}Scene", camel)
    }
}

/// Storyboard decomposition of an outline into sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storyboard {
    /// Sections in declared order
    pub sections: Vec<Section>,
    /// Any additional fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Storyboard {
    /// Checks the structural invariants the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violation: no sections, an empty
    /// identifier, or a duplicated identifier.
    pub fn validate(&self) -> Result<(), String> {
        if self.sections.is_empty() {
            return Err("storyboard has no sections".to_string());
        }
        let mut seen: HashMap<String, &str> = HashMap::new();
        for section in &self.sections {
            if section.id.trim().is_empty() {
                return Err(format!("section '{}' has an empty id", section.title));
            }
            if let Some(previous) = seen.insert(path_component(&section.id), section.id.as_str()) {
                return Err(if previous == section.id {
                    format!("duplicate section id '{}'", section.id)
                } else {
                    format!(
                        "section ids '{}' and '{}' map to the same artifact",
                        previous, section.id
                    )
                });
            }
        }
        Ok(())
    }

    /// Section identifiers in declared order.
    pub fn ordered_ids(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.id.clone()).collect()
    }
}
