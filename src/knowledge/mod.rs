//! Static knowledge bases the relay personas are grounded in
//!
//! Three TOML documents are embedded at compile time:
//!
//! - `knowledge/storyatl.toml`: named markdown sections about the project
//! - `knowledge/atl_history.toml`: Atlanta history eras for wikiATL
//! - `knowledge/creative_context.toml`: the studio knowledge base for the About page
//!
//! Each renders to the markdown block that gets spliced into a system prompt.

use serde::{Deserialize, Serialize};

const STORYATL_TOML: &str = include_str!("../../knowledge/storyatl.toml");
const ATL_HISTORY_TOML: &str = include_str!("../../knowledge/atl_history.toml");
const CREATIVE_CONTEXT_TOML: &str = include_str!("../../knowledge/creative_context.toml");

/// Separator placed between knowledge-base blocks
const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// One named markdown section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSection {
    /// Section heading
    pub name: String,
    /// Markdown body, inserted verbatim
    pub content: String,
}

/// The project knowledge shared by the story and about personas
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryKnowledge {
    /// Sections in prompt order
    #[serde(default)]
    pub sections: Vec<KnowledgeSection>,
}

impl StoryKnowledge {
    pub fn builtin() -> Result<Self, KnowledgeError> {
        Self::from_str(STORYATL_TOML)
    }

    pub fn from_str(content: &str) -> Result<Self, KnowledgeError> {
        Ok(toml::from_str(content)?)
    }

    pub fn section(&self, name: &str) -> Option<&KnowledgeSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// All sections in declaration order, blank-line separated
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.content.trim())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A dated event within an era
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Year as written, e.g. "1864" or "1960s"
    pub year: String,
    /// One-line description of what happened
    pub event: String,
}

/// One period of Atlanta history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Era {
    /// Era name used as the block heading
    pub era: String,
    /// Span shown beside the heading, e.g. "1837-1860"
    pub year_range: String,
    /// Narrative summary of the period
    pub content: String,
    /// Rendered as `year: event` bullets
    #[serde(default)]
    pub key_events: Vec<KeyEvent>,
    /// Rendered as a comma-separated list
    #[serde(default)]
    pub key_people: Vec<String>,
    /// Rendered as a comma-separated list
    #[serde(default)]
    pub key_places: Vec<String>,
}

impl Era {
    fn render(&self) -> String {
        let mut block = format!("### {} ({})\n{}", self.era, self.year_range, self.content);

        if !self.key_events.is_empty() {
            block.push_str("\n\nKey events:");
            for e in &self.key_events {
                block.push_str(&format!("\n- {}: {}", e.year, e.event));
            }
        }

        if !self.key_people.is_empty() {
            block.push_str(&format!("\n\nKey people: {}", self.key_people.join(", ")));
        }

        if !self.key_places.is_empty() {
            block.push_str(&format!("\n\nKey places: {}", self.key_places.join(", ")));
        }

        block
    }
}

/// Atlanta history, era by era
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryKnowledge {
    /// Eras in chronological order
    #[serde(default)]
    pub eras: Vec<Era>,
}

impl HistoryKnowledge {
    pub fn builtin() -> Result<Self, KnowledgeError> {
        Self::from_str(ATL_HISTORY_TOML)
    }

    pub fn from_str(content: &str) -> Result<Self, KnowledgeError> {
        Ok(toml::from_str(content)?)
    }

    pub fn render(&self) -> String {
        self.eras
            .iter()
            .map(Era::render)
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR)
    }
}

/// One topic block about the studio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioSection {
    /// Block heading
    pub topic: String,
    /// Prose body of the block
    pub content: String,
    /// Rendered under "Key details:" as bullets
    #[serde(default)]
    pub key_details: Vec<String>,
}

impl StudioSection {
    fn render(&self) -> String {
        let mut block = format!("### {}\n{}", self.topic, self.content);

        if !self.key_details.is_empty() {
            block.push_str("\n\nKey details:");
            for d in &self.key_details {
                block.push_str(&format!("\n- {}", d));
            }
        }

        block
    }
}

/// Knowledge about the builder and the studio
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudioKnowledge {
    /// Disambiguation note placed ahead of everything else
    #[serde(default)]
    pub entity_note: String,
    /// Topic blocks, separated in the prompt by `---`
    #[serde(default)]
    pub sections: Vec<StudioSection>,
}

impl StudioKnowledge {
    pub fn builtin() -> Result<Self, KnowledgeError> {
        Self::from_str(CREATIVE_CONTEXT_TOML)
    }

    pub fn from_str(content: &str) -> Result<Self, KnowledgeError> {
        Ok(toml::from_str(content)?)
    }

    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(StudioSection::render)
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_story_sections_in_order() {
        let knowledge = StoryKnowledge::builtin().unwrap();
        let names: Vec<_> = knowledge.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["about", "dtn", "voices", "brief", "atlanta", "creative-context"]
        );
        assert!(knowledge.section("voices").unwrap().content.contains("Marcus"));
    }

    #[test]
    fn test_era_rendering() {
        let history = HistoryKnowledge::from_str(
            r#"
[[eras]]
era = "Terminus"
year_range = "1837-1847"
content = "A railroad stake."
key_people = ["A", "B"]

[[eras.key_events]]
year = "1837"
event = "Founded"

[[eras]]
era = "Later"
year_range = "1900"
content = "More."
"#,
        )
        .unwrap();

        let rendered = history.render();
        assert!(rendered.starts_with("### Terminus (1837-1847)\nA railroad stake."));
        assert!(rendered.contains("Key events:\n- 1837: Founded"));
        assert!(rendered.contains("Key people: A, B"));
        assert!(!rendered.contains("Key places"));
        assert!(rendered.contains("\n\n---\n\n### Later (1900)\nMore."));
    }

    #[test]
    fn test_studio_rendering_skips_empty_details() {
        let studio = StudioKnowledge::from_str(
            r#"
entity_note = "Keep them apart."

[[sections]]
topic = "One"
content = "First."
key_details = ["x"]

[[sections]]
topic = "Two"
content = "Second."
"#,
        )
        .unwrap();

        assert_eq!(studio.entity_note, "Keep them apart.");
        assert_eq!(
            studio.render(),
            "### One\nFirst.\n\nKey details:\n- x\n\n---\n\n### Two\nSecond."
        );
    }

    #[test]
    fn test_builtin_bases_parse() {
        assert!(!HistoryKnowledge::builtin().unwrap().eras.is_empty());
        assert!(!StudioKnowledge::builtin().unwrap().sections.is_empty());
    }
}
