//! Relay personas and system prompt assembly
//!
//! Each persona is described by a TOML template embedded from `personas/`.
//! The full system prompt is the template's voice section plus the knowledge
//! the persona is allowed to draw on, closed by its boundaries.
//!
//! # Example Persona File
//!
//! ```toml
//! [persona]
//! name = "wikiATL"
//! description = "Atlanta history guide"
//! max_tokens = 300
//!
//! [system_prompt]
//! content = """
//! You are wikiATL, an Atlanta history guide...
//! """
//!
//! [boundaries]
//! rules = ["ONLY answer questions about Atlanta history."]
//! refusal = "That's outside my lane."
//! ```
//!
//! Prompts are assembled once by [`PersonaRegistry::builtin`] and shared for
//! the life of the process.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::knowledge::{HistoryKnowledge, KnowledgeError, StoryKnowledge, StudioKnowledge};

const STORY_TEMPLATE: &str = include_str!("../../personas/story.toml");
const ABOUT_TEMPLATE: &str = include_str!("../../personas/about.toml");
const WIKI_TEMPLATE: &str = include_str!("../../personas/wiki.toml");

/// The three relay variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    /// The city narrating the guided story
    Story,
    /// The About page assistant
    About,
    /// The Atlanta history guide
    Wiki,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Persona::Story, Persona::About, Persona::Wiki];

    /// Resolve a route segment (`chat`, `about`, `wiki`)
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment.to_lowercase().as_str() {
            "chat" | "story" => Some(Persona::Story),
            "about" | "about-chat" => Some(Persona::About),
            "wiki" => Some(Persona::Wiki),
            _ => None,
        }
    }

    pub fn segment(&self) -> &'static str {
        match self {
            Persona::Story => "chat",
            Persona::About => "about",
            Persona::Wiki => "wiki",
        }
    }

    fn template_source(&self) -> &'static str {
        match self {
            Persona::Story => STORY_TEMPLATE,
            Persona::About => ABOUT_TEMPLATE,
            Persona::Wiki => WIKI_TEMPLATE,
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// A persona template as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaTemplate {
    /// Persona metadata
    pub persona: PersonaInfo,
    /// Voice and framing that opens the prompt
    pub system_prompt: SystemPrompt,
    /// Topic limits appended after the knowledge
    #[serde(default)]
    pub boundaries: Boundaries,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaInfo {
    /// Display name, e.g. "wikiATL"
    pub name: String,

    /// Short description of the persona's role
    #[serde(default)]
    pub description: String,

    /// Default completion ceiling when `OPENAI_MAX_TOKENS` is unset
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemPrompt {
    /// Identity and speaking style
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Boundaries {
    /// One bullet per rule, in order
    #[serde(default)]
    pub rules: Vec<String>,

    /// Exact wording used when declining an off-topic question
    #[serde(default)]
    pub refusal: Option<String>,
}

impl Boundaries {
    fn render(&self) -> String {
        let mut block = String::from("## Boundaries");
        for rule in &self.rules {
            block.push_str(&format!("\n- {}", rule));
        }
        if let Some(ref refusal) = self.refusal {
            block.push_str(&format!("\n- When refusing, say: \"{}\"", refusal));
        }
        block
    }
}

impl PersonaTemplate {
    pub fn from_str(content: &str) -> Result<Self, PersonaError> {
        toml::from_str(content).map_err(|e| PersonaError::ParseError(e.to_string()))
    }
}

/// An assembled, ready-to-send persona prompt
#[derive(Debug, Clone)]
pub struct PersonaPrompt {
    pub persona: Persona,
    /// Display name from the template
    pub name: String,
    /// Full system message: voice, knowledge, boundaries
    pub system_prompt: String,
    /// Completion ceiling unless the environment overrides it
    pub max_tokens: u32,
}

/// Assembled prompts for every persona, built once at startup
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    prompts: HashMap<Persona, Arc<PersonaPrompt>>,
}

impl PersonaRegistry {
    /// Assemble all personas from the embedded templates and knowledge bases
    pub fn builtin() -> Result<Self, PersonaError> {
        let story = StoryKnowledge::builtin()?;
        let history = HistoryKnowledge::builtin()?;
        let studio = StudioKnowledge::builtin()?;

        let mut prompts = HashMap::new();
        for persona in Persona::ALL {
            let template = PersonaTemplate::from_str(persona.template_source())?;
            let system_prompt = match persona {
                Persona::Story => assemble_story(&template, &story),
                Persona::About => assemble_about(&template, &studio, &story),
                Persona::Wiki => assemble_wiki(&template, &history),
            };

            tracing::debug!(
                persona = %persona,
                chars = system_prompt.len(),
                "assembled system prompt"
            );

            prompts.insert(
                persona,
                Arc::new(PersonaPrompt {
                    persona,
                    name: template.persona.name.clone(),
                    system_prompt,
                    max_tokens: template.persona.max_tokens,
                }),
            );
        }

        Ok(Self { prompts })
    }

    /// Registry with a single fixed prompt per persona, for tests and embedding
    pub fn from_prompts(prompts: impl IntoIterator<Item = PersonaPrompt>) -> Self {
        Self {
            prompts: prompts
                .into_iter()
                .map(|p| (p.persona, Arc::new(p)))
                .collect(),
        }
    }

    pub fn get(&self, persona: Persona) -> Option<Arc<PersonaPrompt>> {
        self.prompts.get(&persona).cloned()
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

fn assemble_story(template: &PersonaTemplate, story: &StoryKnowledge) -> String {
    format!(
        "{}\n\n## Your Knowledge\n\n{}\n\n{}",
        template.system_prompt.content.trim(),
        story.render(),
        template.boundaries.render()
    )
}

fn assemble_about(
    template: &PersonaTemplate,
    studio: &StudioKnowledge,
    story: &StoryKnowledge,
) -> String {
    format!(
        "{}\n\n## Important\n{}\n\n## Primary Knowledge: James McKay / Creative Context\n\n{}\n\n\
         ## Secondary Knowledge: storyATL Project\n\n{}\n\n{}",
        template.system_prompt.content.trim(),
        studio.entity_note.trim(),
        studio.render(),
        story.render(),
        template.boundaries.render()
    )
}

fn assemble_wiki(template: &PersonaTemplate, history: &HistoryKnowledge) -> String {
    format!(
        "{}\n\n## Your Knowledge\n\n{}\n\n{}",
        template.system_prompt.content.trim(),
        history.render(),
        template.boundaries.render()
    )
}

/// Errors from persona loading
#[derive(Debug, thiserror::Error)]
pub enum PersonaError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Knowledge error: {0}")]
    Knowledge(#[from] KnowledgeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_template() {
        let toml_content = r#"
[persona]
name = "Test Persona"
description = "A test persona"
max_tokens = 120

[system_prompt]
content = "You are a test assistant."

[boundaries]
rules = ["Only tests.", "Nothing else."]
refusal = "Not my lane."
"#;

        let template = PersonaTemplate::from_str(toml_content).unwrap();
        assert_eq!(template.persona.name, "Test Persona");
        assert_eq!(template.persona.max_tokens, 120);
        assert_eq!(
            template.boundaries.render(),
            "## Boundaries\n- Only tests.\n- Nothing else.\n- When refusing, say: \"Not my lane.\""
        );
    }

    #[test]
    fn test_minimal_template() {
        let toml_content = r#"
[persona]
name = "Minimal"

[system_prompt]
content = "Hello"
"#;

        let template = PersonaTemplate::from_str(toml_content).unwrap();
        assert_eq!(template.persona.max_tokens, 300);
        assert!(template.boundaries.rules.is_empty());
    }

    #[test]
    fn test_segments_round_trip() {
        for persona in Persona::ALL {
            assert_eq!(Persona::from_segment(persona.segment()), Some(persona));
        }
        assert_eq!(Persona::from_segment("about-chat"), Some(Persona::About));
        assert_eq!(Persona::from_segment("weather"), None);
    }

    #[test]
    fn test_builtin_registry_assembles_every_persona() {
        let registry = PersonaRegistry::builtin().unwrap();
        assert_eq!(registry.len(), 3);

        let story = registry.get(Persona::Story).unwrap();
        assert!(story.system_prompt.starts_with("You are Atlanta"));
        assert!(story.system_prompt.contains("## The Five Voices"));
        assert!(story.system_prompt.contains("That's not my story to tell."));
        assert_eq!(story.max_tokens, 300);

        let about = registry.get(Persona::About).unwrap();
        assert!(about.system_prompt.contains("## Important"));
        assert!(about.system_prompt.contains("### Creative Context Studio"));
        assert!(about.system_prompt.contains("## Secondary Knowledge: storyATL Project"));
        assert_eq!(about.max_tokens, 400);

        let wiki = registry.get(Persona::Wiki).unwrap();
        assert!(wiki.system_prompt.contains("### Terminus (1837-1847)"));
        assert!(!wiki.system_prompt.contains("## The Five Voices"));
    }

    #[test]
    fn test_prompts_are_shared_not_rebuilt() {
        let registry = PersonaRegistry::builtin().unwrap();
        let first = registry.get(Persona::Wiki).unwrap();
        let second = registry.get(Persona::Wiki).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
