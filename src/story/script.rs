//! The exchange script: the ordered, immutable sequence of scripted turns

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rich content rendered under a narrator message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RichComponent {
    VoiceProfiles,
    BoothSteps,
    ShieldList,
    PlanPhases,
}

impl fmt::Display for RichComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            RichComponent::VoiceProfiles => "VoiceProfiles",
            RichComponent::BoothSteps => "BoothSteps",
            RichComponent::ShieldList => "ShieldList",
            RichComponent::PlanPhases => "PlanPhases",
        };
        f.write_str(tag)
    }
}

/// Caption for an exchange's visual panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualMeta {
    pub title: String,
    pub subtitle: String,
    #[serde(default)]
    pub stat: String,
}

/// One scripted unit of the guided conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: usize,
    pub slug: String,
    pub title: String,
    /// Short label for the timeline dot
    pub label: String,
    /// Empty for exchanges the visitor doesn't open (the greeting, the live chat)
    #[serde(default)]
    pub visitor_question: String,
    pub scripted_response: String,
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub component: Option<RichComponent>,
    #[serde(default)]
    pub visual: Option<VisualMeta>,
}

impl Exchange {
    pub fn visitor_question(&self) -> Option<&str> {
        Some(self.visitor_question.as_str()).filter(|q| !q.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ScriptFile {
    exchanges: Vec<Exchange>,
}

/// An ordered script with dense ids `0..len`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeScript {
    exchanges: Vec<Exchange>,
}

impl ExchangeScript {
    /// Build a script, checking it is non-empty and densely numbered
    pub fn new(exchanges: Vec<Exchange>) -> Result<Self, ScriptError> {
        if exchanges.is_empty() {
            return Err(ScriptError::Empty);
        }
        for (position, exchange) in exchanges.iter().enumerate() {
            if exchange.id != position {
                return Err(ScriptError::OutOfOrder {
                    position,
                    id: exchange.id,
                });
            }
        }
        Ok(Self { exchanges })
    }

    /// Load a script from TOML (`[[exchanges]]` tables)
    pub fn from_toml_str(content: &str) -> Result<Self, ScriptError> {
        let file: ScriptFile = toml::from_str(content)?;
        Self::new(file.exchanges)
    }

    /// Number of exchanges, `N`
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Index of the terminal (live chat) exchange, `N - 1`
    pub fn terminal(&self) -> usize {
        self.exchanges.len() - 1
    }

    pub fn get(&self, id: usize) -> Option<&Exchange> {
        self.exchanges.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }

    /// Timeline labels in order
    pub fn labels(&self) -> Vec<&str> {
        self.exchanges.iter().map(|e| e.label.as_str()).collect()
    }

    /// Clamp a raw index into `[0, N - 1]`
    pub fn clamp(&self, raw: isize) -> usize {
        clamp_index(raw, self.terminal())
    }

    /// The storyATL script
    pub fn storyatl() -> Self {
        Self {
            exchanges: storyatl_exchanges(),
        }
    }
}

impl Default for ExchangeScript {
    fn default() -> Self {
        Self::storyatl()
    }
}

/// Clamp a possibly negative index into `[0, max]`
pub fn clamp_index(raw: isize, max: usize) -> usize {
    if raw <= 0 {
        0
    } else {
        (raw as usize).min(max)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("script has no exchanges")]
    Empty,

    #[error("exchange at position {position} has id {id}")]
    OutOfOrder { position: usize, id: usize },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn exchange(
    id: usize,
    slug: &str,
    title: &str,
    label: &str,
    visitor_question: &str,
    scripted_response: &str,
) -> Exchange {
    Exchange {
        id,
        slug: slug.into(),
        title: title.into(),
        label: label.into(),
        visitor_question: visitor_question.into(),
        scripted_response: scripted_response.into(),
        suggestion: None,
        component: None,
        visual: None,
    }
}

fn visual(title: &str, subtitle: &str, stat: &str) -> Option<VisualMeta> {
    Some(VisualMeta {
        title: title.into(),
        subtitle: subtitle.into(),
        stat: stat.into(),
    })
}

fn storyatl_exchanges() -> Vec<Exchange> {
    vec![
        Exchange {
            suggestion: Some("Tell me a story that could only happen here.".into()),
            visual: visual("Atlanta Welcome", "A city of stories", "RECORD. TAG. TELL STORIES."),
            ..exchange(0, "welcome", "Atlanta Welcome", "Welcome", "", "Ask Atlanta a question.")
        },
        Exchange {
            suggestion: Some("Who is telling these stories?".into()),
            visual: visual("The City", "A living archive", "RECORD. TAG. TELL STORIES."),
            ..exchange(
                1,
                "city",
                "The City",
                "City",
                "Tell me a story that could only happen here.",
                "This is storyATL, a living archive where Atlanta tells its own stories. Every story is an Atlanta voice. Every voice has a place. Record. Tag. Tell Stories.",
            )
        },
        Exchange {
            suggestion: Some("How does it work?".into()),
            component: Some(RichComponent::VoiceProfiles),
            visual: visual("The Voices", "Who talks?", "5 VOICES ACROSS 5 NEIGHBORHOODS"),
            ..exchange(
                2,
                "voices",
                "The Voices",
                "Voices",
                "Who is telling these stories?",
                "Everyone."
            )
        },
        Exchange {
            suggestion: Some("What protects the stories and storytellers?".into()),
            component: Some(RichComponent::BoothSteps),
            visual: visual("The Booth", "How does it work?", "7 STEPS FROM STORY TO MAP PIN"),
            ..exchange(
                3,
                "booth",
                "The Booth",
                "Booth",
                "How does it work?",
                "Seven steps. Walk up, consent, record your story, title and tag it, drop a pin, choose who sees it, submit. The booth handles the rest.",
            )
        },
        Exchange {
            suggestion: Some("Show me the interactive map.".into()),
            component: Some(RichComponent::ShieldList),
            visual: visual("The Shield", "What protects the stories?", ""),
            ..exchange(
                4,
                "shield",
                "The Shield",
                "Shield",
                "What protects the stories and storytellers?",
                "The storytellers do.\nThey decide who can see a story: everyone, their community, or just them.\nThey decide how precise the location is: exact spot, rough area, neighborhood, or hidden.\nThey decide how they're credited: name, pseudonym, or anonymous.\nGuardrails filter harmful content before it posts.\nAnd they can edit or remove their story anytime.",
            )
        },
        Exchange {
            suggestion: Some("How do we see these stories?".into()),
            visual: visual("The Map", "Every story has a place", "EVERY PIN IS A VOICE"),
            ..exchange(
                5,
                "map",
                "The Map",
                "Map",
                "Show me the interactive map.",
                "Every story, every voice, every place. Pins cluster by neighborhood. Filter by theme, date, or walk. Toggle MARTA lines to see transit connections. Click any pin to hear a preview.",
            )
        },
        Exchange {
            suggestion: Some("Who builds this?".into()),
            visual: visual("The View", "Stories leave the screen", "PROJECTION MAPPING + GESTURE"),
            ..exchange(
                6,
                "night",
                "The View",
                "View",
                "How do we see these stories?",
                "Stories leave the app and find public screens and projections. Booths at events have displays with generated stories. Projection mapping turns facades into living narratives: text scrolling across a wall, voices echoing off concrete. Gesture recognition lets passersby interact with projected stories using their bodies and hands.",
            )
        },
        Exchange {
            suggestion: Some("What's the plan?".into()),
            visual: visual(
                "The Builder",
                "Creative Context",
                "DESIGN + TECHNOLOGY + PUBLIC STORYTELLING",
            ),
            ..exchange(
                7,
                "builder",
                "The Builder",
                "Builder",
                "Who builds this?",
                "James McKay, through Creative Context, a practice at the intersection of design, technology, and public storytelling. Based in Atlanta. Building tools that make communities visible, not just heard. This project is a 2026 PAFL application: Public Art Futures Lab.",
            )
        },
        Exchange {
            suggestion: Some("It's my turn.".into()),
            component: Some(RichComponent::PlanPhases),
            visual: visual("The Plan", "What's the plan?", "18 WEEKS, 6 PHASES"),
            ..exchange(8, "plan", "The Plan", "Plan", "What's the plan?", "Six phases.")
        },
        Exchange {
            visual: visual(
                "The Chat",
                "Your turn",
                "10 EXCHANGES | 5 VOICES | 25+ NEIGHBORHOODS",
            ),
            ..exchange(
                9,
                "voice",
                "The Chat",
                "Chat",
                "",
                "Now it's your turn. Ask me anything about storyATL, Atlanta, Creative Context. I'm listening.",
            )
        },
    ]
}
