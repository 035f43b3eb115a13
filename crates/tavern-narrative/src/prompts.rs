//! Prompt rendering via `minijinja`.
//!
//! Built-in templates cover every generation request. Operators can tune
//! them without recompiling by pointing `narrative.templates_dir` at a
//! directory holding any of `narrator_system.j2`, `event.j2`, `quest.j2`,
//! `character_system.j2` or `dialogue.j2`; missing files keep the built-in
//! version.

use std::path::Path;

use minijinja::Environment;
use serde::Serialize;

use tavern_gateway::GenerationRequest;
use tavern_types::AgentProfile;

use crate::config::SamplingConfig;
use crate::error::NarrativeError;

const NARRATOR_SYSTEM: &str = "\
You are the narrator of {{ tavern }}, a tavern where travelers, traders and schemers cross paths. \
Write grounded, concise fantasy prose. Reply with a single JSON object and nothing else.";

const EVENT: &str = "\
Describe a new {{ event_type }} event at {{ tavern }}.
It is {{ time_of_day }} and the weather is {{ weather }}. The mood is {{ atmosphere }} (tension {{ tension }}/100).
{% if trigger %}It was triggered by: {{ trigger }}
{% endif %}{% if participants %}Involved:
{% for p in participants %}- {{ p.name }}, {{ p.role }} of the {{ p.faction }}
{% endfor %}{% endif %}{% if recent_events %}Recent events:
{% for e in recent_events %}- {{ e }}
{% endfor %}{% endif %}
Respond with JSON: {\"title\": \"...\", \"description\": \"...\", \"consequences\": [\"...\"]}";

const QUEST: &str = "\
Offer a {{ quest_type }} quest of difficulty {{ difficulty }}/10 at {{ tavern }}.
The mood is {{ atmosphere }} (tension {{ tension }}/100). The reward is {{ reward_gold }} gold.
{% if givers %}Offered to:
{% for p in givers %}- {{ p.name }}, {{ p.role }} of the {{ p.faction }}
{% endfor %}{% endif %}
Respond with JSON: {\"title\": \"...\", \"description\": \"...\", \"objectives\": [\"...\"], \"rewards\": [\"...\"]}";

const CHARACTER_SYSTEM: &str = "\
You are {{ agent.name }}, {{ agent.role }} of the {{ agent.faction }}, at {{ tavern }}. \
{{ agent.description }} Stay in character and answer in one or two spoken sentences.";

const DIALOGUE: &str = "\
The mood in the tavern is {{ atmosphere }}.
{% if memories %}You remember:
{% for m in memories %}- {{ m }}
{% endfor %}{% endif %}
Scenario: {{ scenario }}
How do you respond?";

const TEMPLATES: [(&str, &str); 5] = [
    ("narrator_system", NARRATOR_SYSTEM),
    ("event", EVENT),
    ("quest", QUEST),
    ("character_system", CHARACTER_SYSTEM),
    ("dialogue", DIALOGUE),
];

/// An agent as shown to the model.
#[derive(Debug, Clone, Serialize)]
pub struct AgentView {
    /// Display name.
    pub name: String,
    /// Role name.
    pub role: &'static str,
    /// Faction tag.
    pub faction: String,
    /// Static description.
    pub description: String,
}

impl From<&AgentProfile> for AgentView {
    fn from(profile: &AgentProfile) -> Self {
        Self {
            name: profile.name.clone(),
            role: profile.role.as_str(),
            faction: profile.faction.clone(),
            description: profile.description.clone(),
        }
    }
}

/// Context for an event request.
#[derive(Debug, Clone, Serialize)]
pub struct EventPrompt {
    /// Tavern name.
    pub tavern: String,
    /// Chosen event type.
    pub event_type: &'static str,
    /// Current atmosphere.
    pub atmosphere: &'static str,
    /// Current tension.
    pub tension: u8,
    /// Current time of day.
    pub time_of_day: &'static str,
    /// Current weather.
    pub weather: &'static str,
    /// What prompted the event, if anything.
    pub trigger: Option<String>,
    /// Agents involved.
    pub participants: Vec<AgentView>,
    /// Titles of the latest events.
    pub recent_events: Vec<String>,
}

/// Context for a quest request.
#[derive(Debug, Clone, Serialize)]
pub struct QuestPrompt {
    /// Tavern name.
    pub tavern: String,
    /// Chosen quest type.
    pub quest_type: &'static str,
    /// Difficulty in `[1, 10]`.
    pub difficulty: u8,
    /// Current atmosphere.
    pub atmosphere: &'static str,
    /// Current tension.
    pub tension: u8,
    /// Gold paid per required agent.
    pub reward_gold: String,
    /// Agents the quest is offered to.
    pub givers: Vec<AgentView>,
}

/// Context for one character's line of dialogue.
#[derive(Debug, Clone, Serialize)]
pub struct DialoguePrompt {
    /// Tavern name.
    pub tavern: String,
    /// The speaker.
    pub agent: AgentView,
    /// Current atmosphere.
    pub atmosphere: &'static str,
    /// What the speaker reacts to.
    pub scenario: String,
    /// The speaker's most recent memories.
    pub memories: Vec<String>,
}

/// Loaded prompt templates.
pub struct PromptLibrary {
    env: Environment<'static>,
}

impl std::fmt::Debug for PromptLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptLibrary").finish_non_exhaustive()
    }
}

impl PromptLibrary {
    /// Built-in templates only.
    pub fn builtin() -> Result<Self, NarrativeError> {
        Self::new(None)
    }

    /// Built-in templates, overridden by `<dir>/<name>.j2` where present.
    pub fn new(templates_dir: Option<&Path>) -> Result<Self, NarrativeError> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            let override_path = templates_dir.map(|dir| dir.join(format!("{name}.j2")));
            match override_path.filter(|path| path.is_file()) {
                Some(path) => {
                    let text = std::fs::read_to_string(&path).map_err(|e| {
                        NarrativeError::Template(format!("failed to read {}: {e}", path.display()))
                    })?;
                    tracing::info!(template = name, path = %path.display(), "Loaded prompt override");
                    env.add_template_owned(name, text).map_err(|e| {
                        NarrativeError::Template(format!("failed to add {name} template: {e}"))
                    })?;
                }
                None => env.add_template(name, source).map_err(|e| {
                    NarrativeError::Template(format!("failed to add {name} template: {e}"))
                })?,
            }
        }
        Ok(Self { env })
    }

    /// Request for a new event.
    pub fn event_request(
        &self,
        prompt: &EventPrompt,
        sampling: SamplingConfig,
    ) -> Result<GenerationRequest, NarrativeError> {
        Ok(GenerationRequest::new(
            self.render("narrator_system", prompt)?,
            self.render("event", prompt)?,
            sampling.max_tokens,
            sampling.temperature,
        ))
    }

    /// Request for a new quest.
    pub fn quest_request(
        &self,
        prompt: &QuestPrompt,
        sampling: SamplingConfig,
    ) -> Result<GenerationRequest, NarrativeError> {
        Ok(GenerationRequest::new(
            self.render("narrator_system", prompt)?,
            self.render("quest", prompt)?,
            sampling.max_tokens,
            sampling.temperature,
        ))
    }

    /// Request for one character's spoken line.
    pub fn dialogue_request(
        &self,
        prompt: &DialoguePrompt,
        sampling: SamplingConfig,
    ) -> Result<GenerationRequest, NarrativeError> {
        Ok(GenerationRequest::new(
            self.render("character_system", prompt)?,
            self.render("dialogue", prompt)?,
            sampling.max_tokens,
            sampling.temperature,
        ))
    }

    fn render(&self, name: &str, context: &impl Serialize) -> Result<String, NarrativeError> {
        self.env
            .get_template(name)
            .map_err(|e| NarrativeError::Template(format!("missing {name} template: {e}")))?
            .render(context)
            .map_err(|e| NarrativeError::Template(format!("{name} render failed: {e}")))
    }
}
