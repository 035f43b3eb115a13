//! Narrative engine for the tavern simulation.
//!
//! The engine keeps the story's tension, time of day, and weather, and
//! produces events, quests, and agent dialogue. Prose comes from a
//! [`TextGenerator`](tavern_gateway::TextGenerator) when one is available
//! and from deterministic templates otherwise, so every operation succeeds
//! with the generator switched off.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration for the whole simulation
//! - [`engine`] -- [`NarrativeEngine`] and its result types
//! - [`error`] -- narrative error type
//! - [`fallback`] -- fixed event and quest templates, dialogue and reaction lines
//! - [`parse`] -- lenient JSON extraction from generated text
//! - [`prompts`] -- `minijinja` prompt templates with file overrides
//! - [`selection`] -- tension-banded weights and probability rules

pub mod config;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod parse;
pub mod prompts;
pub mod selection;

pub use config::{
    ConfigError, LoggingConfig, NarrativeConfig, SamplingConfig, SimulationConfig, TavernConfig,
    TavernSection,
};
pub use engine::{
    ActionEffect, AgentReaction, AgentResponse, NarrativeEngine, NarrativeSummary,
    NarrativeUpdate, QuestProgress, ResponseChannel,
};
pub use error::NarrativeError;
pub use prompts::PromptLibrary;
pub use selection::StoryBand;
