//! Configuration loading and typed config structures for the tavern
//! simulation.
//!
//! The canonical configuration lives in `tavern-config.yaml` at the project
//! root. Every section and field has a default, so a missing file or an
//! empty section still yields a runnable tavern. LLM credentials are not
//! part of this file; see [`tavern_gateway::GatewayConfig::from_env`].

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Deserialize;

use tavern_economy::EconomyConfig;
use tavern_gateway::LlmConfig;
use tavern_memory::{MemoryConfig, PersistenceConfig};
use tavern_types::{AgentId, AgentProfile, AgentRole};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `tavern-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TavernConfig {
    /// Tavern identity and randomness seed.
    #[serde(default)]
    pub tavern: TavernSection,

    /// The static roster of agents.
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentProfile>,

    /// Memory store tuning.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Economy parameters.
    #[serde(default)]
    pub economy: EconomyConfig,

    /// Narrative engine parameters.
    #[serde(default)]
    pub narrative: NarrativeConfig,

    /// Text generation timeouts and retries.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Snapshot location and cadence.
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Driving loop parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Default for TavernConfig {
    fn default() -> Self {
        Self {
            tavern: TavernSection::default(),
            agents: default_agents(),
            memory: MemoryConfig::default(),
            economy: EconomyConfig::default(),
            narrative: NarrativeConfig::default(),
            llm: LlmConfig::default(),
            persistence: PersistenceConfig::default(),
            logging: LoggingConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl TavernConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }
}

/// Tavern identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TavernSection {
    /// Name used in prompts and fallback prose.
    #[serde(default = "default_tavern_name")]
    pub name: String,

    /// Seed for every random choice. Unset means seeded from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for TavernSection {
    fn default() -> Self {
        Self {
            name: default_tavern_name(),
            seed: None,
        }
    }
}

/// Token budget and temperature for one kind of generation.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SamplingConfig {
    /// Upper bound on response length.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Narrative engine parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NarrativeConfig {
    /// Chance of an automatic event per advance before adjustments.
    #[serde(default = "default_auto_event_base_chance")]
    pub auto_event_base_chance: f64,

    /// Active event ids kept after each advance.
    #[serde(default = "default_max_active_events")]
    pub max_active_events: usize,

    /// Chance per advance that an open quest completes its next objective.
    #[serde(default = "default_objective_completion_chance")]
    pub objective_completion_chance: f64,

    /// Gold paid to each required agent per point of quest difficulty.
    #[serde(default = "default_reward_gold_per_difficulty")]
    pub reward_gold_per_difficulty: Decimal,

    /// Chance per advance that the weather changes.
    #[serde(default = "default_weather_change_chance")]
    pub weather_change_chance: f64,

    /// Overall deadline for one generation, retries included, in milliseconds.
    #[serde(default = "default_generation_timeout_ms")]
    pub generation_timeout_ms: u64,

    /// Sampling for events and quests.
    #[serde(default = "default_long_form")]
    pub long_form: SamplingConfig,

    /// Sampling for generated dialogue lines.
    #[serde(default = "default_short_form")]
    pub short_form: SamplingConfig,

    /// Directory with `<name>.j2` files overriding built-in prompts.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

impl NarrativeConfig {
    /// Overall generation deadline.
    pub const fn generation_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.generation_timeout_ms)
    }
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            auto_event_base_chance: default_auto_event_base_chance(),
            max_active_events: default_max_active_events(),
            objective_completion_chance: default_objective_completion_chance(),
            reward_gold_per_difficulty: default_reward_gold_per_difficulty(),
            weather_change_chance: default_weather_change_chance(),
            generation_timeout_ms: default_generation_timeout_ms(),
            long_form: default_long_form(),
            short_form: default_short_form(),
            templates_dir: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Driving loop parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Advances to run before shutting down.
    #[serde(default = "default_ticks")]
    pub ticks: u64,

    /// Pause between advances, in milliseconds.
    #[serde(default)]
    pub tick_interval_ms: u64,

    /// Scripted player actions, applied one per tick in order, cycling.
    #[serde(default)]
    pub player_actions: Vec<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks: default_ticks(),
            tick_interval_ms: 0,
            player_actions: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_tavern_name() -> String {
    "The Rusty Tankard".to_owned()
}

fn default_agents() -> Vec<AgentProfile> {
    let agent = |id: &str, name: &str, faction: &str, role: AgentRole, description: &str| {
        AgentProfile {
            id: AgentId::new(id),
            name: name.to_owned(),
            faction: faction.to_owned(),
            role,
            description: description.to_owned(),
        }
    };
    vec![
        agent(
            "innkeeper",
            "Greta Barrowind",
            "tavern",
            AgentRole::Innkeeper,
            "Runs the tavern and hears everything said over the bar.",
        ),
        agent(
            "merchant",
            "Tobin Saltweather",
            "merchants_guild",
            AgentRole::Merchant,
            "A travelling trader with more ledgers than friends.",
        ),
        agent(
            "quest_giver",
            "Captain Ilse Varro",
            "city_watch",
            AgentRole::QuestGiver,
            "Posts bounties for the watch and pays on delivery.",
        ),
        agent(
            "lore_keeper",
            "Old Maren",
            "scholars",
            AgentRole::LoreKeeper,
            "Remembers the tavern's history, including what others would rather forget.",
        ),
        agent(
            "informant",
            "Whisper",
            "shadows",
            AgentRole::Informant,
            "Sells secrets by the cup.",
        ),
        agent(
            "mercenary",
            "Brakka Ironjaw",
            "free_blades",
            AgentRole::Mercenary,
            "Sword for hire between contracts.",
        ),
    ]
}

const fn default_auto_event_base_chance() -> f64 {
    0.20
}

const fn default_max_active_events() -> usize {
    10
}

const fn default_objective_completion_chance() -> f64 {
    0.35
}

fn default_reward_gold_per_difficulty() -> Decimal {
    Decimal::TEN
}

const fn default_weather_change_chance() -> f64 {
    0.10
}

const fn default_generation_timeout_ms() -> u64 {
    10_000
}

const fn default_long_form() -> SamplingConfig {
    SamplingConfig {
        max_tokens: 512,
        temperature: 0.8,
    }
}

const fn default_short_form() -> SamplingConfig {
    SamplingConfig {
        max_tokens: 96,
        temperature: 0.9,
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_ticks() -> u64 {
    50
}
