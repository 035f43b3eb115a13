//! The narrative engine: event and quest generation, agent interaction,
//! and the tension state machine.
//!
//! The engine owns the [`NarrativeState`], the event history, and the quest
//! list. It reads and writes the shared [`MemoryStore`] and
//! [`TavernEconomy`] synchronously inside each operation; the only
//! suspension point is the text generator, which runs under an overall
//! deadline. Any generation failure (render error, gateway error, timeout,
//! malformed reply) is logged and replaced by the deterministic fallback, so
//! none of the generating operations can fail.
//!
//! Lock order is story state, then economy, then RNG; no lock is held
//! across an `.await`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::Serialize;

use tavern_economy::{ReputationFeedback, TavernEconomy};
use tavern_gateway::{GatewayError, GenerationRequest, TextGenerator};
use tavern_memory::{MemoryStore, NewMemory};
use tavern_types::{
    AgentId, AgentProfile, AgentRole, Atmosphere, Event, EventId, Importance, MemoryKind,
    NarrativeState, Quest, QuestId, QuestStatus, QuestType, ResourceKind, Tension,
    TransactionKind, Weather,
};

use crate::config::NarrativeConfig;
use crate::error::NarrativeError;
use crate::fallback::{self, EventText, QuestText};
use crate::parse::{parse_event, parse_quest};
use crate::prompts::{AgentView, DialoguePrompt, EventPrompt, PromptLibrary, QuestPrompt};
use crate::selection::{
    action_tension_delta, auto_event_chance, choose_event_type, choose_quest_type,
    quest_difficulty, roll, roll_tension_change,
};

/// Events whose absolute tension change exceeds this are remembered as
/// high importance.
const HIGH_IMPACT_TENSION: u32 = 15;

/// Trigger text used for automatic events without a player action.
const AMBIENT_TRIGGER: &str = "the evening wears on";

// ---------------------------------------------------------------------------
// Public result types
// ---------------------------------------------------------------------------

/// How an agent's response is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseChannel {
    /// Through the text generator, falling back to a template.
    Generated,
    /// Straight from the local template.
    Quick,
}

impl ResponseChannel {
    /// Channel used for agents with `role`.
    pub const fn for_role(role: AgentRole) -> Self {
        match role {
            AgentRole::QuestGiver | AgentRole::LoreKeeper => Self::Generated,
            AgentRole::Innkeeper
            | AgentRole::Merchant
            | AgentRole::Informant
            | AgentRole::Mercenary
            | AgentRole::Patron => Self::Quick,
        }
    }
}

/// One agent's answer to a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentResponse {
    /// Who answered.
    pub agent_id: AgentId,
    /// Their role.
    pub role: AgentRole,
    /// Channel chosen for the role.
    pub channel: ResponseChannel,
    /// The spoken line.
    pub text: String,
    /// Whether the text came from the generator rather than a template.
    pub generated: bool,
}

/// Tension effect of one player action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionEffect {
    /// The action as given.
    pub action: String,
    /// Shift applied to tension.
    pub tension_delta: i32,
}

/// An objective completed during an advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestProgress {
    /// The quest.
    pub quest_id: QuestId,
    /// Its title.
    pub title: String,
    /// The objective just completed.
    pub objective: String,
    /// Quest status afterward.
    pub status: QuestStatus,
}

/// One agent's reaction line for an advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentReaction {
    /// Who reacts.
    pub agent_id: AgentId,
    /// The line.
    pub line: String,
}

/// Everything one call to [`NarrativeEngine::advance_narrative`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NarrativeUpdate {
    /// Tension before the advance.
    pub tension_before: Tension,
    /// State after the advance.
    pub state: NarrativeState,
    /// Atmosphere after the advance.
    pub atmosphere: Atmosphere,
    /// Per-action tension shifts, in input order.
    pub action_effects: Vec<ActionEffect>,
    /// The automatic event, if one fired.
    pub triggered_event: Option<Event>,
    /// Objectives completed this advance.
    pub quest_progress: Vec<QuestProgress>,
    /// One reaction per roster agent.
    pub reactions: Vec<AgentReaction>,
    /// Active event ids dropped by pruning.
    pub pruned_events: usize,
}

/// Read-only projection for presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NarrativeSummary {
    /// Current state.
    pub state: NarrativeState,
    /// Atmosphere derived from tension.
    pub atmosphere: Atmosphere,
    /// Up to five most recent events, newest first.
    pub recent_events: Vec<Event>,
    /// Quests still available or active.
    pub open_quests: Vec<Quest>,
    /// Events ever processed.
    pub total_events: usize,
    /// Quests ever generated.
    pub total_quests: usize,
    /// Quests completed.
    pub completed_quests: usize,
    /// Quests failed.
    pub failed_quests: usize,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StoryState {
    narrative: NarrativeState,
    history: Vec<Event>,
    quests: Vec<Quest>,
}

/// Drives the story forward.
pub struct NarrativeEngine<G> {
    config: NarrativeConfig,
    tavern_name: String,
    roster: Vec<AgentProfile>,
    memory: Arc<MemoryStore>,
    economy: Arc<TavernEconomy>,
    gateway: G,
    prompts: PromptLibrary,
    rng: Mutex<SmallRng>,
    state: RwLock<StoryState>,
}

impl<G: TextGenerator> NarrativeEngine<G> {
    /// Create an engine over the shared stores.
    ///
    /// Fails only if a prompt override in `config.templates_dir` cannot be
    /// read or compiled.
    pub fn new(
        config: NarrativeConfig,
        roster: Vec<AgentProfile>,
        memory: Arc<MemoryStore>,
        economy: Arc<TavernEconomy>,
        gateway: G,
    ) -> Result<Self, NarrativeError> {
        let prompts = PromptLibrary::new(config.templates_dir.as_deref())?;
        Ok(Self {
            config,
            tavern_name: "the tavern".to_owned(),
            roster,
            memory,
            economy,
            gateway,
            prompts,
            rng: Mutex::new(SmallRng::from_rng(&mut rand::rng())),
            state: RwLock::new(StoryState::default()),
        })
    }

    /// Make every random choice reproducible from `seed`.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(SmallRng::seed_from_u64(seed));
        self
    }

    /// Name used in prompts and fallback prose.
    #[must_use]
    pub fn with_tavern_name(mut self, name: impl Into<String>) -> Self {
        self.tavern_name = name.into();
        self
    }

    /// The static roster.
    pub fn roster(&self) -> &[AgentProfile] {
        &self.roster
    }

    /// The wrapped text generator.
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Pick, write, and process a new event.
    ///
    /// The type is drawn from tension-banded weights and 1-3 roster agents
    /// take part. Text comes from the generator or, on any failure, from the
    /// type's fixed template.
    pub async fn generate_dynamic_event(&self, trigger: Option<&str>) -> Event {
        let (event_type, tension_change, participants, prompt) = {
            let state = self.read_state();
            let narrative = &state.narrative;
            let (event_type, tension_change, participants) = self.with_rng(|rng| {
                let event_type =
                    choose_event_type(rng, narrative.tension, narrative.active_event_ids.len());
                let change = roll_tension_change(rng, event_type);
                (event_type, change, self.sample_agents(rng, 1, 3))
            });
            let prompt = EventPrompt {
                tavern: self.tavern_name.clone(),
                event_type: event_type.as_str(),
                atmosphere: narrative.atmosphere().as_str(),
                tension: narrative.tension.level(),
                time_of_day: narrative.time_of_day.as_str(),
                weather: narrative.weather.as_str(),
                trigger: trigger.map(ToOwned::to_owned),
                participants: self.views(&participants),
                recent_events: state
                    .history
                    .iter()
                    .rev()
                    .take(3)
                    .map(|e| e.title.clone())
                    .collect(),
            };
            (event_type, tension_change, participants, prompt)
        };

        let generated = match self.prompts.event_request(&prompt, self.config.long_form) {
            Ok(request) => self.generate(&request).await.and_then(|raw| parse_event(&raw)),
            Err(err) => Err(err),
        };
        let EventText {
            title,
            description,
            consequences,
        } = generated.unwrap_or_else(|err| {
            tracing::warn!(
                event_type = event_type.as_str(),
                backend = self.gateway.name(),
                error = %err,
                "Event generation failed, using fallback template"
            );
            fallback::event_text(event_type, &self.tavern_name)
        });

        let event = Event {
            id: EventId::new(),
            event_type,
            title,
            description,
            participants,
            tension_change,
            consequences,
            created_at: Utc::now(),
        };
        if let Err(err) = self.process_event(&event) {
            tracing::warn!(event_id = %event.id, error = %err, "Event processing incomplete");
        }
        event
    }

    /// Apply an event to the story, the economy, and participant memory.
    ///
    /// Appends to history, shifts tension, marks the event active, pushes
    /// reputation feedback into the economy, and stores an EVENT memory for
    /// every participant (HIGH when the tension change exceeds 15 either
    /// way, MEDIUM otherwise). An event already in the history, or one the
    /// economy has already applied, is refused without touching anything.
    pub fn process_event(&self, event: &Event) -> Result<ReputationFeedback, NarrativeError> {
        let feedback = {
            let mut state = self.write_state();
            if state.history.iter().any(|e| e.id == event.id) {
                return Err(NarrativeError::EventAlreadyProcessed(event.id));
            }
            // The economy may still refuse the event; nothing here changes
            // until it has accepted.
            let feedback = self.economy.update_reputation_on_event(event)?;
            state.history.push(event.clone());
            let before = state.narrative.tension;
            state.narrative.tension = before.apply(event.tension_change);
            state.narrative.active_event_ids.push(event.id);
            tracing::info!(
                event_id = %event.id,
                event_type = event.event_type.as_str(),
                title = %event.title,
                tension_before = before.level(),
                tension = state.narrative.tension.level(),
                atmosphere = state.narrative.atmosphere().as_str(),
                "Event processed"
            );
            feedback
        };

        let importance = if event.tension_change.unsigned_abs() > HIGH_IMPACT_TENSION {
            Importance::High
        } else {
            Importance::Medium
        };
        let mut remembered: Vec<&AgentId> = Vec::with_capacity(event.participants.len());
        for participant in &event.participants {
            if remembered.contains(&participant) {
                continue;
            }
            remembered.push(participant);
            let others = event
                .participants
                .iter()
                .filter(|other| *other != participant)
                .cloned();
            self.memory.store_memory(
                participant,
                NewMemory::new(
                    MemoryKind::Event,
                    format!("{}: {}", event.title, event.description),
                )
                .importance(importance)
                .with_context("event_type", event.event_type.as_str())
                .with_context("tension_change", i64::from(event.tension_change))
                .related(others)
                .tag(event.event_type.as_str()),
            );
        }
        Ok(feedback)
    }

    // -----------------------------------------------------------------------
    // Quests
    // -----------------------------------------------------------------------

    /// Create a new available quest.
    ///
    /// Difficulty defaults to `3 + tension/20 + open_quests/2` and is always
    /// clamped to `[1, 10]`; the type defaults to a tension-banded draw.
    pub async fn generate_quest(
        &self,
        quest_type: Option<QuestType>,
        difficulty: Option<u8>,
    ) -> Quest {
        let (quest_type, difficulty, required_agents, prompt) = {
            let state = self.read_state();
            let narrative = &state.narrative;
            let difficulty = difficulty.map_or_else(
                || quest_difficulty(narrative.tension, narrative.active_quest_ids.len()),
                |d| d.clamp(1, 10),
            );
            let (quest_type, required_agents) = self.with_rng(|rng| {
                let quest_type =
                    quest_type.unwrap_or_else(|| choose_quest_type(rng, narrative.tension));
                (quest_type, self.sample_agents(rng, 1, 2))
            });
            let prompt = QuestPrompt {
                tavern: self.tavern_name.clone(),
                quest_type: quest_type.as_str(),
                difficulty,
                atmosphere: narrative.atmosphere().as_str(),
                tension: narrative.tension.level(),
                reward_gold: self.reward_gold(difficulty).to_string(),
                givers: self.views(&required_agents),
            };
            (quest_type, difficulty, required_agents, prompt)
        };

        let generated = match self.prompts.quest_request(&prompt, self.config.long_form) {
            Ok(request) => self.generate(&request).await.and_then(|raw| parse_quest(&raw)),
            Err(err) => Err(err),
        };
        let QuestText {
            title,
            description,
            objectives,
            mut rewards,
        } = generated.unwrap_or_else(|err| {
            tracing::warn!(
                quest_type = quest_type.as_str(),
                backend = self.gateway.name(),
                error = %err,
                "Quest generation failed, using fallback template"
            );
            fallback::quest_text(quest_type, difficulty, &prompt.reward_gold)
        });
        if rewards.is_empty() {
            rewards.push(format!("{} gold", prompt.reward_gold));
        }

        let mut unique_objectives: Vec<String> = Vec::with_capacity(objectives.len());
        for objective in objectives {
            if !unique_objectives.contains(&objective) {
                unique_objectives.push(objective);
            }
        }
        let progress = unique_objectives
            .iter()
            .map(|objective| (objective.clone(), false))
            .collect();

        let quest = Quest {
            id: QuestId::new(),
            quest_type,
            title,
            description,
            objectives: unique_objectives,
            rewards,
            difficulty,
            required_agents,
            status: QuestStatus::Available,
            progress,
            created_at: Utc::now(),
        };

        {
            let mut state = self.write_state();
            state.narrative.active_quest_ids.push(quest.id);
            state.quests.push(quest.clone());
        }
        for agent in &quest.required_agents {
            self.memory.store_memory(
                agent,
                NewMemory::new(
                    MemoryKind::Observation,
                    format!("New quest posted: {}", quest.title),
                )
                .importance(Importance::Medium)
                .with_context("quest_type", quest.quest_type.as_str())
                .with_context("difficulty", i64::from(quest.difficulty))
                .tag("quest"),
            );
        }
        tracing::info!(
            quest_id = %quest.id,
            quest_type = quest.quest_type.as_str(),
            difficulty = quest.difficulty,
            objectives = quest.objectives.len(),
            "Quest generated"
        );
        quest
    }

    /// Mark objective `index` of an open quest as done.
    ///
    /// The first completed objective moves the quest to `active`; the last
    /// one completes it, removes it from the active list, pays the reward
    /// to every required agent, and stores a HIGH memory for each.
    pub fn complete_objective(
        &self,
        quest_id: QuestId,
        index: usize,
    ) -> Result<Quest, NarrativeError> {
        let quest = {
            let mut state = self.write_state();
            let quest = state
                .quests
                .iter_mut()
                .find(|q| q.id == quest_id)
                .ok_or(NarrativeError::UnknownQuest(quest_id))?;
            if !quest.status.is_open() {
                return Err(NarrativeError::QuestClosed {
                    id: quest_id,
                    status: quest.status,
                });
            }
            let objective =
                quest
                    .objectives
                    .get(index)
                    .cloned()
                    .ok_or(NarrativeError::ObjectiveOutOfRange {
                        id: quest_id,
                        index,
                        len: quest.objectives.len(),
                    })?;
            quest.progress.insert(objective, true);
            quest.status = if quest.completed_objectives() >= quest.objectives.len() {
                QuestStatus::Completed
            } else {
                QuestStatus::Active
            };
            let updated = quest.clone();
            if updated.status == QuestStatus::Completed {
                state.narrative.active_quest_ids.retain(|id| *id != quest_id);
            }
            updated
        };

        tracing::debug!(
            quest_id = %quest.id,
            done = quest.completed_objectives(),
            total = quest.objectives.len(),
            "Objective completed"
        );
        if quest.status == QuestStatus::Completed {
            self.reward_quest(&quest);
        }
        Ok(quest)
    }

    /// Move an open quest to `failed`.
    pub fn fail_quest(&self, quest_id: QuestId) -> Result<Quest, NarrativeError> {
        let quest = {
            let mut state = self.write_state();
            let quest = state
                .quests
                .iter_mut()
                .find(|q| q.id == quest_id)
                .ok_or(NarrativeError::UnknownQuest(quest_id))?;
            if !quest.status.is_open() {
                return Err(NarrativeError::QuestClosed {
                    id: quest_id,
                    status: quest.status,
                });
            }
            quest.status = QuestStatus::Failed;
            let updated = quest.clone();
            state.narrative.active_quest_ids.retain(|id| *id != quest_id);
            updated
        };

        for agent in &quest.required_agents {
            self.memory.store_memory(
                agent,
                NewMemory::new(MemoryKind::Event, format!("Quest failed: {}", quest.title))
                    .importance(Importance::Medium)
                    .tag("quest"),
            );
        }
        tracing::info!(quest_id = %quest.id, title = %quest.title, "Quest failed");
        Ok(quest)
    }

    fn reward_quest(&self, quest: &Quest) {
        let gold = self.reward_gold(quest.difficulty);
        let reward = BTreeMap::from([(ResourceKind::Gold, gold)]);
        for agent in &quest.required_agents {
            let transaction = self.economy.execute_transaction(
                TransactionKind::QuestReward,
                &[AgentId::market(), agent.clone()],
                &reward,
                &format!("Reward for completing '{}'", quest.title),
            );
            if !transaction.success {
                tracing::warn!(
                    quest_id = %quest.id,
                    agent = %agent,
                    consequences = ?transaction.consequences,
                    "Quest reward rejected"
                );
            }
            let others = quest
                .required_agents
                .iter()
                .filter(|other| *other != agent)
                .cloned();
            self.memory.store_memory(
                agent,
                NewMemory::new(MemoryKind::Event, format!("Completed quest: {}", quest.title))
                    .importance(Importance::High)
                    .with_context("reward_gold", gold)
                    .related(others)
                    .tag("quest"),
            );
        }
        tracing::info!(
            quest_id = %quest.id,
            title = %quest.title,
            reward_gold = %gold,
            agents = quest.required_agents.len(),
            "Quest completed"
        );
    }

    // -----------------------------------------------------------------------
    // Agent interaction
    // -----------------------------------------------------------------------

    /// Collect one response per known agent to `scenario`.
    ///
    /// Quest-givers and lore-keepers answer through the generator; everyone
    /// else answers from the local template. Agents not on the roster are
    /// skipped. Each response is stored as an INTERACTION memory that
    /// references the other agents.
    pub async fn orchestrate_agent_interaction(
        &self,
        agents: &[AgentId],
        scenario: &str,
    ) -> Vec<AgentResponse> {
        let atmosphere = self.read_state().narrative.atmosphere();
        let mut responses = Vec::with_capacity(agents.len());

        for agent in agents {
            let Some(profile) = self.profile(agent) else {
                tracing::warn!(agent = %agent, "Skipping interaction for unknown agent");
                continue;
            };
            let channel = ResponseChannel::for_role(profile.role);
            let (text, generated) = match channel {
                ResponseChannel::Generated => {
                    match self.generated_line(profile, scenario, atmosphere).await {
                        Ok(line) => (line, true),
                        Err(err) => {
                            tracing::warn!(
                                agent = %agent,
                                backend = self.gateway.name(),
                                error = %err,
                                "Dialogue generation failed, using fallback line"
                            );
                            (fallback::dialogue_line(profile, scenario), false)
                        }
                    }
                }
                ResponseChannel::Quick => (fallback::dialogue_line(profile, scenario), false),
            };

            let others = agents.iter().filter(|other| *other != agent).cloned();
            self.memory.store_memory(
                agent,
                NewMemory::new(
                    MemoryKind::Interaction,
                    format!("Responded to \"{scenario}\": {text}"),
                )
                .importance(Importance::Medium)
                .with_context("scenario", scenario)
                .with_context("generated", generated)
                .related(others)
                .tag("dialogue"),
            );
            responses.push(AgentResponse {
                agent_id: agent.clone(),
                role: profile.role,
                channel,
                text,
                generated,
            });
        }
        responses
    }

    async fn generated_line(
        &self,
        profile: &AgentProfile,
        scenario: &str,
        atmosphere: Atmosphere,
    ) -> Result<String, NarrativeError> {
        let context = self.memory.get_agent_context(&profile.id, 3);
        let prompt = DialoguePrompt {
            tavern: self.tavern_name.clone(),
            agent: AgentView::from(profile),
            atmosphere: atmosphere.as_str(),
            scenario: scenario.to_owned(),
            memories: context
                .recent_memories
                .iter()
                .map(|m| m.content.clone())
                .collect(),
        };
        let request = self.prompts.dialogue_request(&prompt, self.config.short_form)?;
        let line = self.generate(&request).await?;
        let line = line.trim();
        if line.is_empty() {
            return Err(NarrativeError::Malformed("empty dialogue line".to_owned()));
        }
        Ok(line.to_owned())
    }

    // -----------------------------------------------------------------------
    // Advancing
    // -----------------------------------------------------------------------

    /// Move the story one step.
    ///
    /// In order: apply player-action tension shifts, maybe fire an automatic
    /// event, progress open quests, collect a reaction line per roster
    /// agent, rotate the time of day, maybe change the weather, and prune
    /// the active event list.
    pub async fn advance_narrative(&self, player_actions: &[String]) -> NarrativeUpdate {
        let (tension_before, action_effects) = {
            let mut state = self.write_state();
            let before = state.narrative.tension;
            let effects: Vec<ActionEffect> = player_actions
                .iter()
                .map(|action| {
                    let delta = action_tension_delta(action);
                    state.narrative.tension = state.narrative.tension.apply(delta);
                    ActionEffect {
                        action: action.clone(),
                        tension_delta: delta,
                    }
                })
                .collect();
            (before, effects)
        };

        let (tension, active_events) = {
            let state = self.read_state();
            (
                state.narrative.tension,
                state.narrative.active_event_ids.len(),
            )
        };
        let reputation = self.economy.tavern_state().reputation_score;
        let chance = auto_event_chance(
            self.config.auto_event_base_chance,
            tension,
            active_events,
            reputation,
        );
        let triggered_event = if self.with_rng(|rng| roll(rng, chance)) {
            let trigger = player_actions.last().map_or(AMBIENT_TRIGGER, String::as_str);
            Some(self.generate_dynamic_event(Some(trigger)).await)
        } else {
            None
        };

        let quest_progress = self.progress_quests();

        let atmosphere = self.read_state().narrative.atmosphere();
        let reactions = self
            .roster
            .iter()
            .map(|profile| {
                let context = self.memory.get_agent_context(&profile.id, 1);
                AgentReaction {
                    agent_id: profile.id.clone(),
                    line: fallback::reaction_line(
                        profile,
                        context.recent_memories.first(),
                        atmosphere,
                    ),
                }
            })
            .collect();

        let (state, pruned_events) = {
            let mut state = self.write_state();
            let narrative = &mut state.narrative;
            narrative.time_of_day = narrative.time_of_day.next();
            let current = narrative.weather;
            let change_chance = self.config.weather_change_chance;
            if let Some(weather) = self.with_rng(|rng| {
                if !roll(rng, change_chance) {
                    return None;
                }
                let others: Vec<Weather> =
                    Weather::ALL.into_iter().filter(|w| *w != current).collect();
                others.choose(rng).copied()
            }) {
                tracing::debug!(from = current.as_str(), to = weather.as_str(), "Weather changed");
                narrative.weather = weather;
            }
            let excess = narrative
                .active_event_ids
                .len()
                .saturating_sub(self.config.max_active_events);
            narrative.active_event_ids.drain(..excess);
            (narrative.clone(), excess)
        };

        tracing::info!(
            tension_before = tension_before.level(),
            tension = state.tension.level(),
            atmosphere = state.atmosphere().as_str(),
            time_of_day = state.time_of_day.as_str(),
            weather = state.weather.as_str(),
            event_fired = triggered_event.is_some(),
            objectives_completed = quest_progress.len(),
            "Narrative advanced"
        );

        NarrativeUpdate {
            tension_before,
            atmosphere: state.atmosphere(),
            state,
            action_effects,
            triggered_event,
            quest_progress,
            reactions,
            pruned_events,
        }
    }

    /// Roll each open quest's next objective.
    fn progress_quests(&self) -> Vec<QuestProgress> {
        let candidates: Vec<(QuestId, usize)> = {
            let state = self.read_state();
            state
                .quests
                .iter()
                .filter(|q| q.status.is_open())
                .filter_map(|q| {
                    q.objectives
                        .iter()
                        .position(|o| !q.progress.get(o).copied().unwrap_or(false))
                        .map(|index| (q.id, index))
                })
                .collect()
        };

        let chance = self.config.objective_completion_chance;
        let mut progress = Vec::new();
        for (quest_id, index) in candidates {
            if !self.with_rng(|rng| roll(rng, chance)) {
                continue;
            }
            match self.complete_objective(quest_id, index) {
                Ok(quest) => progress.push(QuestProgress {
                    quest_id,
                    objective: quest.objectives.get(index).cloned().unwrap_or_default(),
                    title: quest.title,
                    status: quest.status,
                }),
                Err(err) => {
                    tracing::warn!(quest_id = %quest_id, error = %err, "Objective update skipped");
                }
            }
        }
        progress
    }

    // -----------------------------------------------------------------------
    // Projections
    // -----------------------------------------------------------------------

    /// Current state.
    pub fn state(&self) -> NarrativeState {
        self.read_state().narrative.clone()
    }

    /// Every processed event, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.read_state().history.clone()
    }

    /// Every quest, oldest first.
    pub fn quests(&self) -> Vec<Quest> {
        self.read_state().quests.clone()
    }

    /// One quest by id.
    pub fn quest(&self, quest_id: QuestId) -> Option<Quest> {
        self.read_state()
            .quests
            .iter()
            .find(|q| q.id == quest_id)
            .cloned()
    }

    /// Consistent summary of the story. Mutates nothing.
    pub fn narrative_summary(&self) -> NarrativeSummary {
        let state = self.read_state();
        let count =
            |status: QuestStatus| state.quests.iter().filter(|q| q.status == status).count();
        NarrativeSummary {
            state: state.narrative.clone(),
            atmosphere: state.narrative.atmosphere(),
            recent_events: state.history.iter().rev().take(5).cloned().collect(),
            open_quests: state
                .quests
                .iter()
                .filter(|q| q.status.is_open())
                .cloned()
                .collect(),
            total_events: state.history.len(),
            total_quests: state.quests.len(),
            completed_quests: count(QuestStatus::Completed),
            failed_quests: count(QuestStatus::Failed),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn generate(&self, request: &GenerationRequest) -> Result<String, NarrativeError> {
        let deadline = self.config.generation_timeout();
        match tokio::time::timeout(deadline, self.gateway.generate(request)).await {
            Ok(result) => result.map_err(NarrativeError::from),
            Err(_elapsed) => Err(NarrativeError::Gateway(GatewayError::Timeout(
                self.config.generation_timeout_ms,
            ))),
        }
    }

    fn reward_gold(&self, difficulty: u8) -> Decimal {
        self.config.reward_gold_per_difficulty * Decimal::from(difficulty)
    }

    fn profile(&self, agent: &AgentId) -> Option<&AgentProfile> {
        self.roster.iter().find(|p| p.id == *agent)
    }

    fn views(&self, agents: &[AgentId]) -> Vec<AgentView> {
        agents
            .iter()
            .filter_map(|agent| self.profile(agent))
            .map(AgentView::from)
            .collect()
    }

    /// Between `min` and `max` distinct roster agents, fewer if the roster
    /// is smaller.
    fn sample_agents(&self, rng: &mut SmallRng, min: usize, max: usize) -> Vec<AgentId> {
        if self.roster.is_empty() {
            return Vec::new();
        }
        let count = rng.random_range(min..=max).min(self.roster.len());
        self.roster
            .choose_multiple(rng, count)
            .map(|profile| profile.id.clone())
            .collect()
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut SmallRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
