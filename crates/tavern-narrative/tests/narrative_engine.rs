//! Integration tests for the narrative engine: fallback content with the
//! generator off, parsed generator output, the quest lifecycle and its
//! rewards, interaction routing, and bounded tension under long runs.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use chrono::Utc;
use rust_decimal_macros::dec;

use tavern_economy::{EconomyConfig, EconomyError, TavernEconomy};
use tavern_gateway::{DisabledGateway, GatewayError, GenerationRequest, TextGenerator};
use tavern_memory::{MemoryQuery, MemoryStore};
use tavern_narrative::fallback;
use tavern_narrative::{
    NarrativeConfig, NarrativeEngine, NarrativeError, ResponseChannel, TavernConfig,
};
use tavern_types::{
    AgentId, Event, EventId, EventType, MemoryKind, QuestStatus, QuestType, ResourceKind, Tension,
};

/// Answers every request with the same text.
struct Canned {
    text: String,
    calls: AtomicU32,
}

impl Canned {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            calls: AtomicU32::new(0),
        }
    }
}

impl TextGenerator for Canned {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }

    fn name(&self) -> &str {
        "canned"
    }
}

/// Never answers in time.
struct Stalled;

impl TextGenerator for Stalled {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GatewayError> {
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        Ok("too late".to_owned())
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

struct Tavern<G> {
    engine: NarrativeEngine<G>,
    memory: Arc<MemoryStore>,
    economy: Arc<TavernEconomy>,
}

fn tavern_with<G: TextGenerator>(gateway: G, config: NarrativeConfig) -> Tavern<G> {
    let roster = TavernConfig::default().agents;
    let memory = Arc::new(MemoryStore::default());
    let economy = Arc::new(TavernEconomy::new(
        EconomyConfig::default(),
        Arc::clone(&memory),
    ));
    for profile in &roster {
        economy.register_agent(&profile.id).unwrap();
    }
    let engine = NarrativeEngine::new(
        config,
        roster,
        Arc::clone(&memory),
        Arc::clone(&economy),
        gateway,
    )
    .unwrap()
    .with_seed(7)
    .with_tavern_name("The Rusty Tankard");
    Tavern {
        engine,
        memory,
        economy,
    }
}

fn tavern<G: TextGenerator>(gateway: G) -> Tavern<G> {
    tavern_with(gateway, NarrativeConfig::default())
}

fn brawl(participants: Vec<AgentId>) -> Event {
    Event {
        id: EventId::new(),
        event_type: EventType::BrawlBreakout,
        title: "Chairs Everywhere".to_owned(),
        description: "A bench is thrown.".to_owned(),
        participants,
        tension_change: 20,
        consequences: Vec::new(),
        created_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disabled_gateway_falls_back_to_templates() {
    let t = tavern(DisabledGateway);

    let event = t.engine.generate_dynamic_event(Some("a player orders ale")).await;

    let expected = fallback::event_text(event.event_type, "The Rusty Tankard");
    assert_eq!(event.title, expected.title);
    assert_eq!(event.description, expected.description);
    assert!(!event.participants.is_empty());
    assert!(event.participants.len() <= 3);

    let state = t.engine.state();
    assert_eq!(state.tension, Tension::default().apply(event.tension_change));
    assert_eq!(state.active_event_ids, vec![event.id]);
    assert_eq!(t.engine.events().len(), 1);
    for participant in &event.participants {
        let memories = t.memory.retrieve_memories(
            participant,
            MemoryQuery {
                kind: Some(MemoryKind::Event),
                ..MemoryQuery::default()
            },
        );
        assert_eq!(memories.len(), 1);
        assert!(memories[0].content.starts_with(&event.title));
    }
}

#[tokio::test]
async fn generated_json_becomes_the_event_text() {
    let reply = "Here you go:\n```json\n{\"title\": \"Smoke in the Rafters\", \
                 \"description\": \"The chimney backs up.\", \"consequences\": [\"coughing\"],}\n```";
    let t = tavern(Canned::new(reply));

    let event = t.engine.generate_dynamic_event(None).await;

    assert_eq!(event.title, "Smoke in the Rafters");
    assert_eq!(event.description, "The chimney backs up.");
    assert_eq!(event.consequences, vec!["coughing".to_owned()]);
    assert_eq!(t.engine.gateway().calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unparseable_reply_falls_back() {
    let t = tavern(Canned::new("I would rather not."));

    let event = t.engine.generate_dynamic_event(None).await;

    let expected = fallback::event_text(event.event_type, "The Rusty Tankard");
    assert_eq!(event.title, expected.title);
}

#[tokio::test(start_paused = true)]
async fn stalled_generator_hits_the_deadline_and_falls_back() {
    let config = NarrativeConfig {
        generation_timeout_ms: 50,
        ..NarrativeConfig::default()
    };
    let t = tavern_with(Stalled, config);

    let quest = t.engine.generate_quest(Some(QuestType::Rescue), Some(5)).await;

    let expected = fallback::quest_text(QuestType::Rescue, 5, "50");
    assert_eq!(quest.title, expected.title);
    assert_eq!(quest.objectives, expected.objectives);
}

#[test]
fn processing_an_event_twice_is_refused() {
    let t = tavern(DisabledGateway);
    let event = brawl(vec![AgentId::new("innkeeper"), AgentId::new("mercenary")]);

    let feedback = t.engine.process_event(&event).unwrap();
    assert!(feedback.tavern_delta < dec!(0));
    let tension = t.engine.state().tension;
    assert_eq!(tension.level(), 20);

    let again = t.engine.process_event(&event);
    assert!(matches!(again, Err(NarrativeError::EventAlreadyProcessed(id)) if id == event.id));
    assert_eq!(t.engine.state().tension, tension);
    assert_eq!(t.engine.events().len(), 1);

    let memory = &t
        .memory
        .get_agent_context(&AgentId::new("innkeeper"), 1)
        .recent_memories[0];
    assert_eq!(memory.kind, MemoryKind::Event);
    assert_eq!(memory.importance, tavern_types::Importance::High);
    assert_eq!(memory.related_agents, vec![AgentId::new("mercenary")]);
}

#[test]
fn event_refused_by_the_economy_leaves_the_story_untouched() {
    let t = tavern(DisabledGateway);
    let event = brawl(vec![AgentId::new("innkeeper"), AgentId::new("mercenary")]);
    t.economy.update_reputation_on_event(&event).unwrap();
    let before = t.engine.state();

    let result = t.engine.process_event(&event);

    assert!(matches!(
        result,
        Err(NarrativeError::Economy(EconomyError::EventAlreadyApplied(id))) if id == event.id
    ));
    assert_eq!(t.engine.state(), before);
    assert!(t.engine.events().is_empty());
    assert!(
        t.memory
            .get_agent_context(&AgentId::new("innkeeper"), 5)
            .recent_memories
            .is_empty()
    );
}

// ---------------------------------------------------------------------------
// Quests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn quest_lifecycle_pays_rewards() {
    let t = tavern(DisabledGateway);

    let quest = t
        .engine
        .generate_quest(Some(QuestType::Delivery), Some(4))
        .await;
    assert_eq!(quest.status, QuestStatus::Available);
    assert_eq!(quest.difficulty, 4);
    assert_eq!(quest.objectives.len(), 3);
    assert!(quest.rewards.contains(&"40 gold".to_owned()));
    assert!(!quest.required_agents.is_empty());
    assert_eq!(t.engine.state().active_quest_ids, vec![quest.id]);

    let first = t.engine.complete_objective(quest.id, 0).unwrap();
    assert_eq!(first.status, QuestStatus::Active);
    assert_eq!(first.completed_objectives(), 1);

    let out_of_range = t.engine.complete_objective(quest.id, 3);
    assert!(matches!(
        out_of_range,
        Err(NarrativeError::ObjectiveOutOfRange { index: 3, len: 3, .. })
    ));

    t.engine.complete_objective(quest.id, 1).unwrap();
    let done = t.engine.complete_objective(quest.id, 2).unwrap();
    assert_eq!(done.status, QuestStatus::Completed);
    assert!(t.engine.state().active_quest_ids.is_empty());

    for agent in &done.required_agents {
        let gold = t.economy.balances(agent).unwrap()[&ResourceKind::Gold];
        assert_eq!(gold, dec!(140));
        let memories = t.memory.retrieve_memories(agent, MemoryQuery::default());
        assert!(memories.iter().any(|m| m.content == format!("Completed quest: {}", done.title)));
    }

    let closed = t.engine.complete_objective(quest.id, 0);
    assert!(matches!(
        closed,
        Err(NarrativeError::QuestClosed {
            status: QuestStatus::Completed,
            ..
        })
    ));
    assert_eq!(t.engine.narrative_summary().completed_quests, 1);
}

#[tokio::test]
async fn quest_difficulty_is_clamped_and_failures_close_quests() {
    let t = tavern(DisabledGateway);

    let easy = t.engine.generate_quest(None, Some(0)).await;
    let hard = t.engine.generate_quest(None, Some(40)).await;
    assert_eq!(easy.difficulty, 1);
    assert_eq!(hard.difficulty, 10);

    let failed = t.engine.fail_quest(hard.id).unwrap();
    assert_eq!(failed.status, QuestStatus::Failed);
    assert_eq!(t.engine.state().active_quest_ids, vec![easy.id]);
    assert!(t.engine.fail_quest(hard.id).is_err());

    let unknown = tavern_types::QuestId::new();
    assert!(matches!(
        t.engine.complete_objective(unknown, 0),
        Err(NarrativeError::UnknownQuest(id)) if id == unknown
    ));
}

// ---------------------------------------------------------------------------
// Interaction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn interaction_routes_by_role() {
    let t = tavern(Canned::new("  Aye, the old road is watched.  "));
    let agents = [
        AgentId::new("quest_giver"),
        AgentId::new("innkeeper"),
        AgentId::new("ghost"),
    ];

    let responses = t
        .engine
        .orchestrate_agent_interaction(&agents, "A stranger asks about the north road")
        .await;

    assert_eq!(responses.len(), 2);
    let giver = &responses[0];
    assert_eq!(giver.channel, ResponseChannel::Generated);
    assert!(giver.generated);
    assert_eq!(giver.text, "Aye, the old road is watched.");

    let keeper = &responses[1];
    assert_eq!(keeper.channel, ResponseChannel::Quick);
    assert!(!keeper.generated);
    assert!(keeper.text.contains("A stranger asks about the north road"));
    assert_eq!(t.engine.gateway().calls.load(Ordering::SeqCst), 1);

    let memory = &t
        .memory
        .get_agent_context(&AgentId::new("innkeeper"), 1)
        .recent_memories[0];
    assert_eq!(memory.kind, MemoryKind::Interaction);
    assert!(memory.related_agents.contains(&AgentId::new("quest_giver")));
}

#[tokio::test]
async fn generated_channel_falls_back_when_disabled() {
    let t = tavern(DisabledGateway);

    let responses = t
        .engine
        .orchestrate_agent_interaction(&[AgentId::new("lore_keeper")], "An old coin turns up")
        .await;

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].channel, ResponseChannel::Generated);
    assert!(!responses[0].generated);
    assert!(responses[0].text.contains("An old coin turns up"));
}

// ---------------------------------------------------------------------------
// Advancing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn player_actions_shift_tension_and_stay_bounded() {
    let config = NarrativeConfig {
        auto_event_base_chance: 1.0,
        max_active_events: 4,
        ..NarrativeConfig::default()
    };
    let t = tavern_with(DisabledGateway, config);
    let actions = vec!["attack the guard".to_owned(), "challenge the mercenary".to_owned()];

    let first = t.engine.advance_narrative(&actions).await;
    assert_eq!(first.action_effects[0].tension_delta, 25);
    assert_eq!(first.action_effects[1].tension_delta, 15);
    assert_eq!(first.reactions.len(), t.engine.roster().len());

    for _ in 0..40 {
        let update = t.engine.advance_narrative(&actions).await;
        assert!(update.state.tension.level() <= Tension::MAX);
        assert!(update.state.active_event_ids.len() <= 4);
        assert_eq!(update.atmosphere, update.state.atmosphere());
    }
    assert!(t.engine.events().len() > 4);
}

#[tokio::test]
async fn time_of_day_rotates_every_advance() {
    let t = tavern(DisabledGateway);
    let start = t.engine.state().time_of_day;

    let update = t.engine.advance_narrative(&[]).await;

    assert_eq!(update.state.time_of_day, start.next());
    assert!(update.action_effects.is_empty());
}

#[tokio::test]
async fn summary_is_read_only() {
    let t = tavern(DisabledGateway);
    t.engine.generate_dynamic_event(None).await;
    t.engine.generate_quest(None, None).await;

    let counts_before: Vec<usize> = t
        .engine
        .roster()
        .iter()
        .map(|p| t.memory.memory_count(&p.id))
        .collect();
    let first = t.engine.narrative_summary();
    let second = t.engine.narrative_summary();
    let counts_after: Vec<usize> = t
        .engine
        .roster()
        .iter()
        .map(|p| t.memory.memory_count(&p.id))
        .collect();

    assert_eq!(first, second);
    assert_eq!(counts_before, counts_after);
    assert_eq!(first.total_events, 1);
    assert_eq!(first.open_quests.len(), 1);
    assert_eq!(first.recent_events.len(), 1);
}
