//! Component wiring and the tick loop.
//!
//! [`Tavern`] owns the memory store, the economy, and the narrative engine
//! for one run. Each tick advances the story, spins off a quest when a
//! quest opportunity fires, and rolls market events. Snapshots are written
//! every `persistence.snapshot_interval_ticks` ticks and once at shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::info;

use tavern_economy::TavernEconomy;
use tavern_gateway::TextGenerator;
use tavern_memory::{MemoryError, MemoryStore, PersistenceConfig, SnapshotStore};
use tavern_narrative::{NarrativeEngine, SimulationConfig, TavernConfig};
use tavern_types::{EventType, Tension};

use crate::error::EngineError;

/// What one tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Whether an automatic event fired.
    pub event_fired: bool,
    /// Whether a quest was posted.
    pub quest_posted: bool,
    /// Objectives completed.
    pub objectives_completed: usize,
    /// Market events applied.
    pub market_events: usize,
}

/// Outcome of a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks executed.
    pub ticks: u64,
    /// Events in the story history.
    pub events: usize,
    /// Quests completed.
    pub quests_completed: usize,
    /// Tension at shutdown.
    pub final_tension: Tension,
    /// Where the final snapshot was written.
    pub snapshot_path: PathBuf,
}

/// One simulation run.
pub struct Tavern<G> {
    memory: Arc<MemoryStore>,
    economy: Arc<TavernEconomy>,
    narrative: NarrativeEngine<G>,
    snapshots: SnapshotStore,
    persistence: PersistenceConfig,
    simulation: SimulationConfig,
    rng: SmallRng,
}

impl<G: TextGenerator> Tavern<G> {
    /// Construct every component and register the roster.
    pub fn build(config: TavernConfig, gateway: G) -> Result<Self, EngineError> {
        let memory = Arc::new(MemoryStore::new(config.memory));
        let economy = Arc::new(TavernEconomy::new(config.economy, Arc::clone(&memory)));
        for profile in &config.agents {
            economy.register_agent(&profile.id)?;
        }

        let narrative = NarrativeEngine::new(
            config.narrative,
            config.agents,
            Arc::clone(&memory),
            Arc::clone(&economy),
            gateway,
        )?
        .with_tavern_name(config.tavern.name);
        let (narrative, rng) = match config.tavern.seed {
            Some(seed) => (
                narrative.with_seed(seed),
                SmallRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (narrative, SmallRng::from_rng(&mut rand::rng())),
        };

        let snapshots = SnapshotStore::new(
            config.persistence.snapshot_dir.clone(),
            config.persistence.retry,
        );
        info!(
            agents = narrative.roster().len(),
            snapshot_dir = %snapshots.dir().display(),
            backend = narrative.gateway().name(),
            "Tavern assembled"
        );

        Ok(Self {
            memory,
            economy,
            narrative,
            snapshots,
            persistence: config.persistence,
            simulation: config.simulation,
            rng,
        })
    }

    /// Load the memory snapshot if one exists. Returns whether it did.
    pub async fn restore(&self) -> Result<bool, EngineError> {
        match self.snapshots.load(&self.persistence.namespace).await {
            Ok(snapshot) => {
                self.memory.restore(snapshot);
                info!(namespace = %self.persistence.namespace, "Memory snapshot restored");
                Ok(true)
            }
            Err(MemoryError::SnapshotNotFound(path)) => {
                info!(path = %path.display(), "No memory snapshot, starting fresh");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Write the memory snapshot.
    pub async fn save(&self) -> Result<PathBuf, EngineError> {
        let snapshot = self.memory.snapshot();
        Ok(self
            .snapshots
            .save(&self.persistence.namespace, &snapshot)
            .await?)
    }

    /// Run one tick with an optional player action.
    pub async fn tick(&mut self, player_action: Option<&str>) -> TickReport {
        let actions: Vec<String> = player_action.map(ToOwned::to_owned).into_iter().collect();
        let update = self.narrative.advance_narrative(&actions).await;

        let quest_posted = match &update.triggered_event {
            Some(event) if event.event_type == EventType::QuestOpportunity => {
                self.narrative.generate_quest(None, None).await;
                true
            }
            _ => false,
        };

        let market_events = self.economy.simulate_economic_events(&mut self.rng);
        for event in &market_events {
            tracing::debug!(kind = ?event.kind, description = %event.description, "Market event");
        }

        TickReport {
            event_fired: update.triggered_event.is_some(),
            quest_posted,
            objectives_completed: update.quest_progress.len(),
            market_events: market_events.len(),
        }
    }

    /// Run the configured number of ticks, then save a final snapshot.
    ///
    /// A failed periodic snapshot is logged and the loop continues; a failed
    /// final snapshot is an error.
    pub async fn run(&mut self) -> Result<RunSummary, EngineError> {
        let script = self.simulation.player_actions.clone();
        let mut actions = script.iter().cycle();
        let interval = Duration::from_millis(self.simulation.tick_interval_ms);
        let ticks = self.simulation.ticks;
        let snapshot_every = self.persistence.snapshot_interval_ticks;

        for tick in 1..=ticks {
            let action = actions.next().map(String::as_str);
            let report = self.tick(action).await;
            tracing::debug!(
                tick,
                action,
                event_fired = report.event_fired,
                quest_posted = report.quest_posted,
                objectives_completed = report.objectives_completed,
                market_events = report.market_events,
                "Tick complete"
            );

            if snapshot_every > 0 && tick % snapshot_every == 0 && tick < ticks {
                if let Err(err) = self.save().await {
                    tracing::warn!(tick, error = %err, "Periodic snapshot failed");
                }
            }
            if !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }
        }

        let snapshot_path = self.save().await?;
        let summary = self.narrative.narrative_summary();
        let economy = self.economy.economic_summary();
        info!(
            ticks,
            events = summary.total_events,
            quests = summary.total_quests,
            quests_completed = summary.completed_quests,
            tension = summary.state.tension.level(),
            atmosphere = summary.atmosphere.as_str(),
            transactions = economy.transaction_count,
            tavern_reputation = %economy.tavern.reputation_score,
            "Simulation finished"
        );
        Ok(RunSummary {
            ticks,
            events: summary.total_events,
            quests_completed: summary.completed_quests,
            final_tension: summary.state.tension,
            snapshot_path,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tavern_gateway::DisabledGateway;

    use super::*;

    fn config(dir: &std::path::Path) -> TavernConfig {
        let mut config = TavernConfig::default();
        config.tavern.seed = Some(11);
        config.persistence.snapshot_dir = dir.to_path_buf();
        config.persistence.snapshot_interval_ticks = 2;
        config.simulation.ticks = 5;
        config.simulation.player_actions = vec!["investigate the cellar".to_owned()];
        config
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tavern_engine_{name}_{}", std::process::id()))
    }

    #[tokio::test]
    async fn run_saves_a_restorable_snapshot() {
        let dir = temp_dir("run");
        let mut tavern = Tavern::build(config(&dir), DisabledGateway).unwrap();
        assert!(!tavern.restore().await.unwrap());

        let summary = tavern.run().await.unwrap();
        assert_eq!(summary.ticks, 5);
        assert!(summary.snapshot_path.is_file());

        let again = Tavern::build(config(&dir), DisabledGateway).unwrap();
        assert!(again.restore().await.unwrap());
        assert_eq!(again.memory.snapshot().memories, tavern.memory.snapshot().memories);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn duplicate_roster_entries_are_rejected() {
        let dir = temp_dir("dup");
        let mut config = config(&dir);
        let first = config.agents.first().cloned().unwrap();
        config.agents.push(first);
        assert!(matches!(
            Tavern::build(config, DisabledGateway),
            Err(EngineError::Economy { .. })
        ));
    }
}
