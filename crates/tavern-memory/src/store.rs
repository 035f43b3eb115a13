//! The memory store: per-agent episodic memory, sharing, messaging, and
//! relationship bookkeeping.
//!
//! All state sits behind locks owned by [`MemoryStore`], so the store is
//! shared across the simulation as an `Arc<MemoryStore>` and every method
//! takes `&self`. Memories, shared grants, and relationships share one
//! [`RwLock`] so a composite read never observes half of a share; mailboxes
//! have their own [`Mutex`].
//!
//! ## Ranking
//!
//! Retrieval, search, and eviction all rank by importance (highest first),
//! then creation time (newest first), then insertion order (newest first).
//! Storing the 1001st memory for an agent evicts the single lowest-ranked
//! record.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tavern_types::{
    AgentId, ContextValue, Importance, MemoryContext, MemoryId, MemoryKind, MemoryRecord,
    Message, MessageId, MessageKind, SharedMemory, SharedMemoryId,
};

use crate::config::MemoryConfig;
use crate::mailbox::{Mailboxes, ReadMode};
use crate::relationships::RelationshipMatrix;

/// Tag added to shared memories surfaced through retrieval.
pub const SHARED_TAG: &str = "shared";

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// A memory about to be stored.
///
/// Built with [`NewMemory::new`] and the chained setters; everything except
/// kind and content is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMemory {
    /// Category.
    pub kind: MemoryKind,
    /// What happened.
    pub content: String,
    /// Retention importance.
    pub importance: Importance,
    /// Structured details.
    pub context: MemoryContext,
    /// Other agents involved.
    pub related_agents: Vec<AgentId>,
    /// Free-form labels.
    pub tags: Vec<String>,
}

impl NewMemory {
    /// Start a memory of the given kind with low importance.
    pub fn new(kind: MemoryKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            importance: Importance::Low,
            context: MemoryContext::new(),
            related_agents: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Set the importance.
    #[must_use]
    pub const fn importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    /// Add a context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Set the related agents.
    #[must_use]
    pub fn related(mut self, agents: impl IntoIterator<Item = AgentId>) -> Self {
        self.related_agents = agents.into_iter().collect();
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Filter for [`MemoryStore::retrieve_memories`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryQuery {
    /// Only this kind, if set.
    pub kind: Option<MemoryKind>,
    /// Lowest importance returned.
    pub min_importance: Importance,
    /// Maximum records returned.
    pub limit: usize,
    /// Merge in memories other agents shared with this one.
    pub include_shared: bool,
}

impl Default for MemoryQuery {
    fn default() -> Self {
        Self {
            kind: None,
            min_importance: Importance::Low,
            limit: 10,
            include_shared: false,
        }
    }
}

/// Aggregate counts about one agent's memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Records owned.
    pub total_memories: usize,
    /// Records owned, per kind.
    pub by_kind: BTreeMap<MemoryKind, usize>,
    /// Owned records with critical importance.
    pub critical_memories: usize,
    /// Shared grants addressed to the agent.
    pub shared_received: usize,
    /// Messages waiting in the mailbox.
    pub unread_messages: usize,
}

/// Read-only composite view of one agent, for prompts and reactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentContext {
    /// The agent described.
    pub agent_id: AgentId,
    /// Most recently created memories, newest first.
    pub recent_memories: Vec<MemoryRecord>,
    /// Most recent queued messages, oldest first. Not consumed.
    pub recent_messages: Vec<Message>,
    /// Outgoing relationship weights.
    pub relationships: BTreeMap<AgentId, Decimal>,
    /// Counts.
    pub stats: MemoryStats,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// State guarded by the main lock.
#[derive(Debug, Default)]
pub(crate) struct MemoryState {
    pub(crate) memories: BTreeMap<AgentId, Vec<MemoryRecord>>,
    pub(crate) shared: Vec<SharedMemory>,
    pub(crate) relationships: RelationshipMatrix,
}

/// Episodic memory, mailboxes, and relationship graph for every agent.
#[derive(Debug)]
pub struct MemoryStore {
    config: MemoryConfig,
    pub(crate) state: RwLock<MemoryState>,
    mailboxes: Mutex<Mailboxes>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new(config: MemoryConfig) -> Self {
        let mailboxes = Mailboxes::new(config.max_messages_per_mailbox);
        Self {
            config,
            state: RwLock::new(MemoryState::default()),
            mailboxes: Mutex::new(mailboxes),
        }
    }

    /// Active configuration.
    pub const fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_state(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_mailboxes<T>(&self, f: impl FnOnce(&mut Mailboxes) -> T) -> T {
        let mut boxes = self.mailboxes.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut boxes)
    }

    // -----------------------------------------------------------------------
    // Memories
    // -----------------------------------------------------------------------

    /// Store a memory for `agent` and return its id.
    ///
    /// A critical memory with related agents is automatically shared with
    /// them. The agent's list is trimmed back to the configured cap
    /// afterward.
    pub fn store_memory(&self, agent: &AgentId, memory: NewMemory) -> MemoryId {
        let record = MemoryRecord {
            id: MemoryId::new(),
            agent_id: agent.clone(),
            kind: memory.kind,
            content: memory.content,
            importance: memory.importance,
            created_at: Utc::now(),
            context: memory.context,
            related_agents: memory.related_agents,
            tags: memory.tags,
            access_count: 0,
            last_accessed_at: None,
        };
        let id = record.id;
        let auto_share = record.importance == Importance::Critical
            && !record.related_agents.is_empty();
        let recipients = record.related_agents.clone();

        let mut state = self.write_state();
        state
            .memories
            .entry(agent.clone())
            .or_default()
            .push(record);
        tracing::debug!(agent = %agent, memory_id = %id, "Stored memory");

        if auto_share {
            self.share_locked(&mut state, agent, id, &recipients);
        }
        self.evict_locked(&mut state, agent);
        id
    }

    /// Records matching `query`, best first, with access metadata bumped.
    ///
    /// Shared memories addressed to `agent` are read-only copies: they carry
    /// the [`SHARED_TAG`] tag and a `[shared by <agent>] ` prefix, and their
    /// access metadata is never touched.
    pub fn retrieve_memories(&self, agent: &AgentId, query: MemoryQuery) -> Vec<MemoryRecord> {
        let mut state = self.write_state();
        let now = Utc::now();

        let owned = state
            .memories
            .get(agent)
            .map(|records| {
                records
                    .iter()
                    .rev()
                    .filter(|r| matches_filter(r, query.kind, query.min_importance))
                    .map(|r| (r.clone(), true))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let mut candidates = owned;
        if query.include_shared {
            candidates.extend(
                state
                    .shared
                    .iter()
                    .rev()
                    .filter(|s| s.shared_with.contains(agent))
                    .map(shared_view)
                    .filter(|r| matches_filter(r, query.kind, query.min_importance))
                    .map(|r| (r, false)),
            );
        }
        candidates.sort_by_key(|(r, _)| Reverse((r.importance, r.created_at)));
        candidates.truncate(query.limit);

        let mut results = Vec::with_capacity(candidates.len());
        let mut records = state.memories.get_mut(agent);
        for (mut record, owned) in candidates {
            if let Some(stored) = records
                .as_deref_mut()
                .filter(|_| owned)
                .and_then(|list| list.iter_mut().find(|r| r.id == record.id))
            {
                stored.access_count = stored.access_count.saturating_add(1);
                stored.last_accessed_at = Some(now);
                record.access_count = stored.access_count;
                record.last_accessed_at = stored.last_accessed_at;
            }
            results.push(record);
        }
        results
    }

    /// Case-insensitive substring search over content, tags, and context
    /// values.
    ///
    /// Searches every agent unless `agent` is given. An empty or blank query
    /// matches nothing. Access metadata is not updated.
    pub fn search_memories(
        &self,
        query: &str,
        agent: Option<&AgentId>,
        kind: Option<MemoryKind>,
    ) -> Vec<MemoryRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let state = self.read_state();
        let mut hits: Vec<MemoryRecord> = state
            .memories
            .iter()
            .filter(|(owner, _)| agent.is_none_or(|a| a == *owner))
            .flat_map(|(_, records)| records.iter().rev())
            .filter(|r| kind.is_none_or(|k| r.kind == k))
            .filter(|r| record_matches(r, &needle))
            .cloned()
            .collect();
        hits.sort_by_key(|r| Reverse((r.importance, r.created_at)));
        hits
    }

    /// Number of records `agent` owns.
    pub fn memory_count(&self, agent: &AgentId) -> usize {
        self.read_state().memories.get(agent).map_or(0, Vec::len)
    }

    // -----------------------------------------------------------------------
    // Sharing
    // -----------------------------------------------------------------------

    /// Share one of `from`'s memories with `to`.
    ///
    /// Returns `false` if the memory is not owned by `from`, or if no
    /// recipient other than `from` remains.
    pub fn share_memory(&self, from: &AgentId, memory_id: MemoryId, to: &[AgentId]) -> bool {
        let mut state = self.write_state();
        self.share_locked(&mut state, from, memory_id, to)
    }

    fn share_locked(
        &self,
        state: &mut MemoryState,
        from: &AgentId,
        memory_id: MemoryId,
        to: &[AgentId],
    ) -> bool {
        let Some(original) = state
            .memories
            .get(from)
            .and_then(|records| records.iter().find(|r| r.id == memory_id))
        else {
            tracing::debug!(agent = %from, memory_id = %memory_id, "Share rejected: memory not owned");
            return false;
        };

        let mut recipients: Vec<AgentId> = Vec::with_capacity(to.len());
        for agent in to {
            if agent != from && !recipients.contains(agent) {
                recipients.push(agent.clone());
            }
        }
        if recipients.is_empty() {
            return false;
        }

        let grant = SharedMemory {
            id: SharedMemoryId::new(),
            memory_id,
            kind: original.kind,
            content: original.content.clone(),
            importance: original.importance,
            created_at: original.created_at,
            tags: original.tags.clone(),
            shared_by: from.clone(),
            shared_with: recipients,
            shared_at: Utc::now(),
        };

        for recipient in &grant.shared_with {
            state
                .relationships
                .nudge(from, recipient, self.config.share_forward_delta);
            state
                .relationships
                .nudge(recipient, from, self.config.share_return_delta);
        }
        tracing::debug!(
            agent = %from,
            memory_id = %memory_id,
            recipients = grant.shared_with.len(),
            "Shared memory"
        );
        state.shared.push(grant);
        true
    }

    // -----------------------------------------------------------------------
    // Messaging
    // -----------------------------------------------------------------------

    /// Send a message and remember it on both sides.
    ///
    /// Returns `false` for a message to oneself or an empty body.
    pub fn send_message(
        &self,
        from: &AgentId,
        to: &AgentId,
        body: &str,
        kind: MessageKind,
    ) -> bool {
        if from == to || body.trim().is_empty() {
            return false;
        }

        let message = Message {
            id: MessageId::new(),
            from: from.clone(),
            to: to.clone(),
            body: body.to_owned(),
            kind,
            sent_at: Utc::now(),
        };
        let message_id = message.id.to_string();
        let dropped = self.with_mailboxes(|boxes| boxes.deliver(message));
        if dropped > 0 {
            tracing::debug!(agent = %to, dropped, "Mailbox full, dropped oldest messages");
        }

        let importance = self.config.message_importance;
        let sent = NewMemory::new(
            MemoryKind::Interaction,
            format!("Sent a {} message to {to}: {body}", kind.as_str()),
        )
        .importance(importance)
        .with_context("message_id", message_id.as_str())
        .with_context("direction", "outgoing")
        .related([to.clone()])
        .tag("message")
        .tag(kind.as_str());
        let received = NewMemory::new(
            MemoryKind::Interaction,
            format!("Received a {} message from {from}: {body}", kind.as_str()),
        )
        .importance(importance)
        .with_context("message_id", message_id.as_str())
        .with_context("direction", "incoming")
        .related([from.clone()])
        .tag("message")
        .tag(kind.as_str());

        self.store_memory(from, sent);
        self.store_memory(to, received);
        tracing::debug!(from = %from, to = %to, kind = kind.as_str(), "Delivered message");
        true
    }

    /// Read `agent`'s mailbox in arrival order.
    pub fn read_messages(&self, agent: &AgentId, mode: ReadMode) -> Vec<Message> {
        self.with_mailboxes(|boxes| boxes.read(agent, mode))
    }

    // -----------------------------------------------------------------------
    // Relationships
    // -----------------------------------------------------------------------

    /// Apply `delta` to both directions between `a` and `b`, each saturating
    /// independently.
    pub fn update_relationship(&self, a: &AgentId, b: &AgentId, delta: Decimal) {
        if a == b {
            return;
        }
        let mut state = self.write_state();
        let forward = state.relationships.nudge(a, b, delta);
        let backward = state.relationships.nudge(b, a, delta);
        tracing::debug!(a = %a, b = %b, %forward, %backward, "Updated relationship");
    }

    /// Weight from `from` toward `to`, zero if they never interacted.
    pub fn relationship(&self, from: &AgentId, to: &AgentId) -> Decimal {
        self.read_state().relationships.get(from, to)
    }

    /// All outgoing weights of `agent`.
    pub fn relationships_of(&self, agent: &AgentId) -> BTreeMap<AgentId, Decimal> {
        self.read_state().relationships.row(agent)
    }

    // -----------------------------------------------------------------------
    // Composite view
    // -----------------------------------------------------------------------

    /// Snapshot of `agent`'s recent memories, queued messages,
    /// relationships, and counts. Mutates nothing.
    pub fn get_agent_context(&self, agent: &AgentId, size: usize) -> AgentContext {
        let (recent_memories, relationships, mut stats) = {
            let state = self.read_state();
            let records = state.memories.get(agent).map_or(&[][..], Vec::as_slice);

            let mut recent: Vec<MemoryRecord> = records.iter().rev().cloned().collect();
            recent.sort_by_key(|r| Reverse(r.created_at));
            recent.truncate(size);

            let mut stats = MemoryStats {
                total_memories: records.len(),
                ..MemoryStats::default()
            };
            for record in records {
                *stats.by_kind.entry(record.kind).or_insert(0) += 1;
                if record.importance == Importance::Critical {
                    stats.critical_memories = stats.critical_memories.saturating_add(1);
                }
            }
            stats.shared_received = state
                .shared
                .iter()
                .filter(|s| s.shared_with.contains(agent))
                .count();

            (recent, state.relationships.row(agent), stats)
        };

        let (recent_messages, unread) =
            self.with_mailboxes(|boxes| (boxes.recent(agent, size), boxes.unread(agent)));
        stats.unread_messages = unread;

        AgentContext {
            agent_id: agent.clone(),
            recent_memories,
            recent_messages,
            relationships,
            stats,
        }
    }

    // -----------------------------------------------------------------------
    // Eviction
    // -----------------------------------------------------------------------

    fn evict_locked(&self, state: &mut MemoryState, agent: &AgentId) {
        let cap = self.config.max_memories_per_agent;
        let Some(records) = state.memories.get_mut(agent) else {
            return;
        };
        let before = records.len();
        while records.len() > cap {
            let worst = records
                .iter()
                .enumerate()
                .min_by_key(|(index, r)| (r.importance, r.created_at, *index))
                .map(|(index, _)| index);
            match worst {
                Some(index) => {
                    records.remove(index);
                }
                None => break,
            }
        }
        let evicted = before.saturating_sub(records.len());
        if evicted > 0 {
            tracing::debug!(agent = %agent, evicted, "Evicted low-ranked memories");
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn matches_filter(record: &MemoryRecord, kind: Option<MemoryKind>, min: Importance) -> bool {
    kind.is_none_or(|k| record.kind == k) && record.importance >= min
}

/// Present a shared grant as a read-only record from the recipient's side.
fn shared_view(shared: &SharedMemory) -> MemoryRecord {
    let mut tags = shared.tags.clone();
    tags.push(SHARED_TAG.to_owned());
    let mut context = MemoryContext::new();
    context.insert(
        "shared_at".to_owned(),
        ContextValue::Text(shared.shared_at.to_rfc3339()),
    );
    MemoryRecord {
        id: shared.memory_id,
        agent_id: shared.shared_by.clone(),
        kind: shared.kind,
        content: format!("[shared by {}] {}", shared.shared_by, shared.content),
        importance: shared.importance,
        created_at: shared.created_at,
        context,
        related_agents: vec![shared.shared_by.clone()],
        tags,
        access_count: 0,
        last_accessed_at: None,
    }
}

/// Whether a lowercase needle occurs in content, tags, or context values.
fn record_matches(record: &MemoryRecord, needle: &str) -> bool {
    record.content.to_lowercase().contains(needle)
        || record
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
        || record
            .context
            .values()
            .any(|value| value.to_string().to_lowercase().contains(needle))
}
