//! Error types for the narrative engine.
//!
//! Generation problems ([`NarrativeError::Template`],
//! [`NarrativeError::Malformed`], [`NarrativeError::Gateway`]) never leave
//! the engine: they select the fallback path and are only logged. Quest
//! transitions and event processing report the rest to the caller.

use tavern_economy::EconomyError;
use tavern_gateway::GatewayError;
use tavern_types::{EventId, QuestId, QuestStatus};

/// Errors that can occur in the narrative engine.
#[derive(Debug, thiserror::Error)]
pub enum NarrativeError {
    /// No quest with this id exists.
    #[error("unknown quest: {0}")]
    UnknownQuest(QuestId),

    /// The quest is already completed or failed.
    #[error("quest {id} is closed ({status:?})")]
    QuestClosed {
        /// The quest.
        id: QuestId,
        /// Its terminal status.
        status: QuestStatus,
    },

    /// The objective index is past the end of the objective list.
    #[error("quest {id} has {len} objectives, no index {index}")]
    ObjectiveOutOfRange {
        /// The quest.
        id: QuestId,
        /// Requested index.
        index: usize,
        /// Number of objectives.
        len: usize,
    },

    /// The event is already in the history.
    #[error("event already processed: {0}")]
    EventAlreadyProcessed(EventId),

    /// The economy refused a feedback or reward step.
    #[error("economy error: {0}")]
    Economy(#[from] EconomyError),

    /// A prompt template failed to render.
    #[error("template error: {0}")]
    Template(String),

    /// Generated text did not contain the expected JSON object.
    #[error("malformed generation: {0}")]
    Malformed(String),

    /// The gateway failed or was unavailable.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}
