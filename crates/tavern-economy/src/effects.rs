//! Fixed side effects of each transaction kind on the tavern.
//!
//! | Kind | Reputation | Other |
//! |------|-----------:|-------|
//! | Purchase | +0.3 | |
//! | Sale | +0.3 | |
//! | Trade | +0.5 | |
//! | Information exchange | +0.2 | information +1 |
//! | Bribe | -2 | influence +1 |
//! | Favor | +0.2 | influence +1 |
//! | Service | +0.5 | satisfaction +1 |
//! | Gift | +1 | satisfaction +1 |
//! | Rumor trade | +0.1 | information +1 |
//! | Quest reward | +1 | |
//! | Market shift | 0 | |

use rust_decimal::Decimal;

use tavern_types::{Importance, TavernEconomicState, TransactionKind};

/// What a committed transaction of one kind does to the tavern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindEffects {
    /// Shift to the tavern reputation score.
    pub reputation: Decimal,
    /// Shift to information value.
    pub information: Decimal,
    /// Shift to influence level.
    pub influence: Decimal,
    /// Shift to patron satisfaction.
    pub satisfaction: Decimal,
    /// Narrative consequences recorded on the transaction.
    pub consequences: &'static [&'static str],
    /// Importance of the memory mirrored to each participant.
    pub memory_importance: Importance,
}

impl KindEffects {
    /// Apply the scalar shifts to `tavern` and clamp.
    pub fn apply(&self, tavern: &mut TavernEconomicState) {
        tavern.reputation_score += self.reputation;
        tavern.information_value += self.information;
        tavern.influence_level += self.influence;
        tavern.patron_satisfaction += self.satisfaction;
        tavern.clamp_bounds();
    }
}

/// Effects table for `kind`.
pub const fn effects_of(kind: TransactionKind) -> KindEffects {
    const ZERO: Decimal = Decimal::ZERO;
    const ONE: Decimal = Decimal::ONE;

    match kind {
        TransactionKind::Purchase => KindEffects {
            reputation: Decimal::from_parts(3, 0, 0, false, 1),
            information: ZERO,
            influence: ZERO,
            satisfaction: ZERO,
            consequences: &["goods changed hands at the bar"],
            memory_importance: Importance::Low,
        },
        TransactionKind::Sale => KindEffects {
            reputation: Decimal::from_parts(3, 0, 0, false, 1),
            information: ZERO,
            influence: ZERO,
            satisfaction: ZERO,
            consequences: &["stock replenished"],
            memory_importance: Importance::Low,
        },
        TransactionKind::Trade => KindEffects {
            reputation: Decimal::from_parts(5, 0, 0, false, 1),
            information: ZERO,
            influence: ZERO,
            satisfaction: ZERO,
            consequences: &["trade relations improved"],
            memory_importance: Importance::Medium,
        },
        TransactionKind::InformationExchange => KindEffects {
            reputation: Decimal::from_parts(2, 0, 0, false, 1),
            information: ONE,
            influence: ZERO,
            satisfaction: ZERO,
            consequences: &["information network strengthened"],
            memory_importance: Importance::Medium,
        },
        TransactionKind::Bribe => KindEffects {
            reputation: Decimal::from_parts(2, 0, 0, true, 0),
            information: ZERO,
            influence: ONE,
            satisfaction: ZERO,
            consequences: &[
                "corruption risk increased",
                "the watch may take an interest",
            ],
            memory_importance: Importance::High,
        },
        TransactionKind::Favor => KindEffects {
            reputation: Decimal::from_parts(2, 0, 0, false, 1),
            information: ZERO,
            influence: ONE,
            satisfaction: ZERO,
            consequences: &["a favor is now owed"],
            memory_importance: Importance::Medium,
        },
        TransactionKind::Service => KindEffects {
            reputation: Decimal::from_parts(5, 0, 0, false, 1),
            information: ZERO,
            influence: ZERO,
            satisfaction: ONE,
            consequences: &["patrons were well served"],
            memory_importance: Importance::Low,
        },
        TransactionKind::Gift => KindEffects {
            reputation: ONE,
            information: ZERO,
            influence: ZERO,
            satisfaction: ONE,
            consequences: &["goodwill generated"],
            memory_importance: Importance::Medium,
        },
        TransactionKind::RumorTrade => KindEffects {
            reputation: Decimal::from_parts(1, 0, 0, false, 1),
            information: ONE,
            influence: ZERO,
            satisfaction: ZERO,
            consequences: &["a rumor entered circulation"],
            memory_importance: Importance::Medium,
        },
        TransactionKind::QuestReward => KindEffects {
            reputation: ONE,
            information: ZERO,
            influence: ZERO,
            satisfaction: ZERO,
            consequences: &["adventurers were paid for their work"],
            memory_importance: Importance::High,
        },
        TransactionKind::MarketShift => KindEffects {
            reputation: ZERO,
            information: ZERO,
            influence: ZERO,
            satisfaction: ZERO,
            consequences: &["market conditions shifted"],
            memory_importance: Importance::Low,
        },
    }
}
