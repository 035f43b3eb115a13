//! Deterministic local content used whenever text generation is off or
//! fails.
//!
//! Every generated artifact has a fallback here, so the engine never has to
//! surface a gateway error: fixed per-type event and quest templates,
//! role-flavored dialogue lines, and memory-driven reaction lines.

use tavern_types::{AgentProfile, AgentRole, Atmosphere, EventType, MemoryRecord, QuestType};

/// Text fields of an event, generated or templated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventText {
    /// Short headline.
    pub title: String,
    /// One or two sentences of prose.
    pub description: String,
    /// Narrative consequences.
    pub consequences: Vec<String>,
}

/// Text fields of a quest, generated or templated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestText {
    /// Short headline.
    pub title: String,
    /// What is asked and why.
    pub description: String,
    /// Ordered objectives; never empty.
    pub objectives: Vec<String>,
    /// Promised rewards.
    pub rewards: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

/// Fixed event template for `event_type`.
pub fn event_text(event_type: EventType, tavern: &str) -> EventText {
    let (title, description, consequences) = match event_type {
        EventType::StrangerArrival => (
            "A Stranger at the Door",
            format!(
                "A hooded traveler steps into {tavern}, shakes the road off their cloak, and \
                 takes the corner table without a word."
            ),
            owned(&["new faces draw curious looks", "someone will want to know their name"]),
        ),
        EventType::RumorSpread => (
            "Whispers Over the Ale",
            format!("A rumor passes from table to table in {tavern}, growing with every telling."),
            owned(&["patrons trade guesses", "the rumor market stirs"]),
        ),
        EventType::BrawlBreakout => (
            "Fists Fly",
            format!("An argument boils over and a brawl breaks out across the floor of {tavern}."),
            owned(&["furniture is broken", "tempers stay hot", "the watch may be called"]),
        ),
        EventType::QuestOpportunity => (
            "A Notice on the Board",
            format!("A fresh notice is pinned beside the bar of {tavern}, promising coin for capable hands."),
            owned(&["adventurers gather at the board", "a patron offers work"]),
        ),
        EventType::BetrayalRevealed => (
            "A Betrayal Comes to Light",
            format!("Proof surfaces that a trusted regular of {tavern} has been selling out their friends."),
            owned(&["trust is shaken", "old alliances are questioned", "someone wants revenge"]),
        ),
        EventType::AllianceFormed => (
            "Hands Clasped Over the Table",
            format!("Two rival parties drink to a new understanding in the back room of {tavern}."),
            owned(&["former rivals cooperate", "the mood eases"]),
        ),
        EventType::ThreatEmerges => (
            "Trouble on the Road",
            format!("Word reaches {tavern} of armed figures gathering on the road outside town."),
            owned(&["patrons grow wary", "travelers stay indoors", "mercenaries look for work"]),
        ),
        EventType::DiplomaticMission => (
            "An Envoy Arrives",
            format!("An envoy under a neutral banner asks the keeper of {tavern} to host a parley."),
            owned(&["factions send representatives", "the tavern becomes neutral ground"]),
        ),
    };
    EventText {
        title: title.to_owned(),
        description,
        consequences,
    }
}

/// Fixed quest template for `quest_type`.
pub fn quest_text(quest_type: QuestType, difficulty: u8, reward_gold: &str) -> QuestText {
    let (title, description, objectives) = match quest_type {
        QuestType::Delivery => (
            "A Parcel for the Mill",
            "A sealed parcel must reach the miller before the week is out, unopened.",
            owned(&[
                "Collect the parcel from the innkeeper",
                "Travel the river road",
                "Deliver the parcel to the miller",
            ]),
        ),
        QuestType::Investigation => (
            "The Missing Casks",
            "Casks keep vanishing from the cellar and nobody admits to seeing a thing.",
            owned(&[
                "Question the staff",
                "Search the cellar",
                "Name the culprit",
            ]),
        ),
        QuestType::Diplomacy => (
            "Smoothing Ruffled Feathers",
            "Two guilds are one insult away from open feud. Someone must carry terms between them.",
            owned(&[
                "Hear the merchants' grievance",
                "Hear the craftsmen's grievance",
                "Broker an accord",
            ]),
        ),
        QuestType::Retrieval => (
            "The Lost Heirloom",
            "A patron's family ring was pawned in a moment of weakness and must be bought or taken back.",
            owned(&["Find the pawnbroker", "Recover the ring"]),
        ),
        QuestType::Bounty => (
            "Wanted: The Road Wolf",
            "A highwayman has been robbing travelers on the north road. The watch pays for his capture.",
            owned(&[
                "Learn where the Road Wolf hides",
                "Track him down",
                "Bring him before the watch",
            ]),
        ),
        QuestType::Rescue => (
            "Taken in the Night",
            "A stable hand was dragged off by raiders. Every hour counts.",
            owned(&[
                "Find the raiders' trail",
                "Reach their camp",
                "Free the captive",
                "Return safely",
            ]),
        ),
    };
    QuestText {
        title: title.to_owned(),
        description: format!("{description} (difficulty {difficulty})"),
        objectives,
        rewards: vec![format!("{reward_gold} gold"), "the tavern's gratitude".to_owned()],
    }
}

/// A short in-character line for `agent` reacting to `scenario`.
pub fn dialogue_line(agent: &AgentProfile, scenario: &str) -> String {
    let name = &agent.name;
    match agent.role {
        AgentRole::Innkeeper => {
            format!("{name} wipes the bar: \"{scenario}? Not under my roof without a round first.\"")
        }
        AgentRole::Merchant => {
            format!("{name} taps a ledger: \"{scenario}. There's profit in that, for the right price.\"")
        }
        AgentRole::QuestGiver => {
            format!("{name} unrolls a map: \"{scenario}. I need someone who can handle it.\"")
        }
        AgentRole::LoreKeeper => {
            format!("{name} leans closer: \"{scenario}... this has happened before, you know.\"")
        }
        AgentRole::Informant => {
            format!("{name} murmurs: \"{scenario}. I heard more, if you're buying.\"")
        }
        AgentRole::Mercenary => {
            format!("{name} rests a hand on a sword hilt: \"{scenario}. Who's paying?\"")
        }
        AgentRole::Patron => format!("{name} shrugs: \"{scenario}. Pass the ale.\""),
    }
}

/// A reaction line for `agent` built from its most recent memory.
pub fn reaction_line(
    agent: &AgentProfile,
    latest: Option<&MemoryRecord>,
    atmosphere: Atmosphere,
) -> String {
    let mood = match atmosphere {
        Atmosphere::Calm => "settles in comfortably",
        Atmosphere::Tense => "keeps one eye on the door",
        Atmosphere::Hostile => "sits with their back to the wall",
        Atmosphere::Explosive => "is ready to bolt or fight",
    };
    match latest {
        Some(memory) => format!(
            "{} {mood}, still thinking about: {}",
            agent.name,
            truncate(&memory.content, 80)
        ),
        None => format!("{} {mood}.", agent.name),
    }
}

/// At most `max` characters of `text`, with an ellipsis when cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use tavern_types::AgentId;

    use super::*;

    fn profile(role: AgentRole) -> AgentProfile {
        AgentProfile {
            id: AgentId::new("agent"),
            name: "Greta".to_owned(),
            faction: "tavern".to_owned(),
            role,
            description: String::new(),
        }
    }

    #[test]
    fn every_event_type_has_complete_template() {
        for event_type in EventType::ALL {
            let text = event_text(event_type, "The Rusty Tankard");
            assert!(!text.title.is_empty());
            assert!(text.description.contains("The Rusty Tankard"));
            assert!(!text.consequences.is_empty());
        }
    }

    #[test]
    fn every_quest_type_has_objectives() {
        for quest_type in QuestType::ALL {
            let text = quest_text(quest_type, 4, "40");
            assert!(!text.objectives.is_empty());
            assert!(text.rewards.iter().any(|r| r == "40 gold"));
        }
    }

    #[test]
    fn reaction_mentions_latest_memory() {
        let agent = profile(AgentRole::Patron);
        let line = reaction_line(&agent, None, Atmosphere::Calm);
        assert_eq!(line, "Greta settles in comfortably.");
        assert!(dialogue_line(&agent, "A dragon").contains("A dragon"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ööööö", 3), "ööö...");
    }
}
