//! Parsing generated text into event and quest drafts.
//!
//! Models wrap JSON in prose or code fences and leave trailing commas, so
//! parsing tries, in order:
//! 1. the trimmed text as-is
//! 2. the outermost `{ ... }` span (drops fences and surrounding prose)
//! 3. that span with trailing commas removed
//!
//! A draft that parses but has an empty title, description, or objective
//! list is still malformed. Callers treat every [`NarrativeError::Malformed`]
//! as a cue to use the fallback template.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::NarrativeError;
use crate::fallback::{EventText, QuestText, truncate};

/// Longest accepted title, in characters.
const MAX_TITLE_CHARS: usize = 120;

/// Most objectives kept from a generated quest.
const MAX_OBJECTIVES: usize = 6;

#[derive(Debug, Deserialize)]
struct RawEvent {
    title: String,
    description: String,
    #[serde(default)]
    consequences: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawQuest {
    title: String,
    description: String,
    #[serde(default)]
    objectives: Vec<String>,
    #[serde(default)]
    rewards: Vec<String>,
}

/// Parse generated event text.
pub fn parse_event(raw: &str) -> Result<EventText, NarrativeError> {
    let parsed: RawEvent = parse_json_object(raw)?;
    let title = truncate(&required(&parsed.title, "title")?, MAX_TITLE_CHARS);
    let description = required(&parsed.description, "description")?;
    Ok(EventText {
        title,
        description,
        consequences: non_empty_lines(parsed.consequences),
    })
}

/// Parse generated quest text.
pub fn parse_quest(raw: &str) -> Result<QuestText, NarrativeError> {
    let parsed: RawQuest = parse_json_object(raw)?;
    let title = truncate(&required(&parsed.title, "title")?, MAX_TITLE_CHARS);
    let description = required(&parsed.description, "description")?;
    let mut objectives = non_empty_lines(parsed.objectives);
    if objectives.is_empty() {
        return Err(NarrativeError::Malformed("quest has no objectives".to_owned()));
    }
    objectives.truncate(MAX_OBJECTIVES);
    Ok(QuestText {
        title,
        description,
        objectives,
        rewards: non_empty_lines(parsed.rewards),
    })
}

/// Deserialize the JSON object embedded in `raw`.
fn parse_json_object<T: DeserializeOwned>(raw: &str) -> Result<T, NarrativeError> {
    let trimmed = raw.trim();
    if let Ok(parsed) = serde_json::from_str(trimmed) {
        return Ok(parsed);
    }

    let Some(span) = outermost_object(trimmed) else {
        return Err(NarrativeError::Malformed(format!(
            "no JSON object in: {}",
            truncate(trimmed, 200)
        )));
    };
    if let Ok(parsed) = serde_json::from_str(span) {
        return Ok(parsed);
    }

    serde_json::from_str(&strip_trailing_commas(span))
        .map_err(|e| NarrativeError::Malformed(format!("invalid JSON object: {e}")))
}

/// The slice from the first `{` to the last `}`, if both exist in order.
fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}

/// Remove commas that directly precede `}` or `]` (ignoring whitespace).
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == ',' {
            let rest = chars.clone().find(|next| !next.is_whitespace());
            if matches!(rest, Some('}' | ']')) {
                continue;
            }
        }
        result.push(c);
    }
    result
}

fn required(value: &str, field: &str) -> Result<String, NarrativeError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(NarrativeError::Malformed(format!("empty {field}")));
    }
    Ok(value.to_owned())
}

fn non_empty_lines(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_owned())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn clean_json_parses() {
        let raw = r#"{"title": "Night Visitor", "description": "A knock after closing.", "consequences": ["doors are barred"]}"#;
        let event = parse_event(raw).unwrap();
        assert_eq!(event.title, "Night Visitor");
        assert_eq!(event.consequences, vec!["doors are barred".to_owned()]);
    }

    #[test]
    fn prose_and_fences_are_tolerated() {
        let raw = "Sure! Here is your event:\n```json\n{\"title\": \"Smoke\", \"description\": \"The kitchen is on fire.\",}\n```\nEnjoy.";
        let event = parse_event(raw).unwrap();
        assert_eq!(event.title, "Smoke");
        assert!(event.consequences.is_empty());
    }

    #[test]
    fn missing_fields_are_malformed() {
        assert!(matches!(
            parse_event(r#"{"title": "Only a title"}"#),
            Err(NarrativeError::Malformed(_))
        ));
        assert!(matches!(
            parse_event(r#"{"title": "  ", "description": "x"}"#),
            Err(NarrativeError::Malformed(_))
        ));
        assert!(parse_event("the model refused").is_err());
        assert!(parse_event("} backwards {").is_err());
    }

    #[test]
    fn quest_needs_objectives() {
        let raw = r#"{"title": "Fetch", "description": "Bring it back.", "objectives": [" ", ""]}"#;
        assert!(parse_quest(raw).is_err());

        let raw = r#"{"title": "Fetch", "description": "Bring it back.", "objectives": ["a","b","c","d","e","f","g"], "rewards": ["50 gold"]}"#;
        let quest = parse_quest(raw).unwrap();
        assert_eq!(quest.objectives.len(), 6);
        assert_eq!(quest.rewards, vec!["50 gold".to_owned()]);
    }

    #[test]
    fn trailing_commas_are_stripped() {
        assert_eq!(strip_trailing_commas(r#"{"a": [1, 2, ], }"#), r#"{"a": [1, 2 ] }"#);
        assert_eq!(strip_trailing_commas("a, b"), "a, b");
    }
}
