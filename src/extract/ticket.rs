//! Ticket records emitted by the generate-ticket agent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::json::{aliased_string_field, extract_json_object, string_field};

/// Ticket fields recovered from agent stdout. Every field is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedTicket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_name: Option<String>,
}

impl ExtractedTicket {
    /// Normalize a parsed object, accepting `feature_name` as an alias.
    pub fn from_object(map: &Map<String, Value>) -> Self {
        Self {
            title: string_field(map, "title"),
            description: string_field(map, "description"),
            priority: string_field(map, "priority"),
            feature_name: aliased_string_field(map, "featureName", "feature_name"),
        }
    }
}

/// Extract a ticket-shaped JSON object from agent stdout.
///
/// Returns `None` when no JSON object can be found; callers show their own
/// "could not parse agent output" fallback.
pub fn extract_ticket_json_from_stdout(stdout: &str) -> Option<ExtractedTicket> {
    extract_json_object(stdout).map(|map| ExtractedTicket::from_object(&map))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(json: &str) -> Map<String, Value> {
        match serde_json::from_str(json).unwrap() {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_from_object_missing_fields() {
        assert_eq!(ExtractedTicket::from_object(&object("{}")), ExtractedTicket::default());
    }

    #[test]
    fn test_from_object_passes_strings_through() {
        let ticket = ExtractedTicket::from_object(&object(
            r#"{"title":"Fix bug","description":"Details here","priority":"P1"}"#,
        ));
        assert_eq!(ticket.title.as_deref(), Some("Fix bug"));
        assert_eq!(ticket.description.as_deref(), Some("Details here"));
        assert_eq!(ticket.priority.as_deref(), Some("P1"));
        assert_eq!(ticket.feature_name, None);
    }

    #[test]
    fn test_from_object_accepts_snake_case_feature_name() {
        let ticket = ExtractedTicket::from_object(&object(r#"{"feature_name":"Auth"}"#));
        assert_eq!(ticket.feature_name.as_deref(), Some("Auth"));
    }

    #[test]
    fn test_from_object_prefers_camel_case_feature_name() {
        let ticket =
            ExtractedTicket::from_object(&object(r#"{"featureName":"A","feature_name":"B"}"#));
        assert_eq!(ticket.feature_name.as_deref(), Some("A"));
    }

    #[test]
    fn test_from_object_ignores_non_string_values() {
        let ticket = ExtractedTicket::from_object(&object(
            r#"{"title":123,"description":null,"priority":["P1"],"featureName":0}"#,
        ));
        assert_eq!(ticket, ExtractedTicket::default());
    }

    #[test]
    fn test_extract_plain_object() {
        let ticket = extract_ticket_json_from_stdout(r#"{"title":"T","priority":"P1"}"#).unwrap();
        assert_eq!(
            ticket,
            ExtractedTicket {
                title: Some("T".into()),
                priority: Some("P1".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_extract_from_markdown_block() {
        let stdout = "\nHere is the ticket:\n```json\n{\"title\": \"Add login\", \"description\": \"Implement auth\", \"priority\": \"P0\"}\n```\n";
        let ticket = extract_ticket_json_from_stdout(stdout).unwrap();
        assert_eq!(ticket.title.as_deref(), Some("Add login"));
        assert_eq!(ticket.description.as_deref(), Some("Implement auth"));
        assert_eq!(ticket.priority.as_deref(), Some("P0"));
    }

    #[test]
    fn test_extract_normalizes_feature_name_from_stdout() {
        let ticket =
            extract_ticket_json_from_stdout(r#"{"title":"T","feature_name":"My Feature"}"#)
                .unwrap();
        assert_eq!(ticket.feature_name.as_deref(), Some("My Feature"));
    }

    #[test]
    fn test_extract_first_object_wins() {
        let ticket =
            extract_ticket_json_from_stdout(r#"prefix {"title":"First"} more {"title":"Second"}"#)
                .unwrap();
        assert_eq!(ticket.title.as_deref(), Some("First"));
    }

    #[test]
    fn test_extract_returns_none_for_garbage() {
        assert_eq!(extract_ticket_json_from_stdout("not json at all"), None);
        assert_eq!(extract_ticket_json_from_stdout("{ invalid }"), None);
        assert_eq!(extract_ticket_json_from_stdout("[1,2,3]"), None);
        assert_eq!(extract_ticket_json_from_stdout(""), None);
    }

    #[test]
    fn test_serializes_camel_case_without_absent_fields() {
        let ticket = ExtractedTicket {
            title: Some("T".into()),
            feature_name: Some("F".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&ticket).unwrap(),
            r#"{"title":"T","featureName":"F"}"#
        );
    }
}
