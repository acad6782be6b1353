use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::json::{extract_json_object, string_field};

/// Idea fields recovered from agent stdout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedIdea {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ExtractedIdea {
    pub fn from_object(map: &Map<String, Value>) -> Self {
        Self {
            title: string_field(map, "title"),
            description: string_field(map, "description"),
            category: string_field(map, "category"),
        }
    }
}

/// Extract an idea-shaped JSON object from agent stdout, same rules as tickets.
pub fn extract_idea_json_from_stdout(stdout: &str) -> Option<ExtractedIdea> {
    extract_json_object(stdout).map(|map| ExtractedIdea::from_object(&map))
}
