use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::project::ProjectKey;

/// How a session header identified itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeMode {
    /// Typed `session_meta` envelope with identity nested under a payload.
    Modern,
    /// Bare `id` + `timestamp` pair at the top level of the first record.
    Legacy,
    Unknown,
}

/// Session identity derived from the first record's shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeInfo {
    #[serde(rename = "resumeMode")]
    pub mode: ResumeMode,
    #[serde(rename = "resumeId", skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
}

impl ResumeInfo {
    pub fn unknown() -> Self {
        Self {
            mode: ResumeMode::Unknown,
            id: None,
        }
    }
}

/// Shell/runtime family the session ran under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellKind {
    Posix,
    Windows,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Instructions,
    Environment,
    Reasoning,
    ToolCall,
    ToolOutput,
    State,
    Meta,
    Unknown,
}

/// One normalized content item within a message.
///
/// `tags` records provenance (e.g. "instructions", the container kind) so
/// consumers can filter without re-parsing the raw log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    pub kind: ContentKind,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
}

impl MessageContent {
    pub fn new(kind: ContentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            tags: Vec::new(),
        }
    }

    pub fn tagged(kind: ContentKind, text: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            tags: vec![tag.into()],
        }
    }
}

/// One logical turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<MessageContent>,
}

/// List-view projection of one session log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub id: String,
    pub title: String,
    pub timestamp_ms: i64,
    pub file_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub raw_timestamp_text: Option<String>,
    pub project_key: ProjectKey,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub preview: Option<String>,
    #[serde(flatten)]
    pub resume: ResumeInfo,
    pub shell_kind: ShellKind,
}

/// Full-view projection: everything in [`Summary`] plus the normalized
/// message list and parse accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    pub id: String,
    pub title: String,
    pub timestamp_ms: i64,
    pub messages: Vec<Message>,
    /// Count of lines that failed JSON parsing. Never silently dropped.
    pub skipped_line_count: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub raw_timestamp_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub working_dir: Option<String>,
    pub project_key: ProjectKey,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub preview: Option<String>,
    #[serde(flatten)]
    pub resume: ResumeInfo,
    pub shell_kind: ShellKind,
}

impl Details {
    /// Project the list-view fields out of a full parse.
    pub fn to_summary(&self, file_path: PathBuf) -> Summary {
        Summary {
            id: self.id.clone(),
            title: self.title.clone(),
            timestamp_ms: self.timestamp_ms,
            file_path,
            raw_timestamp_text: self.raw_timestamp_text.clone(),
            project_key: self.project_key.clone(),
            preview: self.preview.clone(),
            resume: self.resume.clone(),
            shell_kind: self.shell_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_serializes_with_camel_case_field_names() {
        let summary = Summary {
            id: "abc".to_string(),
            title: "hello".to_string(),
            timestamp_ms: 1_700_000_000_000,
            file_path: PathBuf::from("/logs/2025/01/01/run-x.log"),
            raw_timestamp_text: Some("2025-01-01T00:00:00Z".to_string()),
            project_key: ProjectKey::new("deadbeef"),
            preview: None,
            resume: ResumeInfo {
                mode: ResumeMode::Legacy,
                id: Some("abc".to_string()),
            },
            shell_kind: ShellKind::Posix,
        };

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["timestampMs"], 1_700_000_000_000_i64);
        assert_eq!(value["projectKey"], "deadbeef");
        assert_eq!(value["resumeMode"], "legacy");
        assert_eq!(value["resumeId"], "abc");
        assert_eq!(value["shellKind"], "posix");
        assert!(value.get("preview").is_none());
    }

    #[test]
    fn message_content_skips_empty_tags() {
        let content = MessageContent::new(ContentKind::Text, "hi");
        let value = serde_json::to_value(&content).unwrap();
        assert!(value.get("tags").is_none());

        let tagged = MessageContent::tagged(ContentKind::Instructions, "do X", "instructions");
        let value = serde_json::to_value(&tagged).unwrap();
        assert_eq!(value["tags"][0], "instructions");
    }
}
