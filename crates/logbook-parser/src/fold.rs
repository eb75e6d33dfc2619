use logbook_types::{ContentKind, Message, MessageContent, Role, ShellKind, truncate};
use serde_json::Value;
use std::collections::HashSet;

use crate::classify::LineRecord;
use crate::schema::{ContentField, ContentPart, MessageRecord, ReasoningRecord, TypedRecord};
use crate::shell::{classify_shell_field, classify_shell_text};
use crate::text::{
    Segment, extract_cwd_marker, first_absolute_path_token, looks_like_path, normalize_for_dedup,
    split_tagged,
};

const PREVIEW_MAX_CHARS: usize = 200;

/// Accumulator that folds classified records into the normalized projection.
///
/// The same machine drives both passes: the full Details parse collects
/// messages, the cheap Summary pass runs with `collect_messages == false`
/// and only keeps the extraction state (working directory, preview, shell).
pub(crate) struct FoldState {
    collect_messages: bool,
    pub messages: Vec<Message>,
    pub skipped: usize,
    pub preview: Option<String>,
    seen_instructions: HashSet<String>,
    cwd_structured: Option<String>,
    cwd_marker: Option<String>,
    cwd_heuristic: Option<String>,
    shell_explicit: Option<ShellKind>,
    shell_hints: String,
}

impl FoldState {
    pub fn new(collect_messages: bool) -> Self {
        Self {
            collect_messages,
            messages: Vec::new(),
            skipped: 0,
            preview: None,
            seen_instructions: HashSet::new(),
            cwd_structured: None,
            cwd_marker: None,
            cwd_heuristic: None,
            shell_explicit: None,
            shell_hints: String::new(),
        }
    }

    pub fn fold(&mut self, record: LineRecord, raw_line: &str) {
        match record {
            LineRecord::Malformed => self.skipped += 1,
            LineRecord::Typed(boxed) => match *boxed {
                TypedRecord::SessionMeta(meta) => {
                    // Mid-file envelope: absorb context, surface as meta.
                    if let Some(cwd) = &meta.payload.cwd {
                        self.note_structured_cwd(cwd);
                    }
                    if let Some(shell) = &meta.payload.shell {
                        self.note_shell_field(shell);
                    }
                    if let Some(instructions) = &meta.payload.instructions {
                        self.push_header_instructions(instructions);
                    }
                    self.push(
                        Role::Meta,
                        vec![MessageContent::tagged(
                            ContentKind::Meta,
                            raw_line.trim(),
                            "session_meta",
                        )],
                    );
                }
                TypedRecord::Message(message) => self.fold_message(message),
                TypedRecord::FunctionCall(call) => {
                    let args = match &call.arguments {
                        Some(Value::String(text)) => text.clone(),
                        Some(value) => value.to_string(),
                        None => String::new(),
                    };
                    let text = format!("{}({})", call.name, args);
                    self.push(
                        Role::Assistant,
                        vec![MessageContent::tagged(
                            ContentKind::ToolCall,
                            text,
                            "function_call",
                        )],
                    );
                }
                TypedRecord::FunctionCallOutput(output) => {
                    let text = match output.output {
                        Some(Value::String(text)) => text,
                        Some(value) => value.to_string(),
                        None => String::new(),
                    };
                    self.push(
                        Role::Tool,
                        vec![MessageContent::tagged(
                            ContentKind::ToolOutput,
                            text,
                            "function_call_output",
                        )],
                    );
                }
                TypedRecord::Reasoning(reasoning) => {
                    self.push(
                        Role::Assistant,
                        vec![MessageContent::new(
                            ContentKind::Reasoning,
                            reasoning_text(&reasoning),
                        )],
                    );
                }
                TypedRecord::State(state) => {
                    if let Some(cwd) = &state.cwd {
                        self.note_structured_cwd(cwd);
                    }
                    self.push(
                        Role::Meta,
                        vec![MessageContent::tagged(
                            ContentKind::State,
                            raw_line.trim(),
                            "state",
                        )],
                    );
                }
            },
            LineRecord::HeaderLike(value) => {
                if let Some(cwd) = value.get("cwd").and_then(|v| v.as_str()) {
                    self.note_structured_cwd(cwd);
                }
                self.push(
                    Role::Meta,
                    vec![MessageContent::tagged(
                        ContentKind::Meta,
                        raw_line.trim(),
                        "header",
                    )],
                );
            }
            LineRecord::Unknown(_) => {
                self.push(
                    Role::Meta,
                    vec![MessageContent::new(ContentKind::Unknown, raw_line.trim())],
                );
            }
        }
    }

    fn fold_message(&mut self, message: MessageRecord) {
        let role = map_role(&message.role);
        let texts: Vec<String> = match message.content {
            ContentField::Text(text) => vec![text],
            ContentField::Parts(parts) => parts
                .into_iter()
                .filter_map(|part| match part {
                    ContentPart::InputText { text }
                    | ContentPart::OutputText { text }
                    | ContentPart::Text { text } => Some(text),
                    ContentPart::Unknown => None,
                })
                .collect(),
        };

        let mut items = Vec::new();
        for text in texts {
            for segment in split_tagged(&text) {
                match segment {
                    Segment::Instructions(inner) => {
                        if self.seen_instructions.insert(normalize_for_dedup(&inner)) {
                            items.push(MessageContent::tagged(
                                ContentKind::Instructions,
                                inner,
                                "instructions",
                            ));
                        }
                    }
                    Segment::Environment(inner) => {
                        self.add_shell_hint(&inner);
                        self.absorb_text_for_cwd(&inner);
                        items.push(MessageContent::tagged(
                            ContentKind::Environment,
                            inner,
                            "environment_context",
                        ));
                    }
                    Segment::Plain(inner) => {
                        self.absorb_text_for_cwd(&inner);
                        if role == Role::User {
                            self.note_preview(&inner);
                        }
                        items.push(MessageContent::new(ContentKind::Text, inner));
                    }
                }
            }
        }

        if !items.is_empty() {
            self.push(role, items);
        }
    }

    /// Header instructions become the leading system message; the normalized
    /// text is remembered so inline recurrences deduplicate against it.
    pub fn push_header_instructions(&mut self, instructions: &str) {
        let trimmed = instructions.trim();
        if trimmed.is_empty() {
            return;
        }
        if self.seen_instructions.insert(normalize_for_dedup(trimmed)) {
            self.push(
                Role::System,
                vec![MessageContent::tagged(
                    ContentKind::Instructions,
                    trimmed,
                    "instructions",
                )],
            );
        }
    }

    pub fn note_structured_cwd(&mut self, cwd: &str) {
        let trimmed = cwd.trim();
        if self.cwd_structured.is_none() && !trimmed.is_empty() {
            self.cwd_structured = Some(trimmed.to_string());
        }
    }

    pub fn note_shell_field(&mut self, value: &str) {
        if self.shell_explicit.is_none() {
            let kind = classify_shell_field(value);
            if kind != ShellKind::Unknown {
                self.shell_explicit = Some(kind);
            }
        }
    }

    pub fn add_shell_hint(&mut self, text: &str) {
        self.shell_hints.push_str(text);
        self.shell_hints.push('\n');
    }

    /// Tier-2/3 extraction over a piece of text: delimited tag or
    /// "Current working directory:" line first, absolute-path token as the
    /// last resort.
    pub fn absorb_text_for_cwd(&mut self, text: &str) {
        if self.cwd_marker.is_none() {
            self.cwd_marker = extract_cwd_marker(text);
        }
        if self.cwd_heuristic.is_none() {
            self.cwd_heuristic = first_absolute_path_token(text);
        }
    }

    pub fn has_cwd(&self) -> bool {
        self.cwd_structured.is_some() || self.cwd_marker.is_some()
    }

    /// Tier order: structured field, then marker, then path heuristic.
    pub fn resolved_cwd(&self) -> Option<String> {
        self.cwd_structured
            .clone()
            .or_else(|| self.cwd_marker.clone())
            .or_else(|| self.cwd_heuristic.clone())
    }

    pub fn shell(&self) -> ShellKind {
        self.shell_explicit
            .unwrap_or_else(|| classify_shell_text(&self.shell_hints))
    }

    fn note_preview(&mut self, text: &str) {
        if self.preview.is_some() {
            return;
        }
        let line = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !looks_like_path(line));
        if let Some(line) = line {
            self.preview = Some(truncate(line, PREVIEW_MAX_CHARS));
        }
    }

    fn push(&mut self, role: Role, content: Vec<MessageContent>) {
        if self.collect_messages {
            self.messages.push(Message { role, content });
        }
    }
}

fn map_role(role: &str) -> Role {
    match role.to_lowercase().as_str() {
        "user" | "human" => Role::User,
        "assistant" | "ai" | "model" => Role::Assistant,
        "system" => Role::System,
        "tool" => Role::Tool,
        _ => Role::Meta,
    }
}

fn reasoning_text(reasoning: &ReasoningRecord) -> String {
    if let Some(text) = &reasoning.text {
        return text.clone();
    }
    if let Some(Value::String(text)) = &reasoning.content {
        return text.clone();
    }
    if let Some(Value::Array(parts)) = &reasoning.summary {
        let joined: Vec<&str> = parts
            .iter()
            .filter_map(|part| {
                part.as_str()
                    .or_else(|| part.get("text").and_then(|t| t.as_str()))
            })
            .collect();
        if !joined.is_empty() {
            return joined.join("\n");
        }
    }
    reasoning
        .content
        .as_ref()
        .or(reasoning.summary.as_ref())
        .map(|value| value.to_string())
        .unwrap_or_default()
}
