use serde::Deserialize;
use serde_json::Value;

/// Record taxonomy for one log line, discriminated by `type`.
///
/// An unrecognized `type` (or a known `type` with an incompatible payload)
/// falls back to `Unknown` at the classification layer, which preserves the
/// raw JSON instead of dropping it.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum TypedRecord {
    SessionMeta(SessionMetaRecord),
    Message(MessageRecord),
    FunctionCall(FunctionCallRecord),
    FunctionCallOutput(FunctionCallOutputRecord),
    Reasoning(ReasoningRecord),
    State(StateRecord),
}

/// Modern header: identity nested under a typed envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct SessionMetaRecord {
    #[serde(default)]
    pub timestamp: Option<String>,
    pub payload: SessionMetaPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionMetaPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, alias = "workingDir")]
    pub cwd: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub shell: Option<String>,
    #[serde(default)]
    pub git: Option<Value>,
    #[serde(default)]
    pub originator: Option<String>,
}

/// Legacy header: bare `id` + `timestamp` pair at the top level of line 0.
#[derive(Debug, Deserialize)]
pub(crate) struct LegacyHeader {
    pub id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default, alias = "workingDir")]
    pub cwd: Option<String>,
    #[serde(default)]
    pub shell: Option<String>,
    #[serde(default)]
    pub git: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageRecord {
    pub role: String,
    #[serde(default)]
    pub content: ContentField,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `content` appears both as a bare string and as an array of typed parts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ContentField {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Default for ContentField {
    fn default() -> Self {
        ContentField::Parts(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentPart {
    InputText { text: String },
    OutputText { text: String },
    Text { text: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FunctionCallRecord {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FunctionCallOutputRecord {
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReasoningRecord {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub summary: Option<Value>,
    #[serde(default)]
    pub content: Option<Value>,
}

/// State snapshots carry runtime context; `cwd` is the field this index
/// cares about, the rest is preserved for display.
#[derive(Debug, Deserialize)]
pub(crate) struct StateRecord {
    #[serde(default, alias = "workingDir")]
    pub cwd: Option<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}
