use serde_json::Value;

/// Messages longer than this many characters go over the chunked-POST
/// transport; a GET query string is not a safe place for them.
pub const DEFAULT_PUSH_THRESHOLD: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// `None` and `Some(0)` are rejected before any I/O.
    pub conversation_id: Option<u64>,
    /// Absent content is sent as the empty string.
    pub content: Option<String>,
}

impl ChatRequest {
    pub fn new(conversation_id: u64, content: impl Into<String>) -> Self {
        Self {
            conversation_id: Some(conversation_id),
            content: Some(content.into()),
        }
    }

    pub(crate) fn conversation(&self) -> Option<u64> {
        self.conversation_id.filter(|id| *id != 0)
    }

    pub(crate) fn content(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// GET with the message in the query string, answered with server-sent events.
    Push,
    /// POST with a JSON body, answered with newline-delimited JSON.
    ChunkedPost,
}

impl TransportKind {
    pub fn select(content: &str, push_threshold: usize) -> Self {
        if content.chars().count() > push_threshold {
            TransportKind::ChunkedPost
        } else {
            TransportKind::Push
        }
    }
}

/// One decoded record from the backend.
///
/// The backend sends `{ "code", "msg", "data": { "content", "done" } }`, but any
/// JSON value is accepted; only `data.done` drives the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEvent {
    raw: Value,
}

impl ChatEvent {
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s).map(|raw| Self { raw })
    }

    pub fn is_done(&self) -> bool {
        self.raw
            .get("data")
            .and_then(|d| d.get("done"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn code(&self) -> Option<i64> {
        self.raw.get("code").and_then(Value::as_i64)
    }

    pub fn msg(&self) -> Option<&str> {
        self.raw.get("msg").and_then(Value::as_str)
    }

    /// Incremental answer text (`data.content`).
    pub fn content(&self) -> Option<&str> {
        self.raw
            .get("data")
            .and_then(|d| d.get("content"))
            .and_then(Value::as_str)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }
}
