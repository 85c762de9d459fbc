use reqwest::StatusCode;

/// Failures surfaced by a chat stream.
///
/// Every variant except [`ChatError::Decode`] ends the stream.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("invalid conversation id")]
    InvalidConversation,

    #[error("failed to build chat endpoint URL")]
    Url(#[from] url::ParseError),

    #[error("failed to open chat stream")]
    Connect(#[source] reqwest::Error),

    #[error("chat stream returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("chat stream read failed")]
    Read(#[source] reqwest::Error),

    #[error("event stream closed before completion")]
    Disconnected,

    #[error("failed to decode chat event: {line}")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ChatError {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChatError::Decode { .. })
    }
}
