use super::{ApiClient, ApiError, Page};
use serde::{Deserialize, Serialize};

/// Route prefix of the assistant module, relative to the API base URL.
pub const AGNO_PREFIX: &str = "/agno";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: u64,
    pub assistant_id: u64,
    pub title: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub conversation_id: u64,
    /// `user` or `assistant`.
    pub role: String,
    pub content: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewConversation {
    pub assistant_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<u64>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for ConversationQuery {
    fn default() -> Self {
        Self {
            assistant_id: None,
            page: 1,
            page_size: 10,
        }
    }
}

#[derive(Debug, Serialize)]
struct TitleBody<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct ContentBody<'a> {
    content: &'a str,
}

impl ApiClient {
    pub async fn list_conversations(&self, query: &ConversationQuery) -> Result<Page<Conversation>, ApiError> {
        let resp = self
            .get::<Vec<Conversation>, _>(&format!("{AGNO_PREFIX}/conversations"), query)
            .await?;
        Ok(resp.into_page())
    }

    pub async fn create_conversation(&self, new: &NewConversation) -> Result<Conversation, ApiError> {
        self.post(&format!("{AGNO_PREFIX}/conversations"), new)
            .await?
            .into_data()
    }

    pub async fn update_conversation(&self, conversation_id: u64, title: &str) -> Result<Conversation, ApiError> {
        self.put(
            &format!("{AGNO_PREFIX}/conversations/{conversation_id}"),
            &TitleBody { title },
        )
        .await?
        .into_data()
    }

    /// The backend answers with an empty envelope; only its code matters.
    pub async fn delete_conversation(&self, conversation_id: u64) -> Result<(), ApiError> {
        self.delete::<serde_json::Value>(&format!("{AGNO_PREFIX}/conversations/{conversation_id}"))
            .await?;
        Ok(())
    }

    pub async fn conversation_messages(&self, conversation_id: u64) -> Result<Vec<Message>, ApiError> {
        let resp = self
            .get::<Vec<Message>, _>(
                &format!("{AGNO_PREFIX}/conversations/{conversation_id}/messages"),
                &(),
            )
            .await?;
        Ok(resp.data.unwrap_or_default())
    }

    /// Non-streaming chat; returns the backend's reply object as-is.
    pub async fn send_message(&self, conversation_id: u64, content: &str) -> Result<serde_json::Value, ApiError> {
        self.post(
            &format!("{AGNO_PREFIX}/conversations/{conversation_id}/chat"),
            &ContentBody { content },
        )
        .await?
        .into_data()
    }
}
