use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in a conversation. Ids and timestamps are assigned by the
/// conversation store; messages are immutable once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Insertion order equals chronological order.
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(alias = "username")]
    pub name: String,
}

/// Body sent to the store when starting or continuing a conversation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageDraft {
    pub content: String,
    pub role: Role,
}

impl MessageDraft {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            role: Role::User,
        }
    }
}

/// Wire record the relay accepts and forwards unchanged.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthQuery {
    pub symptoms: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_context: Option<String>,
}

/// Whatever the external LLM service answered. The relay imposes no
/// schema beyond "valid JSON or failure".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HealthResponse(pub serde_json::Value);
