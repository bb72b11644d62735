mod http;

pub use http::HttpConversationStore;

use crate::error::ChatError;
use crate::models::chat::{ Conversation, MessageDraft, User };
use async_trait::async_trait;

/// Client-side view of the external conversation store. The store is
/// the sole authority for conversation/message ids, timestamps and
/// ordering; callers replace their local transcript with whatever a
/// successful call returns.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create a conversation for `user_id` seeded with the opening
    /// message, returning it with the full message list.
    async fn start_conversation(
        &self,
        user_id: &str,
        draft: &MessageDraft
    ) -> Result<Conversation, ChatError>;

    /// Append a message to an existing conversation and return the
    /// updated conversation with the full message list.
    async fn continue_conversation(
        &self,
        conversation_id: &str,
        draft: &MessageDraft
    ) -> Result<Conversation, ChatError>;

    /// All conversations owned by `user_id`, with full message bodies.
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, ChatError>;

    /// Resolve a user by unique name.
    async fn user_by_name(&self, user_name: &str) -> Result<User, ChatError>;
}
