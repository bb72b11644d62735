use crate::error::ChatError;
use crate::models::chat::{ Conversation, Role };
use crate::store::ConversationStore;
use chrono::{ DateTime, Utc };
use log::info;
use std::sync::Arc;

/// How many characters of the first user message make up a derived label.
const LABEL_MAX_CHARS: usize = 40;

/// A conversation as shown in the history sidebar: derived labels plus
/// the full conversation, so selecting an entry resumes it without
/// another round-trip.
#[derive(Clone, Debug)]
pub struct ConversationEntry {
    pub label: String,
    pub date_label: String,
    pub conversation: Conversation,
}

pub struct HistoryBrowser {
    store: Arc<dyn ConversationStore>,
}

impl HistoryBrowser {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    /// Fetch all conversations owned by `user_id`. Failures are
    /// returned to the caller to surface a retry affordance; nothing
    /// else is blocked by a failed listing.
    pub async fn list(&self, user_id: &str) -> Result<Vec<ConversationEntry>, ChatError> {
        let conversations = self.store.list_conversations(user_id).await?;
        info!("Retrieved {} conversations for user {}", conversations.len(), user_id);

        let now = Utc::now();
        Ok(conversations
            .into_iter()
            .map(|conversation| ConversationEntry {
                label: display_label(&conversation),
                date_label: date_label(conversation.created_at, now),
                conversation,
            })
            .collect())
    }
}

/// Title if present, else the first user message truncated to 40
/// characters, else a fallback for an empty conversation.
pub fn display_label(conversation: &Conversation) -> String {
    if let Some(title) = conversation.title.as_deref() {
        if !title.is_empty() {
            return title.to_string();
        }
    }

    if let Some(first) = conversation.messages.iter().find(|m| m.role == Role::User) {
        if first.content.chars().count() > LABEL_MAX_CHARS {
            let prefix: String = first.content.chars().take(LABEL_MAX_CHARS).collect();
            return format!("{}...", prefix);
        }
        return first.content.clone();
    }

    "New Conversation".to_string()
}

/// Relative date label for a history entry.
pub fn date_label(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let created = created_at.date_naive();
    let today = now.date_naive();

    if created == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(created) {
        "Yesterday".to_string()
    } else {
        created_at.format("%-m/%-d/%Y").to_string()
    }
}
