use crate::error::ChatError;
use crate::intake::compose_opening_message;
use crate::models::chat::{ Conversation, Message, MessageDraft, Role };
use crate::store::ConversationStore;
use chrono::Utc;
use log::{ info, warn };
use std::collections::BTreeMap;
use std::sync::Arc;

/// Client-observed lifecycle of one conversation view. A failed call
/// never leaves the session stuck: `ActiveWithError` keeps the last
/// good transcript and every operation remains retryable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    NoConversation,
    Active,
    ActiveWithError,
}

/// An outbound continue-request: the sequence number tagging it, the
/// conversation it targets, and the draft to submit.
#[derive(Clone, Debug)]
pub struct PendingSend {
    pub seq: u64,
    pub conversation_id: String,
    pub draft: MessageDraft,
}

/// Single-writer state container for one transcript.
///
/// Each continue-request is tagged with a monotonically increasing
/// sequence number; a response is applied only if its sequence number
/// is the highest applied so far, so a slow response can never
/// overwrite the state produced by a later one. Messages appended
/// optimistically are tracked per sequence number and rolled back on
/// failure.
pub struct TranscriptSession {
    store: Arc<dyn ConversationStore>,
    user_id: String,
    conversation_id: Option<String>,
    messages: Vec<Message>,
    phase: Phase,
    last_error: Option<String>,
    next_seq: u64,
    applied_seq: u64,
    /// seq -> local id of the optimistic message it appended.
    pending: BTreeMap<u64, String>,
}

impl TranscriptSession {
    pub fn new(store: Arc<dyn ConversationStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            conversation_id: None,
            messages: Vec::new(),
            phase: Phase::NoConversation,
            last_error: None,
            next_seq: 1,
            applied_seq: 0,
            pending: BTreeMap::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Start a conversation from the intake form. On success the
    /// session becomes `Active` with the store's message list; on
    /// failure it stays where it was so the caller can retry with the
    /// preserved input.
    pub async fn start(
        &mut self,
        symptoms: &str,
        additional_details: &str
    ) -> Result<(), ChatError> {
        let content = compose_opening_message(symptoms, additional_details)?;
        let draft = MessageDraft::user(content);

        let store = self.store.clone();
        match store.start_conversation(&self.user_id, &draft).await {
            Ok(conversation) => {
                info!("Started conversation {}", conversation.id);
                self.conversation_id = Some(conversation.id);
                self.messages = conversation.messages;
                self.phase = Phase::Active;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Load a conversation picked from the history browser. No network
    /// round-trip: the listing already carries full message bodies.
    pub fn resume(&mut self, conversation: Conversation) {
        self.conversation_id = Some(conversation.id);
        self.messages = conversation.messages;
        self.phase = Phase::Active;
        self.last_error = None;
        self.pending.clear();
    }

    /// Validate a new message, append it optimistically and hand back
    /// the tagged request to issue. The local entry carries a
    /// timestamp-derived id until the store's authoritative list
    /// replaces it.
    pub fn prepare_send(&mut self, content: &str) -> Result<PendingSend, ChatError> {
        let conversation_id = self.conversation_id
            .clone()
            .ok_or(ChatError::NoConversation)?;

        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let now = Utc::now();
        let local_id = format!("{}-{}", now.timestamp_millis(), seq);
        self.messages.push(Message {
            id: local_id.clone(),
            role: Role::User,
            content: content.to_string(),
            created_at: now,
        });
        self.pending.insert(seq, local_id);

        Ok(PendingSend {
            seq,
            conversation_id,
            draft: MessageDraft::user(content),
        })
    }

    /// Apply a successful continue-response. Returns false when the
    /// response is stale (a higher-sequence response already applied)
    /// and was discarded.
    pub fn apply_success(&mut self, seq: u64, conversation: Conversation) -> bool {
        self.pending.remove(&seq);

        if seq <= self.applied_seq {
            warn!(
                "Discarding stale response for conversation {} (seq {} <= {})",
                conversation.id, seq, self.applied_seq
            );
            return false;
        }
        self.applied_seq = seq;

        // Replace the transcript with the authoritative list, keeping
        // optimistic entries of requests still in flight behind this one.
        let carry: Vec<Message> = self.messages
            .iter()
            .filter(|m| {
                self.pending.iter().any(|(pending_seq, id)| *pending_seq > seq && id == &m.id)
            })
            .cloned()
            .collect();

        self.conversation_id = Some(conversation.id);
        self.messages = conversation.messages;
        self.messages.extend(carry);
        self.phase = Phase::Active;
        self.last_error = None;
        true
    }

    /// Roll back the optimistic entry of a failed continue-request.
    /// The transcript returns to its pre-append state; no automatic
    /// retry.
    pub fn apply_failure(&mut self, seq: u64, error: &ChatError) {
        if let Some(local_id) = self.pending.remove(&seq) {
            self.messages.retain(|m| m.id != local_id);
        }
        self.phase = Phase::ActiveWithError;
        self.last_error = Some(error.to_string());
    }

    /// Submit a new message on the active conversation and reconcile
    /// the transcript with the store's reply.
    pub async fn send(&mut self, content: &str) -> Result<(), ChatError> {
        let pending = self.prepare_send(content)?;

        let store = self.store.clone();
        match store.continue_conversation(&pending.conversation_id, &pending.draft).await {
            Ok(conversation) => {
                self.apply_success(pending.seq, conversation);
                Ok(())
            }
            Err(e) => {
                self.apply_failure(pending.seq, &e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::User;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{ AtomicUsize, Ordering };

    struct MockStore {
        responses: Mutex<VecDeque<Result<Conversation, ChatError>>>,
        calls: AtomicUsize,
    }

    impl MockStore {
        fn scripted(responses: Vec<Result<Conversation, ChatError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn next_response(&self) -> Result<Conversation, ChatError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ChatError::Store("no scripted response".into())))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConversationStore for MockStore {
        async fn start_conversation(
            &self,
            _user_id: &str,
            _draft: &MessageDraft
        ) -> Result<Conversation, ChatError> {
            self.next_response()
        }

        async fn continue_conversation(
            &self,
            _conversation_id: &str,
            _draft: &MessageDraft
        ) -> Result<Conversation, ChatError> {
            self.next_response()
        }

        async fn list_conversations(
            &self,
            _user_id: &str
        ) -> Result<Vec<Conversation>, ChatError> {
            Err(ChatError::Store("not scripted".into()))
        }

        async fn user_by_name(&self, user_name: &str) -> Result<User, ChatError> {
            Err(ChatError::UserNotFound(user_name.to_string()))
        }
    }

    fn message(id: &str, role: Role, content: &str) -> Message {
        Message {
            id: id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    fn conversation(id: &str, messages: Vec<Message>) -> Conversation {
        Conversation {
            id: id.to_string(),
            user_id: "u1".to_string(),
            title: None,
            created_at: Utc::now(),
            messages,
        }
    }

    #[tokio::test]
    async fn empty_symptoms_never_reach_the_store() {
        let store = MockStore::scripted(vec![]);
        let mut session = TranscriptSession::new(store.clone(), "u1");

        let err = session.start("   ", "details").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptySymptoms));
        assert_eq!(store.calls(), 0);
        assert_eq!(session.phase(), Phase::NoConversation);
    }

    #[tokio::test]
    async fn start_transitions_to_active_with_store_list() {
        let reply = conversation("c1", vec![
            message("m1", Role::User, "I have a cough"),
            message("m2", Role::Assistant, "How long has it lasted?"),
        ]);
        let store = MockStore::scripted(vec![Ok(reply)]);
        let mut session = TranscriptSession::new(store, "u1");

        session.start("I have a cough", "").await.unwrap();
        assert_eq!(session.phase(), Phase::Active);
        assert_eq!(session.conversation_id(), Some("c1"));
        assert_eq!(session.messages().len(), 2);
        assert!(session.messages().iter().any(|m| m.content == "I have a cough"));
    }

    #[tokio::test]
    async fn start_failure_keeps_intake_state() {
        let store = MockStore::scripted(vec![Err(ChatError::Store("boom".into()))]);
        let mut session = TranscriptSession::new(store, "u1");

        session.start("I have a cough", "").await.unwrap_err();
        assert_eq!(session.phase(), Phase::NoConversation);
        assert!(session.last_error().is_some());
    }

    #[tokio::test]
    async fn send_replaces_transcript_with_authoritative_list() {
        let updated = conversation("c1", vec![
            message("m1", Role::User, "I have a cough"),
            message("m2", Role::Assistant, "How long?"),
            message("m3", Role::User, "three days"),
            message("m4", Role::Assistant, "See a doctor if it persists"),
        ]);
        let store = MockStore::scripted(vec![Ok(updated.clone())]);
        let mut session = TranscriptSession::new(store, "u1");
        session.resume(conversation("c1", vec![
            message("m1", Role::User, "I have a cough"),
            message("m2", Role::Assistant, "How long?"),
        ]));

        session.send("three days").await.unwrap();
        assert_eq!(session.phase(), Phase::Active);
        assert_eq!(session.messages(), updated.messages.as_slice());
    }

    #[tokio::test]
    async fn failed_send_rolls_back_the_optimistic_append() {
        let store = MockStore::scripted(vec![Err(ChatError::Store("timeout".into()))]);
        let mut session = TranscriptSession::new(store, "u1");
        session.resume(conversation("c1", vec![
            message("m1", Role::User, "I have a cough"),
            message("m2", Role::Assistant, "How long?"),
        ]));
        let before = session.messages().len();

        session.send("three days").await.unwrap_err();
        assert_eq!(session.messages().len(), before);
        assert_eq!(session.phase(), Phase::ActiveWithError);
        assert!(session.last_error().is_some());
    }

    #[tokio::test]
    async fn empty_message_never_reaches_the_store() {
        let store = MockStore::scripted(vec![]);
        let mut session = TranscriptSession::new(store.clone(), "u1");
        session.resume(conversation("c1", vec![]));

        let err = session.send("  ").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));
        assert_eq!(store.calls(), 0);
        assert_eq!(session.messages().len(), 0);
    }

    #[tokio::test]
    async fn send_without_a_conversation_fails() {
        let store = MockStore::scripted(vec![]);
        let mut session = TranscriptSession::new(store.clone(), "u1");

        let err = session.send("hello").await.unwrap_err();
        assert!(matches!(err, ChatError::NoConversation));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn optimistic_append_shows_immediately() {
        let store = MockStore::scripted(vec![]);
        let mut session = TranscriptSession::new(store, "u1");
        session.resume(conversation("c1", vec![]));

        session.prepare_send("three days").unwrap();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::User);
        assert_eq!(session.messages()[0].content, "three days");
    }

    #[tokio::test]
    async fn stale_response_is_discarded() {
        let store = MockStore::scripted(vec![]);
        let mut session = TranscriptSession::new(store, "u1");
        session.resume(conversation("c1", vec![
            message("m1", Role::User, "I have a cough"),
        ]));

        let first = session.prepare_send("first").unwrap();
        let second = session.prepare_send("second").unwrap();

        let newer = conversation("c1", vec![
            message("m1", Role::User, "I have a cough"),
            message("m2", Role::User, "first"),
            message("m3", Role::User, "second"),
            message("m4", Role::Assistant, "noted"),
        ]);
        assert!(session.apply_success(second.seq, newer.clone()));
        assert_eq!(session.messages(), newer.messages.as_slice());

        // The slower first response resolves last and must not win.
        let older = conversation("c1", vec![
            message("m1", Role::User, "I have a cough"),
            message("m2", Role::User, "first"),
        ]);
        assert!(!session.apply_success(first.seq, older));
        assert_eq!(session.messages(), newer.messages.as_slice());
    }

    #[tokio::test]
    async fn in_flight_optimistic_entries_survive_an_earlier_reply() {
        let store = MockStore::scripted(vec![]);
        let mut session = TranscriptSession::new(store, "u1");
        session.resume(conversation("c1", vec![]));

        let first = session.prepare_send("first").unwrap();
        let second = session.prepare_send("second").unwrap();

        let reply = conversation("c1", vec![
            message("m1", Role::User, "first"),
            message("m2", Role::Assistant, "noted"),
        ]);
        assert!(session.apply_success(first.seq, reply));

        // "second" is still in flight and stays visible at the tail.
        let contents: Vec<&str> = session.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "noted", "second"]);

        let final_reply = conversation("c1", vec![
            message("m1", Role::User, "first"),
            message("m2", Role::Assistant, "noted"),
            message("m3", Role::User, "second"),
            message("m4", Role::Assistant, "understood"),
        ]);
        assert!(session.apply_success(second.seq, final_reply.clone()));
        assert_eq!(session.messages(), final_reply.messages.as_slice());
    }
}
