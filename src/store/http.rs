use crate::cli::Args;
use crate::error::ChatError;
use crate::models::chat::{ Conversation, MessageDraft, User };
use crate::store::ConversationStore;
use async_trait::async_trait;
use reqwest::{ Client as HttpClient, StatusCode };
use std::time::Duration;

pub struct HttpConversationStore {
    http: HttpClient,
    base_url: String,
}

impl HttpConversationStore {
    pub fn new(args: &Args) -> Result<Self, ChatError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(args.request_timeout_secs))
            .build()
            .map_err(store_err)?;

        Ok(Self {
            http,
            base_url: args.store_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn store_err(e: reqwest::Error) -> ChatError {
    ChatError::Store(e.to_string())
}

#[async_trait]
impl ConversationStore for HttpConversationStore {
    async fn start_conversation(
        &self,
        user_id: &str,
        draft: &MessageDraft
    ) -> Result<Conversation, ChatError> {
        let resp = self.http
            .post(self.url("/v1/new"))
            .query(&[("user_id", user_id)])
            .json(draft)
            .send().await
            .map_err(store_err)?
            .error_for_status()
            .map_err(store_err)?;

        resp.json::<Conversation>().await.map_err(store_err)
    }

    async fn continue_conversation(
        &self,
        conversation_id: &str,
        draft: &MessageDraft
    ) -> Result<Conversation, ChatError> {
        let resp = self.http
            .post(self.url("/v1/conversations"))
            .query(&[("conversation_id", conversation_id)])
            .json(draft)
            .send().await
            .map_err(store_err)?
            .error_for_status()
            .map_err(store_err)?;

        resp.json::<Conversation>().await.map_err(store_err)
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, ChatError> {
        let resp = self.http
            .get(self.url("/v1/conversations"))
            .query(&[("user_id", user_id)])
            .send().await
            .map_err(store_err)?;

        // The store answers 404 when the user has no conversations yet.
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let resp = resp.error_for_status().map_err(store_err)?;
        resp.json::<Vec<Conversation>>().await.map_err(store_err)
    }

    async fn user_by_name(&self, user_name: &str) -> Result<User, ChatError> {
        let resp = self.http
            .get(self.url("/v1/name"))
            .query(&[("user_name", user_name)])
            .send().await
            .map_err(store_err)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ChatError::UserNotFound(user_name.to_string()));
        }

        let resp = resp.error_for_status().map_err(store_err)?;
        resp.json::<User>().await.map_err(store_err)
    }
}
