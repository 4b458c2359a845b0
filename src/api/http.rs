use async_trait::async_trait;
use tracing::debug;

use super::error::{ApiError, ApiResult};
use super::types::{
    InitOrderRequest, InitOrderResponse, MarkReadResponse, Message, SendResponse, ThreadResponse,
    UnreadCounts,
};
use super::ChatApi;

/// HTTP implementation of [`ChatApi`] over the platform backend.
///
/// All five endpoints live under `{base_url}/chat`. Authentication is an
/// external concern; the client only carries an optional bearer token set by
/// the session layer.
#[derive(Clone)]
pub struct HttpChatApi {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpChatApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("rxchat/0.3")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn check_status(resp: reqwest::Response) -> ApiResult<reqwest::Response> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(ApiError::Status {
                status: resp.status().as_u16(),
            })
        }
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn fetch_thread(&self, thread_id: &str) -> ApiResult<Vec<Message>> {
        let url = self.url(&format!("/chat/{thread_id}"));
        let resp = self.authorize(self.client.get(&url)).send().await?;
        let body: ThreadResponse = Self::check_status(resp)?.json().await?;
        debug!(thread_id = %thread_id, count = body.messages.len(), "Fetched transcript");
        Ok(body.messages)
    }

    async fn init_order_thread(&self, request: &InitOrderRequest) -> ApiResult<String> {
        let url = self.url("/chat/init-order");
        let resp = self
            .authorize(self.client.post(&url))
            .json(request)
            .send()
            .await?;
        let body: InitOrderResponse = Self::check_status(resp)?.json().await?;
        debug!(order_id = %request.order_id, thread_id = %body.thread_id, "Thread resolved");
        Ok(body.thread_id)
    }

    async fn send_message(&self, thread_id: &str, content: &str) -> ApiResult<Message> {
        let url = self.url("/chat/send");
        let resp = self
            .authorize(self.client.post(&url))
            .json(&serde_json::json!({ "threadId": thread_id, "content": content }))
            .send()
            .await?;
        let body: SendResponse = Self::check_status(resp)?.json().await?;
        Ok(body.message)
    }

    async fn fetch_unread_counts(&self) -> ApiResult<UnreadCounts> {
        let url = self.url("/chat/unread-counts");
        let resp = self.authorize(self.client.get(&url)).send().await?;
        let body: UnreadCounts = Self::check_status(resp)?.json().await?;
        Ok(body)
    }

    async fn mark_thread_read(&self, thread_id: &str) -> ApiResult<()> {
        let url = self.url(&format!("/chat/thread/{thread_id}/mark-read"));
        let resp = self.authorize(self.client.put(&url)).send().await?;
        let body: MarkReadResponse = Self::check_status(resp)?.json().await?;
        if body.success {
            Ok(())
        } else {
            Err(ApiError::Rejected("mark-read not acknowledged"))
        }
    }
}
