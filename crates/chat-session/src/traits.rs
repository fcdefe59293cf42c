use async_trait::async_trait;

use crate::{ChatReply, ChatRequest, Result};

/// Remote AI chat endpoint.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply>;
}
