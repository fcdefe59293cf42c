//! reqwest client for the AI chat backend.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{ChatApi, ChatApiConfig, ChatError, ChatReply, ChatRequest, Result};

/// Splits the configured timeout across the primary attempt and the
/// fallback, so the fallback still runs inside a caller's overall bound.
pub struct HttpChatApi {
    client: reqwest::Client,
    primary_url: String,
    fallback_url: Option<String>,
    attempt_timeout: Duration,
}

impl HttpChatApi {
    pub fn new(config: &ChatApiConfig) -> Result<Self> {
        let base = config.base_url.trim_end_matches('/');
        reqwest::Url::parse(base).map_err(|e| ChatError::Http(format!("{base}: {e}")))?;
        let client = reqwest::Client::builder().build()?;
        let fallback_url =
            (!config.fallback_path.is_empty()).then(|| join(base, &config.fallback_path));
        let attempts = if fallback_url.is_some() { 2 } else { 1 };
        Ok(Self {
            client,
            primary_url: join(base, &config.primary_path),
            fallback_url,
            attempt_timeout: config.timeout() / attempts,
        })
    }

    async fn post(&self, url: &str, request: &ChatRequest) -> Result<ChatReply> {
        debug!(url, "posting chat message");
        let response = self
            .client
            .post(url)
            .timeout(self.attempt_timeout)
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status(status.as_u16()));
        }
        Ok(response.json::<ChatReply>().await?)
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base, path.trim_start_matches('/'))
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply> {
        match self.post(&self.primary_url, request).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                let Some(fallback) = &self.fallback_url else {
                    return Err(e);
                };
                warn!(error = %e, "primary chat endpoint failed, trying fallback");
                self.post(fallback, request).await
            }
        }
    }
}
