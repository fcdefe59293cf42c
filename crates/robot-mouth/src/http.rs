//! reqwest client for the robot voice device.

use async_trait::async_trait;
use tracing::debug;

use crate::{Result, RobotMouthConfig, SpeakRequest, SpeechTransport, TransportError};

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &RobotMouthConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{base_url}: {e}")))?;
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

fn ensure_success(response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(TransportError::Status(status.as_u16()))
    }
}

#[async_trait]
impl SpeechTransport for HttpTransport {
    async fn health(&self) -> Result<()> {
        let response = self.client.get(self.url("health")).send().await?;
        ensure_success(&response)
    }

    async fn speak(&self, request: &SpeakRequest) -> Result<()> {
        let response = self
            .client
            .post(self.url("speak"))
            .json(request)
            .send()
            .await?;
        ensure_success(&response)?;
        // The device echoes a small JSON ack; its content is informational only
        if let Ok(ack) = response.json::<serde_json::Value>().await {
            debug!(%ack, "robot accepted speech");
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let response = self
            .client
            .post(self.url("stop"))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        ensure_success(&response)
    }
}
