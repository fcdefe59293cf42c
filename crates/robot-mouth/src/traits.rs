use async_trait::async_trait;

use crate::{Result, SpeakRequest};

/// Wire access to the robot's voice device. Implementations report failures
/// as errors; the dispatcher owns timeouts, retries and the boolean policy.
#[async_trait]
pub trait SpeechTransport: Send + Sync {
    async fn health(&self) -> Result<()>;
    async fn speak(&self, request: &SpeakRequest) -> Result<()>;
    async fn stop(&self) -> Result<()>;
}
