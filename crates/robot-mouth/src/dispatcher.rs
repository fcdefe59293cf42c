//! Best-effort delivery of speech to the robot.
//!
//! Every operation degrades to `false` instead of returning an error: the
//! robot is an optional accessory and must never block the chat.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};
use voice_local::text::sanitize_for_speech;

use crate::{
    AttemptOutcome, DispatchAttempt, DispatchReport, HttpTransport, Result, RobotMouthConfig,
    RobotVoiceConfig, SpeakRequest, SpeechTransport,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Word count at `words_per_minute`, clamped to `[min, max]`.
pub fn estimate_speech_duration(
    text: &str,
    words_per_minute: f64,
    min: Duration,
    max: Duration,
) -> Duration {
    let words = text.split_whitespace().count() as f64;
    let wpm = if words_per_minute > 0.0 { words_per_minute } else { 150.0 };
    let max = max.max(min);
    // Out-of-range results (tiny wpm from a config file) saturate at `max`
    let estimate = Duration::try_from_secs_f64(words * 60.0 / wpm).unwrap_or(max);
    estimate.clamp(min, max)
}

pub struct RemoteSpeechDispatcher {
    transport: Arc<dyn SpeechTransport>,
    config: RobotMouthConfig,
    speaking_until: Mutex<Option<Instant>>,
    last_spoken: Mutex<Option<(String, RobotVoiceConfig)>>,
}

impl RemoteSpeechDispatcher {
    pub fn new(transport: Arc<dyn SpeechTransport>, config: RobotMouthConfig) -> Self {
        Self {
            transport,
            config,
            speaking_until: Mutex::new(None),
            last_spoken: Mutex::new(None),
        }
    }

    /// Dispatcher talking to the device over HTTP.
    pub fn http(config: RobotMouthConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    pub fn config(&self) -> &RobotMouthConfig {
        &self.config
    }

    /// True when the device answered the health probe in time.
    pub async fn check_connection(&self) -> bool {
        match timeout(self.config.health_timeout(), self.transport.health()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!(error = %e, "robot health probe failed");
                false
            }
            Err(_) => {
                debug!("robot health probe timed out");
                false
            }
        }
    }

    pub async fn dispatch(&self, text: &str, voice: &RobotVoiceConfig) -> bool {
        self.dispatch_with_report(text, voice).await.delivered
    }

    /// Send `text` with up to `max_retries` attempts and linear backoff.
    ///
    /// Blank text, or text that sanitizes to nothing, is rejected without
    /// touching the network.
    pub async fn dispatch_with_report(&self, text: &str, voice: &RobotVoiceConfig) -> DispatchReport {
        let clean = sanitize_for_speech(text);
        if text.trim().is_empty() || clean.is_empty() {
            warn!("nothing speakable to send to the robot");
            return DispatchReport::rejected(clean);
        }

        let request = SpeakRequest::new(clean.clone(), voice.clamped(), self.config.source.clone());
        let max_attempts = self.config.max_retries.max(1);
        let mut attempts = Vec::with_capacity(max_attempts as usize);

        for attempt_number in 1..=max_attempts {
            let outcome =
                match timeout(self.config.request_timeout(), self.transport.speak(&request)).await {
                    Ok(Ok(())) => AttemptOutcome::Success,
                    Ok(Err(e)) => {
                        warn!(attempt = attempt_number, error = %e, "robot speak attempt failed");
                        AttemptOutcome::NetworkError
                    }
                    Err(_) => {
                        warn!(attempt = attempt_number, "robot speak attempt timed out");
                        AttemptOutcome::Timeout
                    }
                };
            attempts.push(DispatchAttempt {
                attempt_number,
                outcome,
            });

            if outcome == AttemptOutcome::Success {
                let estimate = self.estimate_speech_duration(&clean);
                *lock(&self.speaking_until) = Some(Instant::now() + estimate);
                *lock(&self.last_spoken) = Some((text.to_string(), *voice));
                info!(
                    attempt = attempt_number,
                    estimate_ms = estimate.as_millis() as u64,
                    "robot is speaking"
                );
                return DispatchReport {
                    text: clean,
                    delivered: true,
                    attempts,
                    estimated_duration: Some(estimate),
                };
            }

            if attempt_number < max_attempts {
                let delay = self.backoff_delay(attempt_number);
                debug!(delay_ms = delay.as_millis() as u64, "retrying robot speak");
                sleep(delay).await;
            }
        }

        *lock(&self.speaking_until) = None;
        warn!(attempts = attempts.len(), "robot unreachable, speech dropped");
        DispatchReport {
            text: clean,
            delivered: false,
            attempts,
            estimated_duration: None,
        }
    }

    /// Ask the device to stop talking.
    pub async fn stop(&self) -> bool {
        match timeout(self.config.request_timeout(), self.transport.stop()).await {
            Ok(Ok(())) => {
                *lock(&self.speaking_until) = None;
                info!("robot speech stopped");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "robot stop failed");
                false
            }
            Err(_) => {
                warn!("robot stop timed out");
                false
            }
        }
    }

    /// Send the last successfully dispatched text again.
    pub async fn repeat_last(&self) -> bool {
        let last = lock(&self.last_spoken).clone();
        match last {
            Some((text, voice)) => self.dispatch(&text, &voice).await,
            None => false,
        }
    }

    pub fn last_spoken_text(&self) -> Option<String> {
        lock(&self.last_spoken).as_ref().map(|(text, _)| text.clone())
    }

    pub fn estimate_speech_duration(&self, text: &str) -> Duration {
        estimate_speech_duration(
            text,
            self.config.words_per_minute,
            Duration::from_millis(self.config.min_speech_ms),
            Duration::from_millis(self.config.max_speech_ms),
        )
    }

    /// Advisory only: the device never reports completion, so this is the
    /// estimate window started by the last successful dispatch.
    pub fn is_probably_speaking(&self) -> bool {
        lock(&self.speaking_until).is_some_and(|until| Instant::now() < until)
    }

    fn backoff_delay(&self, attempt_number: u32) -> Duration {
        self.config.retry_base_delay() * attempt_number
    }
}
