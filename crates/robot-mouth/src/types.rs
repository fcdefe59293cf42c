use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use voice_local::SpeechConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotMouthConfig {
    /// Base of the device API; `/health`, `/speak` and `/stop` are appended
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub health_timeout_ms: u64,
    pub max_retries: u32,
    /// Delay after failed attempt `n` is `n * retry_base_delay_ms`
    pub retry_base_delay_ms: u64,
    pub words_per_minute: f64,
    pub min_speech_ms: u64,
    pub max_speech_ms: u64,
    pub source: String,
    pub user_agent: String,
}

impl Default for RobotMouthConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000/api".to_string(),
            request_timeout_ms: 5_000,
            health_timeout_ms: 5_000,
            max_retries: 3,
            retry_base_delay_ms: 1_000,
            words_per_minute: 150.0,
            min_speech_ms: 2_000,
            max_speech_ms: 20_000,
            source: "edu-ardu-frontend".to_string(),
            user_agent: "EduArdu-Frontend/1.0".to_string(),
        }
    }
}

impl RobotMouthConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Voice parameters forwarded to the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotVoiceConfig {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for RobotVoiceConfig {
    fn default() -> Self {
        Self {
            rate: 0.85,
            pitch: 0.8,
            volume: 1.0,
        }
    }
}

impl RobotVoiceConfig {
    /// Same bounds as local speech output.
    pub fn clamped(self) -> Self {
        let config = SpeechConfig {
            rate: self.rate,
            pitch: self.pitch,
            volume: self.volume,
            ..Default::default()
        }
        .clamped();
        Self {
            rate: config.rate,
            pitch: config.pitch,
            volume: config.volume,
        }
    }
}

impl From<&SpeechConfig> for RobotVoiceConfig {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            rate: config.rate,
            pitch: config.pitch,
            volume: config.volume,
        }
    }
}

/// Body of `POST /speak`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
    pub config: RobotVoiceConfig,
    pub timestamp: String,
    pub source: String,
}

impl SpeakRequest {
    pub fn new(text: impl Into<String>, config: RobotVoiceConfig, source: impl Into<String>) -> Self {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        Self {
            text: text.into(),
            config,
            timestamp,
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    NetworkError,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchAttempt {
    pub attempt_number: u32,
    pub outcome: AttemptOutcome,
}

/// Result of one dispatch request across all of its attempts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    /// Sanitized text that was (or would have been) sent
    pub text: String,
    pub delivered: bool,
    pub attempts: Vec<DispatchAttempt>,
    /// Advisory "still talking" window; only set when delivered
    pub estimated_duration: Option<Duration>,
}

impl DispatchReport {
    pub(crate) fn rejected(text: String) -> Self {
        Self {
            text,
            delivered: false,
            attempts: Vec::new(),
            estimated_duration: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speak_request_wire_format() {
        let req = SpeakRequest::new("Motor ligado!", RobotVoiceConfig::default(), "edu-ardu-frontend");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["text"], "Motor ligado!");
        assert_eq!(json["source"], "edu-ardu-frontend");
        assert_eq!(json["config"]["volume"], 1.0);
        assert!(OffsetDateTime::parse(json["timestamp"].as_str().unwrap(), &Rfc3339).is_ok());
    }

    #[test]
    fn test_robot_voice_config_clamped() {
        let config = RobotVoiceConfig {
            rate: 4.0,
            pitch: -1.0,
            volume: 0.5,
        }
        .clamped();
        assert_eq!(config.rate, 2.0);
        assert_eq!(config.pitch, 0.0);
        assert_eq!(config.volume, 0.5);
    }

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config: RobotMouthConfig =
            serde_json::from_str(r#"{"base_url": "http://robot.local/api", "max_retries": 5}"#)
                .unwrap();
        assert_eq!(config.base_url, "http://robot.local/api");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.min_speech_ms, 2_000);
    }
}
