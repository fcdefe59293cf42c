use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chat_session::ChatApiConfig;
use robot_mouth::RobotMouthConfig;
use serde::{Deserialize, Serialize};
use voice_local::{RecognitionConfig, SpeechConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `console` or `mock`
    pub voice_backend: String,
    pub chat: ChatApiConfig,
    pub robot: RobotMouthConfig,
    pub speech: SpeechConfig,
    pub recognition: RecognitionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            voice_backend: "console".to_string(),
            chat: ChatApiConfig::default(),
            robot: RobotMouthConfig::default(),
            speech: SpeechConfig::default(),
            recognition: RecognitionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read `path`, or write the defaults there when it does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("parsing config {}", path.display()))
        } else {
            let config = Self::default();
            config.save(path)?;
            Ok(config)
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }

    pub fn with_overrides(mut self, api_url: Option<String>, robot_url: Option<String>) -> Self {
        if let Some(url) = api_url {
            self.chat.base_url = url;
        }
        if let Some(url) = robot_url {
            self.robot.base_url = url;
        }
        self
    }
}
