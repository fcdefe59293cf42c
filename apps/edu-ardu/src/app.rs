//! Composition root: every controller is built here and handed out by
//! reference.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chat_session::{ChatApi, ChatSession, HttpChatApi, TtsTarget};
use robot_mouth::{RemoteSpeechDispatcher, RobotVoiceConfig};
use serde::Serialize;
use tracing::info;
use voice_local::plugin::{new_recognizer_backend, new_synthesizer_backend, VoiceBackendKind};
use voice_local::{VoiceCapabilitySupport, VoiceInputController, VoiceOutputController, VoiceProfile};

use crate::config::AppConfig;

#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum TtsMode {
    Local,
    Robot,
    Off,
}

/// Snapshot of both voice controllers for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceStatus {
    pub recognition_available: bool,
    pub synthesis_available: bool,
    pub listening: bool,
    pub speaking: bool,
    pub robot_probably_speaking: bool,
    pub voice_name: Option<String>,
    pub language: String,
}

pub struct App {
    pub config: AppConfig,
    pub support: VoiceCapabilitySupport,
    pub input: Arc<VoiceInputController>,
    pub output: Arc<VoiceOutputController>,
    pub robot: Arc<RemoteSpeechDispatcher>,
    pub chat_api: Arc<dyn ChatApi>,
}

impl App {
    pub fn build(config: AppConfig) -> Result<Self> {
        let backend: VoiceBackendKind = config
            .voice_backend
            .parse()
            .map_err(|e: String| anyhow!(e))?;
        let recognizer = new_recognizer_backend(backend).map_err(|e| anyhow!(e))?;
        let synthesizer = new_synthesizer_backend(backend).map_err(|e| anyhow!(e))?;
        let support = VoiceCapabilitySupport::detect(recognizer.as_ref(), synthesizer.as_ref());

        let input = Arc::new(VoiceInputController::new(
            recognizer,
            config.recognition.clone(),
        ));
        let output = Arc::new(VoiceOutputController::new(
            synthesizer,
            config.speech.clone(),
            VoiceProfile::default(),
        ));
        output.refresh_voice();

        let robot = Arc::new(
            RemoteSpeechDispatcher::http(config.robot.clone())
                .context("configuring robot voice client")?,
        );
        let chat_api: Arc<dyn ChatApi> =
            Arc::new(HttpChatApi::new(&config.chat).context("configuring chat client")?);

        info!(
            backend = ?backend,
            recognition = support.recognition_available,
            synthesis = support.synthesis_available,
            "voice backends ready"
        );
        Ok(Self {
            config,
            support,
            input,
            output,
            robot,
            chat_api,
        })
    }

    pub fn tts_target(&self, mode: TtsMode) -> TtsTarget {
        match mode {
            TtsMode::Local => TtsTarget::Local(self.output.clone()),
            TtsMode::Robot => TtsTarget::Robot(self.robot.clone()),
            TtsMode::Off => TtsTarget::Disabled,
        }
    }

    /// Session whose robot dispatches use the configured speech parameters.
    pub fn chat_session(&self, mode: TtsMode) -> ChatSession {
        let session =
            ChatSession::new(self.chat_api.clone(), self.tts_target(mode), &self.config.chat);
        session.set_robot_voice(RobotVoiceConfig::from(&self.config.speech));
        session
    }

    pub fn voice_status(&self) -> VoiceStatus {
        let output = self.output.status();
        VoiceStatus {
            recognition_available: self.support.recognition_available,
            synthesis_available: self.support.synthesis_available,
            listening: self.input.is_listening(),
            speaking: output.state == voice_local::SpeechState::Speaking,
            robot_probably_speaking: self.robot.is_probably_speaking(),
            voice_name: output.voice_name,
            language: output.language,
        }
    }
}
