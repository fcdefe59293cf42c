use serde::{Deserialize, Serialize};

use crate::{SpeechRecognizer, SpeechSynthesizer};

pub const RATE_MIN: f32 = 0.1;
pub const RATE_MAX: f32 = 2.0;
pub const PITCH_MIN: f32 = 0.0;
pub const PITCH_MAX: f32 = 2.0;
pub const VOLUME_MIN: f32 = 0.0;
pub const VOLUME_MAX: f32 = 1.0;

/// Which speech capabilities the host platform exposes.
///
/// Taken once when the controllers are built and never updated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceCapabilitySupport {
    pub recognition_available: bool,
    pub synthesis_available: bool,
}

impl VoiceCapabilitySupport {
    pub fn detect(recognizer: &dyn SpeechRecognizer, synthesizer: &dyn SpeechSynthesizer) -> Self {
        Self {
            recognition_available: recognizer.is_available(),
            synthesis_available: synthesizer.is_available(),
        }
    }

    pub fn full(&self) -> bool {
        self.recognition_available && self.synthesis_available
    }
}

/// Voice parameters used for every utterance.
///
/// Fields are kept inside `RATE_*`, `PITCH_*` and `VOLUME_*` by
/// [`SpeechConfig::apply`] and [`SpeechConfig::clamped`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub language: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub selected_voice_id: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        // Slower and lower than the engine defaults: the robot talks to children
        Self {
            language: "pt-BR".to_string(),
            rate: 0.9,
            pitch: 0.8,
            volume: 1.0,
            selected_voice_id: None,
        }
    }
}

impl SpeechConfig {
    /// Apply a partial update. Out-of-range numbers are clamped; NaN leaves
    /// the previous value in place.
    pub fn apply(&mut self, update: &SpeechConfigUpdate) {
        if let Some(rate) = update.rate {
            self.rate = clamp_or(rate, RATE_MIN, RATE_MAX, self.rate);
        }
        if let Some(pitch) = update.pitch {
            self.pitch = clamp_or(pitch, PITCH_MIN, PITCH_MAX, self.pitch);
        }
        if let Some(volume) = update.volume {
            self.volume = clamp_or(volume, VOLUME_MIN, VOLUME_MAX, self.volume);
        }
        if let Some(language) = &update.language {
            self.language = language.clone();
        }
        if let Some(voice_id) = &update.voice_id {
            self.selected_voice_id = Some(voice_id.clone());
        }
    }

    /// Bring a config loaded from disk back inside the documented ranges.
    pub fn clamped(mut self) -> Self {
        let defaults = Self::default();
        self.rate = clamp_or(self.rate, RATE_MIN, RATE_MAX, defaults.rate);
        self.pitch = clamp_or(self.pitch, PITCH_MIN, PITCH_MAX, defaults.pitch);
        self.volume = clamp_or(self.volume, VOLUME_MIN, VOLUME_MAX, defaults.volume);
        self
    }
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

/// Partial update for [`SpeechConfig`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechConfigUpdate {
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
    pub language: Option<String>,
    pub voice_id: Option<String>,
}

/// Per-call overrides for a single utterance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeechOptions {
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
    pub voice_id: Option<String>,
}

/// One request handed to the synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechUtterance {
    pub text: String,
    pub config: SpeechConfig,
    pub voice: Option<VoiceInfo>,
}

/// A voice as enumerated by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
    /// BCP 47 tag as reported by the platform, e.g. `pt-BR` or `pt_BR`
    pub language: String,
}

impl VoiceInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            language: language.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceGender {
    Masculine,
    Feminine,
    Unknown,
}

/// Target used when ranking the platform voices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub language: String,
    pub gender: VoiceGender,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            language: "pt-BR".to_string(),
            gender: VoiceGender::Masculine,
        }
    }
}

/// A voice listed for manual selection, with its guessed gender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceListing {
    pub voice: VoiceInfo,
    pub gender: VoiceGender,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub language: String,
    /// Keep capturing across pauses. Off: the session ends on the first pause.
    pub continuous: bool,
    pub interim_results: bool,
    pub max_alternatives: u32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: "pt-BR".to_string(),
            continuous: false,
            interim_results: true,
            max_alternatives: 1,
        }
    }
}

/// Progress of the active listening session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListeningSession {
    pub is_active: bool,
    pub interim_text: String,
    pub final_text: String,
}

/// Events a recognizer backend pushes while a session is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    Result { transcript: String, is_final: bool },
    /// Platform error code, e.g. `not-allowed` or `no-speech`
    Error(String),
    End,
}

/// Events a synthesizer backend pushes for one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisEvent {
    Started,
    Ended,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechState {
    Idle,
    Speaking,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceOutputStatus {
    pub synthesis_available: bool,
    pub state: SpeechState,
    pub voice_name: Option<String>,
    pub language: String,
}
