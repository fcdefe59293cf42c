use thiserror::Error;

pub type Result<T, E = SynthesisError> = core::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    #[error("microphone permission denied")]
    PermissionDenied,
    #[error("microphone not found")]
    MicrophoneUnavailable,
    #[error("no speech detected")]
    NoSpeechDetected,
    #[error("network error during speech recognition")]
    NetworkError,
    #[error("already listening")]
    AlreadyListening,
    #[error("speech recognition not supported on this platform")]
    Unsupported,
    #[error("unknown speech recognition error: {0}")]
    Unknown(String),
}

impl RecognitionError {
    /// Map a platform error code (Web Speech naming) onto the taxonomy.
    pub fn from_platform_code(code: &str) -> Self {
        match code {
            "not-allowed" | "service-not-allowed" => Self::PermissionDenied,
            "audio-capture" => Self::MicrophoneUnavailable,
            "no-speech" => Self::NoSpeechDetected,
            "network" => Self::NetworkError,
            other => Self::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
    #[error("utterance interrupted")]
    Interrupted,
    #[error("speech synthesis not supported on this platform")]
    UnsupportedPlatform,
}
