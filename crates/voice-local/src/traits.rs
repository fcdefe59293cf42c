use tokio::sync::mpsc::UnboundedSender;

use crate::{
    RecognitionConfig, RecognitionError, RecognitionEvent, SpeechUtterance, SynthesisError,
    SynthesisEvent, VoiceInfo,
};

pub type RecognitionEventSender = UnboundedSender<RecognitionEvent>;
pub type SynthesisEventSender = UnboundedSender<SynthesisEvent>;

/// Platform speech-recognition capability.
///
/// `start` returns as soon as capture is requested; progress arrives on the
/// event sender. Backends have no queue of their own, so callers must not
/// start a second session before the first one ended.
pub trait SpeechRecognizer: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    /// Ask the user for microphone access. Returns the grant.
    fn request_microphone_permission(&self) -> bool {
        true
    }

    fn start(
        &self,
        config: &RecognitionConfig,
        events: RecognitionEventSender,
    ) -> Result<(), RecognitionError>;

    /// Stop capturing; pending audio may still yield a final result.
    fn stop(&self);
}

/// Platform speech-synthesis capability.
pub trait SpeechSynthesizer: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    /// Voices known right now. Some platforms fill this list lazily.
    fn voices(&self) -> Vec<VoiceInfo>;

    fn speak(
        &self,
        utterance: &SpeechUtterance,
        events: SynthesisEventSender,
    ) -> Result<(), SynthesisError>;

    /// Drop whatever is playing. Backends may report the drop as an error
    /// event on the canceled utterance.
    fn cancel(&self);

    fn is_speaking(&self) -> bool;
}
