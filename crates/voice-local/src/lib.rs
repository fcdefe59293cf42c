//! voice-local: speech input and output controllers over pluggable platform
//! backends, with mock and console backends for hosts without a speech engine.

mod types;
pub use types::{
    ListeningSession, RecognitionConfig, RecognitionEvent, SpeechConfig, SpeechConfigUpdate,
    SpeechOptions, SpeechState, SpeechUtterance, SynthesisEvent, VoiceCapabilitySupport,
    VoiceGender, VoiceInfo, VoiceListing, VoiceOutputStatus, VoiceProfile, PITCH_MAX, PITCH_MIN,
    RATE_MAX, RATE_MIN, VOLUME_MAX, VOLUME_MIN,
};

mod error;
pub use error::{RecognitionError, Result, SynthesisError};

mod traits;
pub use traits::{RecognitionEventSender, SpeechRecognizer, SpeechSynthesizer, SynthesisEventSender};

pub mod text;
pub mod voices;

mod input;
pub use input::{InterimSubscription, RecognitionResult, VoiceInputController};

mod output;
pub use output::VoiceOutputController;

#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "mock")]
pub use mock::{MockRecognizer, MockSynthesizer};

#[cfg(feature = "console")]
mod console;
#[cfg(feature = "console")]
pub use console::{ConsoleInput, ConsoleRecognizer, ConsoleSynthesizer};

pub mod plugin;
