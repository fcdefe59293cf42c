use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "console")]
use crate::{ConsoleRecognizer, ConsoleSynthesizer};
#[cfg(feature = "mock")]
use crate::{MockRecognizer, MockSynthesizer, VoiceInfo};
use crate::{SpeechRecognizer, SpeechSynthesizer};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VoiceBackendKind {
    Mock,
    Console,
}

impl FromStr for VoiceBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mock" => Ok(Self::Mock),
            "console" => Ok(Self::Console),
            other => Err(format!("unknown voice backend: {other}")),
        }
    }
}

pub fn new_recognizer_backend(kind: VoiceBackendKind) -> Result<Arc<dyn SpeechRecognizer>, String> {
    match kind {
        VoiceBackendKind::Mock => {
            #[cfg(feature = "mock")]
            {
                Ok(Arc::new(MockRecognizer::with_phrases(&[
                    "ligar motor",
                    "acender o led",
                    "parar o robô",
                ])))
            }
            #[cfg(not(feature = "mock"))]
            {
                Err("mock feature not enabled".into())
            }
        }
        VoiceBackendKind::Console => {
            #[cfg(feature = "console")]
            {
                Ok(Arc::new(ConsoleRecognizer::default()))
            }
            #[cfg(not(feature = "console"))]
            {
                Err("console feature not enabled".into())
            }
        }
    }
}

pub fn new_synthesizer_backend(
    kind: VoiceBackendKind,
) -> Result<Arc<dyn SpeechSynthesizer>, String> {
    match kind {
        VoiceBackendKind::Mock => {
            #[cfg(feature = "mock")]
            {
                let mock = MockSynthesizer::with_voices(vec![
                    VoiceInfo::new("mock-luciana", "Luciana", "pt-BR"),
                    VoiceInfo::new("mock-daniel", "Daniel", "pt-BR"),
                ]);
                mock.set_auto_complete(true);
                Ok(Arc::new(mock))
            }
            #[cfg(not(feature = "mock"))]
            {
                Err("mock feature not enabled".into())
            }
        }
        VoiceBackendKind::Console => {
            #[cfg(feature = "console")]
            {
                Ok(Arc::new(ConsoleSynthesizer::default()))
            }
            #[cfg(not(feature = "console"))]
            {
                Err("console feature not enabled".into())
            }
        }
    }
}
