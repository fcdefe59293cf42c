use std::collections::VecDeque;
use std::sync::Mutex;

use crate::input::lock;
use crate::{
    RecognitionConfig, RecognitionError, RecognitionEvent, RecognitionEventSender,
    SpeechRecognizer, SpeechSynthesizer, SpeechUtterance, SynthesisError, SynthesisEvent,
    SynthesisEventSender, VoiceInfo,
};

#[derive(Default)]
struct RecognizerState {
    unavailable: bool,
    permission_denied: bool,
    keep_open_on_stop: bool,
    scripts: VecDeque<Vec<RecognitionEvent>>,
    sender: Option<RecognitionEventSender>,
    starts: usize,
    stops: usize,
}

/// Scriptable recognizer. Each `start` plays the next queued script; with no
/// script queued the session stays open until [`MockRecognizer::emit`] or
/// `stop`.
#[derive(Default)]
pub struct MockRecognizer {
    state: Mutex<RecognizerState>,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recognizer that answers the first few sessions with canned phrases.
    pub fn with_phrases(phrases: &[&str]) -> Self {
        let mock = Self::new();
        for phrase in phrases {
            let mut script = vec![RecognitionEvent::Started];
            let words: Vec<&str> = phrase.split_whitespace().collect();
            for i in 1..words.len() {
                script.push(RecognitionEvent::Result {
                    transcript: words[..i].join(" "),
                    is_final: false,
                });
            }
            script.push(RecognitionEvent::Result {
                transcript: phrase.to_string(),
                is_final: true,
            });
            script.push(RecognitionEvent::End);
            mock.push_script(script);
        }
        mock
    }

    pub fn push_script(&self, events: Vec<RecognitionEvent>) {
        lock(&self.state).scripts.push_back(events);
    }

    /// Deliver an event to the most recent session.
    pub fn emit(&self, event: RecognitionEvent) {
        if let Some(tx) = &lock(&self.state).sender {
            let _ = tx.send(event);
        }
    }

    pub fn set_available(&self, available: bool) {
        lock(&self.state).unavailable = !available;
    }

    pub fn set_permission(&self, granted: bool) {
        lock(&self.state).permission_denied = !granted;
    }

    /// When true (the default) `stop` delivers `End` like a browser does.
    pub fn set_end_on_stop(&self, end_on_stop: bool) {
        lock(&self.state).keep_open_on_stop = !end_on_stop;
    }

    pub fn start_count(&self) -> usize {
        lock(&self.state).starts
    }

    pub fn stop_count(&self) -> usize {
        lock(&self.state).stops
    }
}

impl SpeechRecognizer for MockRecognizer {
    fn is_available(&self) -> bool {
        !lock(&self.state).unavailable
    }

    fn request_microphone_permission(&self) -> bool {
        !lock(&self.state).permission_denied
    }

    fn start(
        &self,
        _config: &RecognitionConfig,
        events: RecognitionEventSender,
    ) -> Result<(), RecognitionError> {
        let mut state = lock(&self.state);
        state.starts += 1;
        if let Some(script) = state.scripts.pop_front() {
            for event in script {
                let _ = events.send(event);
            }
        }
        state.sender = Some(events);
        Ok(())
    }

    fn stop(&self) {
        let mut state = lock(&self.state);
        state.stops += 1;
        if !state.keep_open_on_stop {
            if let Some(tx) = state.sender.take() {
                let _ = tx.send(RecognitionEvent::End);
            }
        }
    }
}

#[derive(Default)]
struct SynthesizerState {
    unavailable: bool,
    auto_complete: bool,
    voices: Vec<VoiceInfo>,
    spoken: Vec<SpeechUtterance>,
    sender: Option<SynthesisEventSender>,
    speaking: bool,
    cancels: usize,
}

/// Recording synthesizer. Utterances stay "playing" until
/// [`MockSynthesizer::finish_current`] unless auto-complete is on.
#[derive(Default)]
pub struct MockSynthesizer {
    state: Mutex<SynthesizerState>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_voices(voices: Vec<VoiceInfo>) -> Self {
        let mock = Self::default();
        mock.set_voices(voices);
        mock
    }

    pub fn set_voices(&self, voices: Vec<VoiceInfo>) {
        lock(&self.state).voices = voices;
    }

    pub fn set_available(&self, available: bool) {
        lock(&self.state).unavailable = !available;
    }

    pub fn set_auto_complete(&self, auto_complete: bool) {
        lock(&self.state).auto_complete = auto_complete;
    }

    pub fn spoken(&self) -> Vec<SpeechUtterance> {
        lock(&self.state).spoken.clone()
    }

    pub fn cancel_count(&self) -> usize {
        lock(&self.state).cancels
    }

    pub fn finish_current(&self) {
        let mut state = lock(&self.state);
        state.speaking = false;
        if let Some(tx) = state.sender.take() {
            let _ = tx.send(SynthesisEvent::Ended);
        }
    }

    pub fn fail_current(&self, reason: &str) {
        let mut state = lock(&self.state);
        state.speaking = false;
        if let Some(tx) = state.sender.take() {
            let _ = tx.send(SynthesisEvent::Error(reason.to_string()));
        }
    }
}

impl SpeechSynthesizer for MockSynthesizer {
    fn is_available(&self) -> bool {
        !lock(&self.state).unavailable
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        lock(&self.state).voices.clone()
    }

    fn speak(
        &self,
        utterance: &SpeechUtterance,
        events: SynthesisEventSender,
    ) -> Result<(), SynthesisError> {
        let mut state = lock(&self.state);
        state.spoken.push(utterance.clone());
        let _ = events.send(SynthesisEvent::Started);
        if state.auto_complete {
            let _ = events.send(SynthesisEvent::Ended);
        } else {
            state.speaking = true;
            state.sender = Some(events);
        }
        Ok(())
    }

    fn cancel(&self) {
        let mut state = lock(&self.state);
        state.cancels += 1;
        state.speaking = false;
        // Browsers report a canceled utterance as an "interrupted" error
        if let Some(tx) = state.sender.take() {
            let _ = tx.send(SynthesisEvent::Error("interrupted".to_string()));
        }
    }

    fn is_speaking(&self) -> bool {
        lock(&self.state).speaking
    }
}
