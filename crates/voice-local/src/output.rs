//! One-utterance-at-a-time speech output.
//!
//! `speak` always interrupts: a new utterance cancels the current one and the
//! interrupted caller gets [`SynthesisError::Interrupted`]. Nothing is queued.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::input::lock;
use crate::text::sanitize_for_speech;
use crate::voices::{best_voice, voices_for_language};
use crate::{
    Result, SpeechConfig, SpeechConfigUpdate, SpeechOptions, SpeechState, SpeechSynthesizer,
    SpeechUtterance, SynthesisError, SynthesisEvent, VoiceInfo, VoiceListing, VoiceOutputStatus,
    VoiceProfile,
};

struct CurrentUtterance {
    id: u64,
    interrupt: oneshot::Sender<()>,
}

pub struct VoiceOutputController {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    synthesis_available: bool,
    profile: VoiceProfile,
    config: Mutex<SpeechConfig>,
    voice: Mutex<Option<VoiceInfo>>,
    current: Mutex<Option<CurrentUtterance>>,
    next_utterance: AtomicU64,
}

impl VoiceOutputController {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        config: SpeechConfig,
        profile: VoiceProfile,
    ) -> Self {
        let synthesis_available = synthesizer.is_available();
        if !synthesis_available {
            warn!("speech synthesis not available on this platform");
        }
        Self {
            synthesizer,
            synthesis_available,
            profile,
            config: Mutex::new(config.clamped()),
            voice: Mutex::new(None),
            current: Mutex::new(None),
            next_utterance: AtomicU64::new(1),
        }
    }

    pub fn is_available(&self) -> bool {
        self.synthesis_available
    }

    pub fn config(&self) -> SpeechConfig {
        lock(&self.config).clone()
    }

    pub fn state(&self) -> SpeechState {
        if lock(&self.current).is_some() {
            SpeechState::Speaking
        } else {
            SpeechState::Idle
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.state() == SpeechState::Speaking
    }

    /// Speak `text`, interrupting anything already playing.
    ///
    /// Emoji and markdown are stripped first; text that is empty afterwards
    /// only interrupts and resolves immediately.
    pub async fn speak(&self, text: &str, options: SpeechOptions) -> Result<()> {
        if !self.synthesis_available {
            return Err(SynthesisError::UnsupportedPlatform);
        }

        let clean = sanitize_for_speech(text);
        if clean.is_empty() {
            debug!("nothing left to speak after sanitizing");
            self.stop_speaking();
            return Ok(());
        }
        let utterance = self.build_utterance(clean, &options);

        let id = self.next_utterance.fetch_add(1, Ordering::Relaxed);
        let (interrupt_tx, interrupt_rx) = oneshot::channel();
        let previous = lock(&self.current).replace(CurrentUtterance {
            id,
            interrupt: interrupt_tx,
        });
        if let Some(previous) = previous {
            debug!(utterance = previous.id, "interrupting current utterance");
            let _ = previous.interrupt.send(());
            self.synthesizer.cancel();
        } else if self.synthesizer.is_speaking() {
            self.synthesizer.cancel();
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        info!(
            utterance = id,
            voice = utterance.voice.as_ref().map(|v| v.name.as_str()).unwrap_or("default"),
            rate = utterance.config.rate,
            pitch = utterance.config.pitch,
            "speaking"
        );
        if let Err(e) = self.synthesizer.speak(&utterance, tx) {
            self.finish(id);
            return Err(e);
        }

        let outcome = wait_for_utterance(&mut rx, interrupt_rx).await;
        self.finish(id);
        match &outcome {
            Ok(()) => debug!(utterance = id, "utterance finished"),
            Err(SynthesisError::Interrupted) => debug!(utterance = id, "utterance interrupted"),
            Err(e) => warn!(utterance = id, error = %e, "utterance failed"),
        }
        outcome
    }

    /// Cancel the current utterance, if any. Its `speak` call resolves with
    /// `Interrupted`.
    pub fn stop_speaking(&self) {
        let previous = lock(&self.current).take();
        let had_current = previous.is_some();
        if let Some(previous) = previous {
            let _ = previous.interrupt.send(());
        }
        if had_current || self.synthesizer.is_speaking() {
            info!("speech stopped");
            self.synthesizer.cancel();
        }
    }

    /// Apply a partial config update, clamping numbers into range.
    pub fn update_config(&self, update: SpeechConfigUpdate) -> SpeechConfig {
        let config = {
            let mut config = lock(&self.config);
            config.apply(&update);
            if update.language.is_some() && update.voice_id.is_none() {
                config.selected_voice_id = None;
            }
            config.clone()
        };
        if update.voice_id.is_some() || update.language.is_some() {
            // Re-resolve on next use
            *lock(&self.voice) = None;
        }
        debug!(?config, "speech config updated");
        config
    }

    /// Rank the platform voices against `profile` and make the winner the
    /// active voice.
    pub fn select_voice(&self, profile: &VoiceProfile) -> Option<VoiceInfo> {
        let voices = self.synthesizer.voices();
        let chosen = best_voice(&voices, profile).map(|m| {
            info!(voice = %m.voice.name, rule = ?m.rule, "voice selected");
            m.voice.clone()
        });
        if chosen.is_none() {
            warn!("platform lists no voices, using engine default");
        }
        self.set_voice(chosen.clone());
        chosen
    }

    /// Re-run selection for the controller's own profile, e.g. after the
    /// platform finished loading its voice list.
    pub fn refresh_voice(&self) -> Option<VoiceInfo> {
        let profile = self.profile.clone();
        self.select_voice(&profile)
    }

    pub fn current_voice(&self) -> Option<VoiceInfo> {
        self.resolve_voice()
    }

    /// Voices in the configured language with a guessed gender.
    pub fn available_voices(&self) -> Vec<VoiceListing> {
        if !self.synthesis_available {
            return Vec::new();
        }
        let language = lock(&self.config).language.clone();
        voices_for_language(&self.synthesizer.voices(), &language)
    }

    /// Pick a voice from [`Self::available_voices`] by position.
    pub fn set_voice_by_index(&self, index: usize) -> Option<VoiceInfo> {
        let voice = self.available_voices().into_iter().nth(index)?.voice;
        info!(voice = %voice.name, "voice set manually");
        self.set_voice(Some(voice.clone()));
        Some(voice)
    }

    pub fn status(&self) -> VoiceOutputStatus {
        VoiceOutputStatus {
            synthesis_available: self.synthesis_available,
            state: self.state(),
            voice_name: lock(&self.voice).as_ref().map(|v| v.name.clone()),
            language: lock(&self.config).language.clone(),
        }
    }

    fn set_voice(&self, voice: Option<VoiceInfo>) {
        lock(&self.config).selected_voice_id = voice.as_ref().map(|v| v.id.clone());
        *lock(&self.voice) = voice;
    }

    fn resolve_voice(&self) -> Option<VoiceInfo> {
        if let Some(voice) = lock(&self.voice).clone() {
            return Some(voice);
        }
        let wanted = lock(&self.config).selected_voice_id.clone();
        let Some(id) = wanted else {
            return self.refresh_voice();
        };
        let voices = self.synthesizer.voices();
        if let Some(voice) = voices.iter().find(|v| v.id == id) {
            *lock(&self.voice) = Some(voice.clone());
            return Some(voice.clone());
        }
        // The voice list may still be loading: keep the configured id and
        // rank only for this utterance.
        warn!(voice_id = %id, "configured voice not listed yet, ranking voices");
        best_voice(&voices, &self.profile).map(|m| m.voice.clone())
    }

    fn build_utterance(&self, text: String, options: &SpeechOptions) -> SpeechUtterance {
        let mut config = lock(&self.config).clone();
        config.apply(&SpeechConfigUpdate {
            rate: options.rate,
            pitch: options.pitch,
            volume: options.volume,
            ..Default::default()
        });

        let voice = match &options.voice_id {
            Some(id) => self
                .synthesizer
                .voices()
                .into_iter()
                .find(|v| &v.id == id)
                .or_else(|| self.resolve_voice()),
            None => self.resolve_voice(),
        };
        config.selected_voice_id = voice.as_ref().map(|v| v.id.clone());
        SpeechUtterance {
            text,
            config,
            voice,
        }
    }

    fn finish(&self, id: u64) {
        let mut current = lock(&self.current);
        if current.as_ref().is_some_and(|c| c.id == id) {
            *current = None;
        }
    }
}

async fn wait_for_utterance(
    events: &mut mpsc::UnboundedReceiver<SynthesisEvent>,
    mut interrupted: oneshot::Receiver<()>,
) -> Result<()> {
    loop {
        tokio::select! {
            // An interrupted backend may still report an error for the old
            // utterance; the interruption wins.
            biased;
            _ = &mut interrupted => return Err(SynthesisError::Interrupted),
            event = events.recv() => match event {
                Some(SynthesisEvent::Started) => {}
                Some(SynthesisEvent::Ended) => return Ok(()),
                Some(SynthesisEvent::Error(reason)) => return Err(SynthesisError::Synthesis(reason)),
                None => {
                    return Err(SynthesisError::Synthesis(
                        "synthesizer dropped the utterance".to_string(),
                    ))
                }
            },
        }
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::{MockSynthesizer, VoiceGender};

    fn catalog() -> Vec<VoiceInfo> {
        vec![
            VoiceInfo::new("luciana", "Luciana", "pt-BR"),
            VoiceInfo::new("daniel", "Microsoft Daniel", "pt-BR"),
            VoiceInfo::new("samantha", "Samantha", "en-US"),
        ]
    }

    fn controller(mock: &Arc<MockSynthesizer>) -> Arc<VoiceOutputController> {
        Arc::new(VoiceOutputController::new(
            mock.clone(),
            SpeechConfig::default(),
            VoiceProfile::default(),
        ))
    }

    async fn wait_for_utterances(mock: &MockSynthesizer, count: usize) {
        while mock.spoken().len() < count {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_speak_sanitizes_and_uses_selected_voice() {
        let mock = Arc::new(MockSynthesizer::with_voices(catalog()));
        mock.set_auto_complete(true);
        let output = controller(&mock);

        output
            .speak("**Motor** ligado! 🤖", SpeechOptions::default())
            .await
            .unwrap();

        let spoken = mock.spoken();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].text, "Motor ligado!");
        assert_eq!(spoken[0].voice.as_ref().unwrap().id, "daniel");
        assert_eq!(spoken[0].config.selected_voice_id.as_deref(), Some("daniel"));
        assert_eq!(output.state(), SpeechState::Idle);
    }

    #[tokio::test]
    async fn test_overrides_merge_over_config_with_clamping() {
        let mock = Arc::new(MockSynthesizer::with_voices(catalog()));
        mock.set_auto_complete(true);
        let output = controller(&mock);

        output
            .speak(
                "Olá",
                SpeechOptions {
                    pitch: Some(0.6),
                    rate: Some(7.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let config = &mock.spoken()[0].config;
        assert_eq!(config.pitch, 0.6);
        assert_eq!(config.rate, 2.0);
        assert_eq!(config.volume, 1.0);
        assert_eq!(config.language, "pt-BR");
        // Overrides never leak into the stored config
        assert_eq!(output.config().pitch, 0.8);
    }

    #[tokio::test]
    async fn test_second_speak_interrupts_first() {
        let mock = Arc::new(MockSynthesizer::with_voices(catalog()));
        let output = controller(&mock);

        let first = tokio::spawn({
            let output = output.clone();
            async move { output.speak("primeira resposta", SpeechOptions::default()).await }
        });
        wait_for_utterances(&mock, 1).await;
        assert_eq!(output.state(), SpeechState::Speaking);

        let second = tokio::spawn({
            let output = output.clone();
            async move { output.speak("segunda resposta", SpeechOptions::default()).await }
        });
        wait_for_utterances(&mock, 2).await;

        assert_eq!(first.await.unwrap(), Err(SynthesisError::Interrupted));
        assert_eq!(mock.cancel_count(), 1);
        assert_eq!(output.state(), SpeechState::Speaking);

        mock.finish_current();
        assert_eq!(second.await.unwrap(), Ok(()));
        assert_eq!(output.state(), SpeechState::Idle);
        assert_eq!(mock.spoken()[1].text, "segunda resposta");
    }

    #[tokio::test]
    async fn test_stop_speaking_interrupts_and_is_idempotent() {
        let mock = Arc::new(MockSynthesizer::with_voices(catalog()));
        let output = controller(&mock);

        let pending = tokio::spawn({
            let output = output.clone();
            async move { output.speak("uma frase longa", SpeechOptions::default()).await }
        });
        wait_for_utterances(&mock, 1).await;

        output.stop_speaking();
        output.stop_speaking();
        assert_eq!(pending.await.unwrap(), Err(SynthesisError::Interrupted));
        assert_eq!(mock.cancel_count(), 1);
        assert_eq!(output.state(), SpeechState::Idle);
    }

    #[tokio::test]
    async fn test_platform_error_rejects() {
        let mock = Arc::new(MockSynthesizer::with_voices(catalog()));
        let output = controller(&mock);

        let pending = tokio::spawn({
            let output = output.clone();
            async move { output.speak("falha", SpeechOptions::default()).await }
        });
        wait_for_utterances(&mock, 1).await;
        mock.fail_current("audio-busy");

        assert_eq!(
            pending.await.unwrap(),
            Err(SynthesisError::Synthesis("audio-busy".to_string()))
        );
        assert_eq!(output.state(), SpeechState::Idle);
    }

    #[tokio::test]
    async fn test_unsupported_platform_and_empty_text() {
        let mock = Arc::new(MockSynthesizer::with_voices(catalog()));
        mock.set_available(false);
        let output = controller(&mock);
        assert_eq!(
            output.speak("oi", SpeechOptions::default()).await,
            Err(SynthesisError::UnsupportedPlatform)
        );
        assert!(output.available_voices().is_empty());

        let mock = Arc::new(MockSynthesizer::with_voices(catalog()));
        let output = controller(&mock);
        assert_eq!(output.speak("🤖🎉", SpeechOptions::default()).await, Ok(()));
        assert!(mock.spoken().is_empty());
    }

    #[tokio::test]
    async fn test_update_config_clamps_and_invalidates_voice() {
        let mock = Arc::new(MockSynthesizer::with_voices(catalog()));
        let output = controller(&mock);
        assert_eq!(output.current_voice().unwrap().id, "daniel");

        let config = output.update_config(SpeechConfigUpdate {
            rate: Some(0.01),
            volume: Some(3.0),
            voice_id: Some("luciana".to_string()),
            ..Default::default()
        });
        assert_eq!(config.rate, 0.1);
        assert_eq!(config.volume, 1.0);
        assert_eq!(output.current_voice().unwrap().id, "luciana");
    }

    #[tokio::test]
    async fn test_voice_listing_and_manual_pick() {
        let mock = Arc::new(MockSynthesizer::with_voices(catalog()));
        let output = controller(&mock);

        let listed = output.available_voices();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].gender, VoiceGender::Feminine);
        assert_eq!(listed[1].gender, VoiceGender::Masculine);

        assert_eq!(output.set_voice_by_index(0).unwrap().name, "Luciana");
        assert!(output.set_voice_by_index(5).is_none());
        assert_eq!(output.status().voice_name.as_deref(), Some("Luciana"));
    }

    #[tokio::test]
    async fn test_voices_loaded_late_are_picked_up_on_refresh() {
        let mock = Arc::new(MockSynthesizer::with_voices(Vec::new()));
        let output = controller(&mock);
        assert!(output.current_voice().is_none());

        mock.set_voices(catalog());
        assert_eq!(output.refresh_voice().unwrap().id, "daniel");
    }

    #[tokio::test]
    async fn test_configured_voice_survives_until_voices_load() {
        let mock = Arc::new(MockSynthesizer::with_voices(Vec::new()));
        mock.set_auto_complete(true);
        let output = controller(&mock);
        output.update_config(SpeechConfigUpdate {
            voice_id: Some("luciana".to_string()),
            ..Default::default()
        });

        output.speak("oi", SpeechOptions::default()).await.unwrap();
        assert!(mock.spoken()[0].voice.is_none());
        assert_eq!(output.config().selected_voice_id.as_deref(), Some("luciana"));

        mock.set_voices(catalog());
        output.speak("oi de novo", SpeechOptions::default()).await.unwrap();
        assert_eq!(mock.spoken()[1].voice.as_ref().unwrap().id, "luciana");
        assert_eq!(output.config().selected_voice_id.as_deref(), Some("luciana"));
    }

    #[tokio::test]
    async fn test_missing_configured_voice_ranks_without_forgetting_it() {
        let mock = Arc::new(MockSynthesizer::with_voices(catalog()));
        mock.set_auto_complete(true);
        let output = controller(&mock);
        output.update_config(SpeechConfigUpdate {
            voice_id: Some("joana".to_string()),
            ..Default::default()
        });

        output.speak("oi", SpeechOptions::default()).await.unwrap();
        assert_eq!(mock.spoken()[0].voice.as_ref().unwrap().id, "daniel");
        assert_eq!(output.config().selected_voice_id.as_deref(), Some("joana"));
    }
}
