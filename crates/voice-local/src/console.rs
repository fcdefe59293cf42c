//! Terminal stand-ins for the platform speech engines: the recognizer reads
//! one line from stdin per session, the synthesizer prints the utterance and
//! holds the "speaking" state for a reading-time estimate.

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

use crate::input::lock;
use crate::{
    RecognitionConfig, RecognitionError, RecognitionEvent, RecognitionEventSender,
    SpeechRecognizer, SpeechSynthesizer, SpeechUtterance, SynthesisError, SynthesisEvent,
    SynthesisEventSender, VoiceInfo,
};

/// Terminal lines shared by every console consumer.
///
/// Waiting for a line is cancel-safe: a line nobody took stays queued for
/// the next reader, so a stopped recognizer never swallows chat input.
pub struct ConsoleInput {
    lines: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
}

impl ConsoleInput {
    pub fn from_channel(lines: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            lines: tokio::sync::Mutex::new(lines),
        }
    }

    /// The process stdin, read by a single background thread.
    pub fn stdin() -> Arc<Self> {
        static STDIN: OnceLock<Arc<ConsoleInput>> = OnceLock::new();
        STDIN
            .get_or_init(|| {
                let (tx, rx) = mpsc::unbounded_channel();
                let spawned = std::thread::Builder::new()
                    .name("console-stdin".to_string())
                    .spawn(move || {
                        for line in std::io::stdin().lock().lines() {
                            let Ok(line) = line else { break };
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                    });
                if let Err(e) = spawned {
                    warn!(error = %e, "could not start stdin reader");
                }
                Arc::new(Self::from_channel(rx))
            })
            .clone()
    }

    /// Next line, or `None` once the input is closed.
    pub async fn next_line(&self) -> Option<String> {
        self.lines.lock().await.recv().await
    }
}

pub struct ConsoleRecognizer {
    prompt: String,
    input: Arc<ConsoleInput>,
    cancel: Mutex<Option<Arc<Notify>>>,
    sender: Mutex<Option<RecognitionEventSender>>,
}

impl ConsoleRecognizer {
    pub fn new(prompt: impl Into<String>, input: Arc<ConsoleInput>) -> Self {
        Self {
            prompt: prompt.into(),
            input,
            cancel: Mutex::new(None),
            sender: Mutex::new(None),
        }
    }
}

impl Default for ConsoleRecognizer {
    fn default() -> Self {
        Self::new("🎤 fale (digite): ", ConsoleInput::stdin())
    }
}

fn send_line(events: &RecognitionEventSender, line: &str, interim: bool) {
    let words: Vec<&str> = line.split_whitespace().collect();
    if interim {
        for i in 1..words.len() {
            let _ = events.send(RecognitionEvent::Result {
                transcript: words[..i].join(" "),
                is_final: false,
            });
        }
    }
    if !words.is_empty() {
        let _ = events.send(RecognitionEvent::Result {
            transcript: words.join(" "),
            is_final: true,
        });
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn start(
        &self,
        config: &RecognitionConfig,
        events: RecognitionEventSender,
    ) -> Result<(), RecognitionError> {
        let handle = Handle::try_current()
            .map_err(|_| RecognitionError::Unknown("no async runtime".to_string()))?;
        let cancel = Arc::new(Notify::new());
        *lock(&self.cancel) = Some(cancel.clone());
        *lock(&self.sender) = Some(events.clone());

        let _ = events.send(RecognitionEvent::Started);
        print!("{}", self.prompt);
        let _ = std::io::stdout().flush();

        let input = self.input.clone();
        let interim = config.interim_results;
        handle.spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.notified() => {
                    debug!("console session stopped before input arrived");
                    return;
                }
                line = input.next_line() => match line {
                    Some(line) => send_line(&events, &line, interim),
                    None => {
                        let _ = events.send(RecognitionEvent::Error("audio-capture".to_string()));
                    }
                },
            }
            let _ = events.send(RecognitionEvent::End);
        });
        Ok(())
    }

    fn stop(&self) {
        if let Some(cancel) = lock(&self.cancel).take() {
            cancel.notify_one();
        }
        if let Some(tx) = lock(&self.sender).take() {
            let _ = tx.send(RecognitionEvent::End);
        }
    }
}

pub struct ConsoleSynthesizer {
    voices: Vec<VoiceInfo>,
    generation: Arc<AtomicU64>,
    speaking: Arc<AtomicBool>,
    sender: Mutex<Option<SynthesisEventSender>>,
}

impl ConsoleSynthesizer {
    pub fn new(voices: Vec<VoiceInfo>) -> Self {
        Self {
            voices,
            generation: Arc::new(AtomicU64::new(0)),
            speaking: Arc::new(AtomicBool::new(false)),
            sender: Mutex::new(None),
        }
    }
}

impl Default for ConsoleSynthesizer {
    fn default() -> Self {
        Self::new(vec![
            VoiceInfo::new("console-maria", "Console Maria", "pt-BR"),
            VoiceInfo::new("console-daniel", "Console Daniel", "pt-BR"),
            VoiceInfo::new("console-david", "Console David", "en-US"),
        ])
    }
}

/// Reading time at 150 words per minute scaled by the rate.
fn playback_duration(utterance: &SpeechUtterance) -> Duration {
    let words = utterance.text.split_whitespace().count() as f64;
    let rate = f64::from(utterance.config.rate).max(0.1);
    let ms = (words * 60_000.0 / (150.0 * rate)).clamp(300.0, 10_000.0);
    Duration::from_millis(ms as u64)
}

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.clone()
    }

    fn speak(
        &self,
        utterance: &SpeechUtterance,
        events: SynthesisEventSender,
    ) -> Result<(), SynthesisError> {
        let handle = Handle::try_current()
            .map_err(|_| SynthesisError::Synthesis("no async runtime".to_string()))?;
        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.speaking.store(true, Ordering::SeqCst);
        *lock(&self.sender) = Some(events.clone());

        let voice = utterance
            .voice
            .as_ref()
            .map(|v| v.name.as_str())
            .unwrap_or("default");
        println!("🔊 [{voice}] {}", utterance.text);
        let _ = events.send(SynthesisEvent::Started);

        let duration = playback_duration(utterance);
        let generation = self.generation.clone();
        let speaking = self.speaking.clone();
        handle.spawn(async move {
            tokio::time::sleep(duration).await;
            if generation.load(Ordering::SeqCst) == id {
                speaking.store(false, Ordering::SeqCst);
                let _ = events.send(SynthesisEvent::Ended);
            }
        });
        Ok(())
    }

    fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.speaking.store(false, Ordering::SeqCst);
        if let Some(tx) = lock(&self.sender).take() {
            let _ = tx.send(SynthesisEvent::Error("interrupted".to_string()));
        }
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SpeechConfig, VoiceInputController};

    fn utterance(text: &str) -> SpeechUtterance {
        SpeechUtterance {
            text: text.to_string(),
            config: SpeechConfig::default(),
            voice: None,
        }
    }

    #[test]
    fn test_playback_duration_bounds() {
        assert_eq!(playback_duration(&utterance("")), Duration::from_millis(300));
        let long = "palavra ".repeat(1000);
        assert_eq!(playback_duration(&utterance(&long)), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_console_synthesizer_ends_or_cancels() {
        let synth = ConsoleSynthesizer::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        synth.speak(&utterance("olá mundo"), tx).unwrap();
        assert!(synth.is_speaking());
        assert_eq!(rx.recv().await, Some(SynthesisEvent::Started));
        assert_eq!(rx.recv().await, Some(SynthesisEvent::Ended));
        assert!(!synth.is_speaking());

        let (tx, mut rx) = mpsc::unbounded_channel();
        synth.speak(&utterance("olá de novo"), tx).unwrap();
        assert_eq!(rx.recv().await, Some(SynthesisEvent::Started));
        synth.cancel();
        assert_eq!(
            rx.recv().await,
            Some(SynthesisEvent::Error("interrupted".to_string()))
        );
        assert!(!synth.is_speaking());
    }

    fn console_input() -> (mpsc::UnboundedSender<String>, Arc<ConsoleInput>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Arc::new(ConsoleInput::from_channel(rx)))
    }

    #[tokio::test]
    async fn test_console_recognizer_hears_a_line() {
        let (tx, input) = console_input();
        let controller = VoiceInputController::new(
            Arc::new(ConsoleRecognizer::new("", input)),
            RecognitionConfig::default(),
        );
        tx.send("  ligar   motor ".to_string()).unwrap();
        assert_eq!(controller.start_listening().await.unwrap(), "ligar motor");
    }

    #[tokio::test]
    async fn test_stopped_session_leaves_next_line_for_others() {
        let (tx, input) = console_input();
        let controller = Arc::new(VoiceInputController::new(
            Arc::new(ConsoleRecognizer::new("", input.clone())),
            RecognitionConfig::default(),
        ));

        let listening = tokio::spawn({
            let controller = controller.clone();
            async move { controller.start_listening().await }
        });
        while !controller.is_listening() {
            tokio::task::yield_now().await;
        }
        controller.stop_listening();
        assert_eq!(
            listening.await.unwrap(),
            Err(RecognitionError::NoSpeechDetected)
        );
        // let the cancelled reader task observe the stop
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        tx.send("/sair".to_string()).unwrap();
        assert_eq!(input.next_line().await.as_deref(), Some("/sair"));
    }
}
