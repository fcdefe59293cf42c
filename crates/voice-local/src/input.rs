//! Single-shot speech capture: listen once, hand back the final transcript.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use crate::{ListeningSession, RecognitionConfig, RecognitionError, RecognitionEvent, SpeechRecognizer};

pub type RecognitionResult<T> = core::result::Result<T, RecognitionError>;

type InterimCallback = Arc<dyn Fn(&str) + Send + Sync>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct InterimObservers {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, InterimCallback)>>,
}

impl InterimObservers {
    fn notify(&self, text: &str) {
        // Snapshot so a callback may subscribe or unsubscribe without deadlocking
        let callbacks: Vec<InterimCallback> =
            lock(&self.callbacks).iter().map(|(_, cb)| cb.clone()).collect();
        for callback in callbacks {
            callback(text);
        }
    }
}

/// Handle for an interim-result observer. Dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct InterimSubscription {
    id: u64,
    observers: Weak<InterimObservers>,
}

impl InterimSubscription {
    pub fn unsubscribe(self) {}
}

impl Drop for InterimSubscription {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            lock(&observers.callbacks).retain(|(id, _)| *id != self.id);
        }
    }
}

struct ActiveSession {
    id: u64,
    state: ListeningSession,
    stop: Arc<Notify>,
}

/// Wraps a [`SpeechRecognizer`] into `start_listening() -> transcript`.
///
/// One session per controller: a second `start_listening` while one is open
/// fails with [`RecognitionError::AlreadyListening`] and leaves the open
/// session alone.
pub struct VoiceInputController {
    recognizer: Arc<dyn SpeechRecognizer>,
    config: RecognitionConfig,
    recognition_available: bool,
    permission: Mutex<Option<bool>>,
    session: Mutex<Option<ActiveSession>>,
    next_session: AtomicU64,
    observers: Arc<InterimObservers>,
}

impl VoiceInputController {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, config: RecognitionConfig) -> Self {
        let recognition_available = recognizer.is_available();
        if !recognition_available {
            warn!("speech recognition not available on this platform");
        }
        Self {
            recognizer,
            config,
            recognition_available,
            permission: Mutex::new(None),
            session: Mutex::new(None),
            next_session: AtomicU64::new(1),
            observers: Arc::new(InterimObservers::default()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.recognition_available
    }

    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    /// Ask the platform for microphone access and remember the answer.
    pub fn request_microphone_permission(&self) -> bool {
        if !self.recognition_available {
            return false;
        }
        let granted = self.recognizer.request_microphone_permission();
        if granted {
            info!("microphone permission granted");
        } else {
            warn!("microphone permission denied");
        }
        *lock(&self.permission) = Some(granted);
        granted
    }

    pub fn is_listening(&self) -> bool {
        lock(&self.session)
            .as_ref()
            .is_some_and(|s| s.state.is_active)
    }

    /// Snapshot of the open session, if any.
    pub fn session(&self) -> Option<ListeningSession> {
        lock(&self.session).as_ref().map(|s| s.state.clone())
    }

    /// Register an observer for interim transcripts. Each call receives the
    /// latest partial text; earlier partials are not replayed.
    pub fn subscribe_interim<F>(&self, callback: F) -> InterimSubscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let id = self.observers.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.observers.callbacks).push((id, Arc::new(callback)));
        InterimSubscription {
            id,
            observers: Arc::downgrade(&self.observers),
        }
    }

    /// Capture one utterance and return the trimmed final transcript.
    ///
    /// Final segments are concatenated in arrival order. A session that ends
    /// without any final text fails with `NoSpeechDetected`.
    pub async fn start_listening(&self) -> RecognitionResult<String> {
        if !self.recognition_available {
            return Err(RecognitionError::Unsupported);
        }
        if *lock(&self.permission) == Some(false) {
            return Err(RecognitionError::PermissionDenied);
        }

        let stop = Arc::new(Notify::new());
        let id = {
            let mut slot = lock(&self.session);
            if slot.is_some() {
                warn!("start_listening called while a session is open");
                return Err(RecognitionError::AlreadyListening);
            }
            let id = self.next_session.fetch_add(1, Ordering::Relaxed);
            *slot = Some(ActiveSession {
                id,
                state: ListeningSession {
                    is_active: true,
                    ..Default::default()
                },
                stop: stop.clone(),
            });
            id
        };
        let mut guard = SessionGuard {
            controller: self,
            id,
            armed: false,
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        self.recognizer.start(&self.config, tx)?;
        guard.armed = true;
        info!(session = id, language = %self.config.language, "listening");

        let mut final_text = String::new();
        loop {
            tokio::select! {
                biased;
                event = rx.recv() => match event {
                    Some(RecognitionEvent::End) | None => break,
                    Some(event) => {
                        if let Err(e) = self.handle_event(id, event, &mut final_text) {
                            guard.armed = false;
                            warn!(session = id, error = %e, "recognition failed");
                            return Err(e);
                        }
                    }
                },
                _ = stop.notified() => {
                    // Keep whatever the backend already delivered
                    while let Ok(event) = rx.try_recv() {
                        if event == RecognitionEvent::End {
                            break;
                        }
                        if let Err(e) = self.handle_event(id, event, &mut final_text) {
                            debug!(session = id, error = %e, "error after stop ignored");
                        }
                    }
                    break;
                }
            }
        }
        guard.armed = false;

        let transcript = final_text.trim().to_string();
        if transcript.is_empty() {
            info!(session = id, "listening ended without speech");
            Err(RecognitionError::NoSpeechDetected)
        } else {
            info!(session = id, chars = transcript.len(), "listening ended");
            Ok(transcript)
        }
    }

    fn handle_event(
        &self,
        id: u64,
        event: RecognitionEvent,
        final_text: &mut String,
    ) -> RecognitionResult<()> {
        match event {
            RecognitionEvent::Started => debug!(session = id, "capture started"),
            RecognitionEvent::Result {
                transcript,
                is_final: true,
            } => {
                final_text.push_str(&transcript);
                self.update_session(id, |s| {
                    s.final_text = final_text.clone();
                    s.interim_text.clear();
                });
            }
            RecognitionEvent::Result {
                transcript,
                is_final: false,
            } => {
                debug!(session = id, interim = %transcript, "interim result");
                self.update_session(id, |s| s.interim_text = transcript.clone());
                self.observers.notify(&transcript);
            }
            RecognitionEvent::Error(code) => return Err(RecognitionError::from_platform_code(&code)),
            RecognitionEvent::End => {}
        }
        Ok(())
    }

    fn update_session(&self, id: u64, f: impl FnOnce(&mut ListeningSession)) {
        if let Some(session) = lock(&self.session).as_mut().filter(|s| s.id == id) {
            f(&mut session.state);
        }
    }

    /// End the open session now. It still resolves with any final text
    /// received so far. No-op when idle.
    pub fn stop_listening(&self) {
        let stop = {
            let mut slot = lock(&self.session);
            match slot.as_mut() {
                Some(session) if session.state.is_active => {
                    session.state.is_active = false;
                    session.stop.clone()
                }
                _ => return,
            }
        };
        info!("stopping listening session");
        self.recognizer.stop();
        stop.notify_one();
    }
}

/// Clears the session slot however `start_listening` exits, including when
/// its future is dropped mid-session.
struct SessionGuard<'a> {
    controller: &'a VoiceInputController,
    id: u64,
    armed: bool,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        {
            let mut slot = lock(&self.controller.session);
            if slot.as_ref().is_some_and(|s| s.id == self.id) {
                *slot = None;
            }
        }
        if self.armed {
            debug!(session = self.id, "listening future dropped, stopping recognizer");
            self.controller.recognizer.stop();
        }
    }
}
