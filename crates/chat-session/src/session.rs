//! One chat conversation: optimistic user echo, AI round-trip, then speech
//! hand-off of the answer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use robot_mouth::{RemoteSpeechDispatcher, RobotVoiceConfig};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use voice_local::{
    RecognitionError, SpeechOptions, SynthesisError, VoiceInputController, VoiceOutputController,
};

use crate::{ChatApi, ChatApiConfig, ChatError, ChatMessage, ChatRequest, Transcript, TtsStatus};

/// Where assistant answers are spoken. One target per session, never both.
#[derive(Clone, Default)]
pub enum TtsTarget {
    #[default]
    Disabled,
    Local(Arc<VoiceOutputController>),
    Robot(Arc<RemoteSpeechDispatcher>),
}

impl TtsTarget {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disabled => "off",
            Self::Local(_) => "local",
            Self::Robot(_) => "robot",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Blank input, or a previous message is still waiting for its answer
    Ignored,
    Answered {
        message_id: Uuid,
        tts_status: Option<TtsStatus>,
    },
    Failed {
        message_id: Uuid,
        error: ChatError,
    },
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ChatSession {
    api: Arc<dyn ChatApi>,
    session_id: String,
    context: String,
    reply_timeout: Duration,
    transcript: Transcript,
    tts: Mutex<TtsTarget>,
    tts_enabled: AtomicBool,
    robot_voice: Mutex<RobotVoiceConfig>,
    busy: AtomicBool,
}

impl ChatSession {
    pub fn new(api: Arc<dyn ChatApi>, tts: TtsTarget, config: &ChatApiConfig) -> Self {
        let session_id = format!("session_{}", Uuid::new_v4().simple());
        info!(session = %session_id, tts = tts.name(), "chat session created");
        Self {
            api,
            session_id,
            context: config.context.clone(),
            reply_timeout: config.timeout(),
            transcript: Transcript::new(),
            tts_enabled: AtomicBool::new(!matches!(tts, TtsTarget::Disabled)),
            tts: Mutex::new(tts),
            robot_voice: Mutex::new(RobotVoiceConfig::default()),
            busy: AtomicBool::new(false),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }

    pub fn tts_target(&self) -> TtsTarget {
        lock(&self.tts).clone()
    }

    pub fn set_tts_target(&self, target: TtsTarget) {
        info!(tts = target.name(), "speech target changed");
        *lock(&self.tts) = target;
    }

    pub fn tts_enabled(&self) -> bool {
        self.tts_enabled.load(Ordering::Acquire)
    }

    pub fn set_tts_enabled(&self, enabled: bool) {
        self.tts_enabled.store(enabled, Ordering::Release);
    }

    pub fn set_robot_voice(&self, voice: RobotVoiceConfig) {
        *lock(&self.robot_voice) = voice.clamped();
    }

    pub fn robot_voice(&self) -> RobotVoiceConfig {
        *lock(&self.robot_voice)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Greet on an empty transcript. Returns whether a message was added.
    pub fn welcome(&self) -> bool {
        if !self.transcript.is_empty() {
            return false;
        }
        self.transcript.push(ChatMessage::welcome());
        true
    }

    pub fn clear(&self) {
        self.transcript.clear();
        debug!(session = %self.session_id, "transcript cleared");
    }

    /// Send one user message through the full round-trip.
    ///
    /// The user message lands in the transcript before any network call.
    /// Speech is attempted only after a successful answer; a failed chat call
    /// adds one assistant error message and speaks nothing. Only the chat
    /// round-trip is exclusive: a submit made while that is pending is
    /// ignored, one made while the answer is spoken goes through.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Ignored;
        }
        if self.busy.swap(true, Ordering::AcqRel) {
            debug!("still waiting for the previous answer");
            return SubmitOutcome::Ignored;
        }
        let busy = BusyGuard(&self.busy);

        self.transcript.push(ChatMessage::user(text));

        let request = ChatRequest {
            message: text.to_string(),
            session_id: self.session_id.clone(),
            context: self.context.clone(),
        };
        let reply = match timeout(self.reply_timeout, self.api.send(&request)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => return self.fail(e),
            Err(_) => return self.fail(ChatError::Timeout),
        };

        let target = if self.tts_enabled() {
            self.tts_target()
        } else {
            TtsTarget::Disabled
        };
        let speak = !matches!(target, TtsTarget::Disabled) && !reply.response.trim().is_empty();
        let message = ChatMessage::assistant(&reply, speak.then_some(TtsStatus::Pending));
        let message_id = self.transcript.push(message);
        info!(model = reply.model.as_deref().unwrap_or("-"), "assistant answered");
        // The next message may go out while this answer is being spoken; its
        // own speech interrupts this one.
        drop(busy);

        if !speak {
            return SubmitOutcome::Answered {
                message_id,
                tts_status: None,
            };
        }

        let status = if self.speak(&target, &reply.response).await {
            TtsStatus::Sent
        } else {
            TtsStatus::Failed
        };
        self.transcript.set_tts_status(message_id, status);
        SubmitOutcome::Answered {
            message_id,
            tts_status: Some(status),
        }
    }

    /// Listen once and submit whatever was heard.
    pub async fn listen_and_submit(
        &self,
        input: &VoiceInputController,
    ) -> Result<SubmitOutcome, RecognitionError> {
        let heard = input.start_listening().await?;
        info!(transcript = %heard, "voice input recognized");
        Ok(self.submit(&heard).await)
    }

    /// Silence whichever target is speaking.
    pub async fn stop_speaking(&self) -> bool {
        match self.tts_target() {
            TtsTarget::Disabled => false,
            TtsTarget::Local(output) => {
                output.stop_speaking();
                true
            }
            TtsTarget::Robot(robot) => robot.stop().await,
        }
    }

    /// Speak the latest assistant answer again.
    pub async fn repeat_last(&self) -> bool {
        match self.tts_target() {
            TtsTarget::Disabled => false,
            TtsTarget::Robot(robot) => robot.repeat_last().await,
            target @ TtsTarget::Local(_) => match self.transcript.last_assistant_text() {
                Some(text) => self.speak(&target, &text).await,
                None => false,
            },
        }
    }

    async fn speak(&self, target: &TtsTarget, text: &str) -> bool {
        match target {
            TtsTarget::Disabled => false,
            TtsTarget::Local(output) => match output.speak(text, SpeechOptions::default()).await {
                Ok(()) => true,
                Err(SynthesisError::Interrupted) => {
                    debug!("local speech interrupted by a newer utterance");
                    true
                }
                Err(e) => {
                    warn!(error = %e, "local speech failed");
                    false
                }
            },
            TtsTarget::Robot(robot) => {
                let voice = *lock(&self.robot_voice);
                robot.dispatch(text, &voice).await
            }
        }
    }

    fn fail(&self, e: ChatError) -> SubmitOutcome {
        error!(error = %e, "chat request failed");
        let message_id = self.transcript.push(ChatMessage::failure());
        SubmitOutcome::Failed {
            message_id,
            error: e,
        }
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::{MessageKind, MockChatApi, MockChatReply, Sender};
    use robot_mouth::{MockReply, MockTransport, RobotMouthConfig};
    use voice_local::{
        MockRecognizer, MockSynthesizer, RecognitionConfig, SpeechConfig, VoiceInfo, VoiceProfile,
    };

    fn robot(mock: &Arc<MockTransport>) -> TtsTarget {
        TtsTarget::Robot(Arc::new(RemoteSpeechDispatcher::new(
            mock.clone(),
            RobotMouthConfig::default(),
        )))
    }

    fn session(api: &Arc<MockChatApi>, tts: TtsTarget) -> Arc<ChatSession> {
        Arc::new(ChatSession::new(api.clone(), tts, &ChatApiConfig::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_voice_command_reaches_robot() {
        let api = Arc::new(MockChatApi::new());
        api.push_text("Motor ligado!");
        let transport = Arc::new(MockTransport::new());
        let chat = session(&api, robot(&transport));
        let input = VoiceInputController::new(
            Arc::new(MockRecognizer::with_phrases(&["ligar motor"])),
            RecognitionConfig::default(),
        );

        let outcome = chat.listen_and_submit(&input).await.unwrap();
        let SubmitOutcome::Answered { tts_status, .. } = outcome else {
            panic!("expected an answer, got {outcome:?}");
        };
        assert_eq!(tts_status, Some(TtsStatus::Sent));

        let messages = chat.transcript().snapshot();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].text, "ligar motor");
        assert_eq!(messages[0].tts_status, None);
        assert_eq!(messages[1].sender, Sender::Assistant);
        assert_eq!(messages[1].text, "Motor ligado!");
        assert_eq!(messages[1].tts_status, Some(TtsStatus::Sent));

        let sent = transport.speak_requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "Motor ligado!");

        let requests = api.requests();
        assert_eq!(requests[0].message, "ligar motor");
        assert_eq!(requests[0].session_id, chat.session_id());
        assert_eq!(requests[0].context, "robotics_education");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_robot_marks_answer_failed() {
        let api = Arc::new(MockChatApi::new());
        api.push_text("Motor ligado!");
        let transport = Arc::new(MockTransport::always(MockReply::NetworkError));
        let chat = session(&api, robot(&transport));

        let outcome = chat.submit("ligar motor").await;
        assert!(matches!(
            outcome,
            SubmitOutcome::Answered {
                tts_status: Some(TtsStatus::Failed),
                ..
            }
        ));
        let messages = chat.transcript().snapshot();
        assert_eq!(messages[1].text, "Motor ligado!");
        assert_eq!(messages[1].tts_status, Some(TtsStatus::Failed));
        assert_eq!(transport.speak_requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_is_pending_while_speech_is_in_flight() {
        let api = Arc::new(MockChatApi::new());
        api.push_text("Motor ligado!");
        let transport = Arc::new(MockTransport::new());
        transport.push_speak(MockReply::NetworkError);
        let chat = session(&api, robot(&transport));

        let task = tokio::spawn({
            let chat = chat.clone();
            async move { chat.submit("ligar motor").await }
        });
        // first attempt failed, dispatcher is in its 1s backoff
        tokio::time::sleep(Duration::from_millis(500)).await;
        let messages = chat.transcript().snapshot();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].tts_status, Some(TtsStatus::Pending));

        task.await.unwrap();
        let messages = chat.transcript().snapshot();
        assert_eq!(messages[1].tts_status, Some(TtsStatus::Sent));
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_timeout_adds_single_error_message() {
        let api = Arc::new(MockChatApi::new());
        api.push(MockChatReply::Hang);
        let transport = Arc::new(MockTransport::new());
        let chat = session(&api, robot(&transport));

        let task = tokio::spawn({
            let chat = chat.clone();
            async move { chat.submit("ligar motor").await }
        });

        // user echo is visible before the API has answered
        tokio::time::sleep(Duration::from_secs(1)).await;
        let messages = chat.transcript().snapshot();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "ligar motor");
        assert!(chat.is_busy());
        assert_eq!(chat.submit("outra coisa").await, SubmitOutcome::Ignored);

        let outcome = task.await.unwrap();
        assert!(matches!(
            outcome,
            SubmitOutcome::Failed {
                error: ChatError::Timeout,
                ..
            }
        ));

        let messages = chat.transcript().snapshot();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].sender, Sender::Assistant);
        assert_eq!(messages[1].kind, MessageKind::Error);
        assert_eq!(messages[1].tts_status, None);
        assert!(transport.speak_requests().is_empty());
        assert!(!chat.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_robot_health_check_is_bounded() {
        let transport = Arc::new(MockTransport::always(MockReply::Hang));
        let robot = RemoteSpeechDispatcher::new(transport, RobotMouthConfig::default());

        let started = tokio::time::Instant::now();
        assert!(!robot.check_connection().await);
        assert!(started.elapsed() <= robot.config().health_timeout());
    }

    #[tokio::test]
    async fn test_api_error_skips_speech() {
        let api = Arc::new(MockChatApi::new());
        api.push(MockChatReply::Fail(ChatError::Status(503)));
        let synth = Arc::new(MockSynthesizer::new());
        synth.set_auto_complete(true);
        let output = Arc::new(VoiceOutputController::new(
            synth.clone(),
            SpeechConfig::default(),
            VoiceProfile::default(),
        ));
        let chat = session(&api, TtsTarget::Local(output));

        let outcome = chat.submit("acender led").await;
        assert!(matches!(
            outcome,
            SubmitOutcome::Failed {
                error: ChatError::Status(503),
                ..
            }
        ));
        assert!(synth.spoken().is_empty());
    }

    #[tokio::test]
    async fn test_local_speech_target() {
        let api = Arc::new(MockChatApi::new());
        api.push_text("**LED** aceso! 💡");
        let synth = Arc::new(MockSynthesizer::with_voices(vec![VoiceInfo::new(
            "daniel",
            "Daniel",
            "pt-BR",
        )]));
        synth.set_auto_complete(true);
        let output = Arc::new(VoiceOutputController::new(
            synth.clone(),
            SpeechConfig::default(),
            VoiceProfile::default(),
        ));
        let chat = session(&api, TtsTarget::Local(output));

        let outcome = chat.submit("acender led").await;
        assert!(matches!(
            outcome,
            SubmitOutcome::Answered {
                tts_status: Some(TtsStatus::Sent),
                ..
            }
        ));
        let spoken = synth.spoken();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].text, "LED aceso!");

        assert!(chat.repeat_last().await);
        assert_eq!(synth.spoken().len(), 2);
    }

    #[tokio::test]
    async fn test_new_message_while_answer_is_spoken_interrupts_it() {
        let api = Arc::new(MockChatApi::new());
        api.push_text("Uma resposta longa sobre motores");
        api.push_text("Resposta curta");
        let synth = Arc::new(MockSynthesizer::new());
        let output = Arc::new(VoiceOutputController::new(
            synth.clone(),
            SpeechConfig::default(),
            VoiceProfile::default(),
        ));
        let chat = session(&api, TtsTarget::Local(output));

        let first = tokio::spawn({
            let chat = chat.clone();
            async move { chat.submit("fale sobre motores").await }
        });
        while synth.spoken().is_empty() {
            tokio::task::yield_now().await;
        }
        assert!(!chat.is_busy());

        let second = tokio::spawn({
            let chat = chat.clone();
            async move { chat.submit("outra pergunta").await }
        });
        while synth.spoken().len() < 2 {
            tokio::task::yield_now().await;
        }
        assert!(matches!(
            first.await.unwrap(),
            SubmitOutcome::Answered {
                tts_status: Some(TtsStatus::Sent),
                ..
            }
        ));
        assert_eq!(synth.cancel_count(), 1);

        synth.finish_current();
        assert!(matches!(
            second.await.unwrap(),
            SubmitOutcome::Answered {
                tts_status: Some(TtsStatus::Sent),
                ..
            }
        ));

        let texts: Vec<String> = chat
            .transcript()
            .snapshot()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(
            texts,
            vec![
                "fale sobre motores",
                "Uma resposta longa sobre motores",
                "outra pergunta",
                "Resposta curta",
            ]
        );
    }

    #[tokio::test]
    async fn test_speech_disabled_leaves_status_unset() {
        let api = Arc::new(MockChatApi::new());
        let transport = Arc::new(MockTransport::new());
        let chat = session(&api, robot(&transport));
        chat.set_tts_enabled(false);

        let outcome = chat.submit("oi").await;
        assert!(matches!(
            outcome,
            SubmitOutcome::Answered {
                tts_status: None,
                ..
            }
        ));
        assert_eq!(chat.transcript().snapshot()[1].text, "Você disse: oi");
        assert!(transport.speak_requests().is_empty());
    }

    #[tokio::test]
    async fn test_blank_input_and_welcome() {
        let api = Arc::new(MockChatApi::new());
        let chat = session(&api, TtsTarget::Disabled);

        assert!(chat.welcome());
        assert!(!chat.welcome());
        assert_eq!(chat.submit("   ").await, SubmitOutcome::Ignored);
        assert!(api.requests().is_empty());

        let messages = chat.transcript().snapshot();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::Welcome);

        chat.clear();
        assert!(chat.transcript().is_empty());
        assert!(chat.welcome());
    }

    #[tokio::test]
    async fn test_listen_errors_propagate_without_submitting() {
        let api = Arc::new(MockChatApi::new());
        let chat = session(&api, TtsTarget::Disabled);
        let recognizer = Arc::new(MockRecognizer::new());
        recognizer.push_script(vec![
            voice_local::RecognitionEvent::Started,
            voice_local::RecognitionEvent::Error("not-allowed".into()),
        ]);
        let input = VoiceInputController::new(recognizer, RecognitionConfig::default());

        let err = chat.listen_and_submit(&input).await.unwrap_err();
        assert_eq!(err, RecognitionError::PermissionDenied);
        assert!(chat.transcript().is_empty());
        assert!(api.requests().is_empty());
    }
}
