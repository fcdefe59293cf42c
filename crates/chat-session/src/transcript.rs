use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::{ChatMessage, TtsStatus};

/// Shared, append-mostly message list. Clones observe the same transcript.
#[derive(Clone, Default)]
pub struct Transcript {
    messages: Arc<Mutex<Vec<ChatMessage>>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ChatMessage>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append and return the message id.
    pub fn push(&self, message: ChatMessage) -> Uuid {
        let id = message.id;
        self.lock().push(message);
        id
    }

    /// Returns false when the message is gone (e.g. after `clear`).
    pub fn set_tts_status(&self, id: Uuid, status: TtsStatus) -> bool {
        match self.lock().iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.tts_status = Some(status);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: Uuid) -> Option<ChatMessage> {
        self.lock().iter().find(|m| m.id == id).cloned()
    }

    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.lock().clone()
    }

    pub fn last_assistant_text(&self) -> Option<String> {
        self.lock()
            .iter()
            .rev()
            .find(|m| m.sender == crate::Sender::Assistant && m.kind == crate::MessageKind::Normal)
            .map(|m| m.text.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChatReply;

    #[test]
    fn test_status_update_is_visible_to_clones() {
        let transcript = Transcript::new();
        let view = transcript.clone();
        transcript.push(ChatMessage::user("oi"));
        let id = transcript.push(ChatMessage::assistant(
            &ChatReply::text("olá"),
            Some(TtsStatus::Pending),
        ));

        assert!(transcript.set_tts_status(id, TtsStatus::Sent));
        assert_eq!(view.get(id).unwrap().tts_status, Some(TtsStatus::Sent));
        assert_eq!(view.last_assistant_text().as_deref(), Some("olá"));

        view.clear();
        assert!(transcript.is_empty());
        assert!(!transcript.set_tts_status(id, TtsStatus::Failed));
    }
}
