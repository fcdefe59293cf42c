use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub const WELCOME_TEXT: &str = "👋 Olá! Eu sou sua assistente de IA do Edu-Ardu. Posso ajudar com dúvidas sobre robótica, programação, eletrônica ou qualquer outro assunto. Minhas respostas podem ser faladas pelo robô automaticamente!";
pub const FAILURE_TEXT: &str =
    "Desculpe, houve um erro ao processar sua mensagem. Tente novamente em alguns instantes.";
pub const DEFAULT_MODEL: &str = "AI Assistant";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatApiConfig {
    pub base_url: String,
    pub primary_path: String,
    /// Tried once when the primary path fails; empty disables the fallback
    pub fallback_path: String,
    pub timeout_ms: u64,
    pub context: String,
}

impl Default for ChatApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            primary_path: "/api/gemini/chat".to_string(),
            fallback_path: "/api/ai/chat".to_string(),
            timeout_ms: 30_000,
            context: "robotics_education".to_string(),
        }
    }
}

impl ChatApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Body of the chat endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

impl ChatReply {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            model: None,
            provider: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Normal,
    Welcome,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsStatus {
    Pending,
    Sent,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub text: String,
    pub sender: Sender,
    pub timestamp: OffsetDateTime,
    pub kind: MessageKind,
    pub model: Option<String>,
    /// Unset for user messages, errors and when speech is off
    pub tts_status: Option<TtsStatus>,
}

impl ChatMessage {
    fn new(text: impl Into<String>, sender: Sender, kind: MessageKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender,
            timestamp: OffsetDateTime::now_utc(),
            kind,
            model: None,
            tts_status: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User, MessageKind::Normal)
    }

    pub fn assistant(reply: &ChatReply, tts_status: Option<TtsStatus>) -> Self {
        let mut message = Self::new(reply.response.clone(), Sender::Assistant, MessageKind::Normal);
        message.model = Some(reply.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()));
        message.tts_status = tts_status;
        message
    }

    pub fn welcome() -> Self {
        Self::new(WELCOME_TEXT, Sender::Assistant, MessageKind::Welcome)
    }

    pub fn failure() -> Self {
        Self::new(FAILURE_TEXT, Sender::Assistant, MessageKind::Error)
    }
}
