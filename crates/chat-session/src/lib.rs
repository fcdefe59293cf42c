//! chat-session: the Edu-Ardu conversation loop
//!
//! A [`ChatSession`] echoes the user's message, asks the AI backend for an
//! answer and hands the answer to either local speech or the robot. The
//! transcript is a shared handle so a UI can render it while a round-trip
//! is in flight.

mod types;
pub use types::{
    ChatApiConfig, ChatMessage, ChatReply, ChatRequest, MessageKind, Sender, TtsStatus,
    DEFAULT_MODEL, FAILURE_TEXT, WELCOME_TEXT,
};

mod error;
pub use error::{ChatError, Result};

mod traits;
pub use traits::ChatApi;

mod http;
pub use http::HttpChatApi;

mod transcript;
pub use transcript::Transcript;

mod session;
pub use session::{ChatSession, SubmitOutcome, TtsTarget};

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockChatApi, MockChatReply};
