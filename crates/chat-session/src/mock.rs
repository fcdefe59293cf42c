use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::{ChatApi, ChatError, ChatReply, ChatRequest, Result};

/// Scripted answer for one chat call.
#[derive(Debug, Clone, PartialEq)]
pub enum MockChatReply {
    Reply(ChatReply),
    Fail(ChatError),
    /// Never answers
    Hang,
}

#[derive(Default)]
struct MockChatState {
    replies: VecDeque<MockChatReply>,
    requests: Vec<ChatRequest>,
}

/// Chat API double. Unscripted calls echo the message back.
#[derive(Default)]
pub struct MockChatApi {
    state: Mutex<MockChatState>,
}

impl MockChatApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, reply: MockChatReply) {
        self.lock().replies.push_back(reply);
    }

    pub fn push_text(&self, response: &str) {
        self.push(MockChatReply::Reply(ChatReply::text(response)));
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.lock().requests.clone()
    }
}

#[async_trait]
impl ChatApi for MockChatApi {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply> {
        let reply = {
            let mut state = self.lock();
            state.requests.push(request.clone());
            state.replies.pop_front()
        };
        match reply {
            Some(MockChatReply::Reply(reply)) => Ok(reply),
            Some(MockChatReply::Fail(e)) => Err(e),
            Some(MockChatReply::Hang) => std::future::pending().await,
            None => Ok(ChatReply::text(format!("Você disse: {}", request.message))),
        }
    }
}
