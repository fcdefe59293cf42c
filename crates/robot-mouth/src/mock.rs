use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{Result, SpeakRequest, SpeechTransport, TransportError};

/// How the mock answers one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockReply {
    Ok,
    Status(u16),
    NetworkError,
    /// Never answers; only a timeout ends the call
    Hang,
}

struct MockState {
    health: VecDeque<MockReply>,
    speak: VecDeque<MockReply>,
    stop: VecDeque<MockReply>,
    fallback: MockReply,
    speak_requests: Vec<SpeakRequest>,
    speak_times: Vec<Instant>,
    health_calls: usize,
    stop_calls: usize,
}

/// Scripted transport. Each call pops the next reply for its endpoint and
/// falls back to a fixed reply (default `Ok`) once the queue is empty.
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                health: VecDeque::new(),
                speak: VecDeque::new(),
                stop: VecDeque::new(),
                fallback: MockReply::Ok,
                speak_requests: Vec::new(),
                speak_times: Vec::new(),
                health_calls: 0,
                stop_calls: 0,
            }),
        }
    }

    /// Mock whose every call gets `reply`.
    pub fn always(reply: MockReply) -> Self {
        let mock = Self::new();
        mock.lock().fallback = reply;
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_health(&self, reply: MockReply) {
        self.lock().health.push_back(reply);
    }

    pub fn push_speak(&self, reply: MockReply) {
        self.lock().speak.push_back(reply);
    }

    pub fn push_stop(&self, reply: MockReply) {
        self.lock().stop.push_back(reply);
    }

    pub fn speak_requests(&self) -> Vec<SpeakRequest> {
        self.lock().speak_requests.clone()
    }

    /// When each speak attempt reached the transport.
    pub fn speak_times(&self) -> Vec<Instant> {
        self.lock().speak_times.clone()
    }

    pub fn health_calls(&self) -> usize {
        self.lock().health_calls
    }

    pub fn stop_calls(&self) -> usize {
        self.lock().stop_calls
    }
}

async fn answer(reply: MockReply) -> Result<()> {
    match reply {
        MockReply::Ok => Ok(()),
        MockReply::Status(code) => Err(TransportError::Status(code)),
        MockReply::NetworkError => Err(TransportError::Http("connection refused".to_string())),
        MockReply::Hang => {
            std::future::pending::<()>().await;
            Ok(())
        }
    }
}

#[async_trait]
impl SpeechTransport for MockTransport {
    async fn health(&self) -> Result<()> {
        let reply = {
            let mut state = self.lock();
            state.health_calls += 1;
            let fallback = state.fallback;
            state.health.pop_front().unwrap_or(fallback)
        };
        answer(reply).await
    }

    async fn speak(&self, request: &SpeakRequest) -> Result<()> {
        let reply = {
            let mut state = self.lock();
            state.speak_requests.push(request.clone());
            state.speak_times.push(Instant::now());
            let fallback = state.fallback;
            state.speak.pop_front().unwrap_or(fallback)
        };
        answer(reply).await
    }

    async fn stop(&self) -> Result<()> {
        let reply = {
            let mut state = self.lock();
            state.stop_calls += 1;
            let fallback = state.fallback;
            state.stop.pop_front().unwrap_or(fallback)
        };
        answer(reply).await
    }
}
