use thiserror::Error;

pub type Result<T, E = ChatError> = core::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("http error: {0}")]
    Http(String),
    #[error("chat api answered HTTP {0}")]
    Status(u16),
    #[error("chat api timed out")]
    Timeout,
    #[error("invalid chat response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Http(e.to_string())
        }
    }
}
