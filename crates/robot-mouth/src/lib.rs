//! robot-mouth: best-effort speech delivery to the remote robot voice device
//!
//! The device exposes `GET /health`, `POST /speak` and `POST /stop`. Every
//! dispatcher operation reports success as a boolean so callers never need
//! to handle transport errors. A `mock` transport is enabled by default so
//! tests and demos run without hardware.

mod types;
pub use types::{
    AttemptOutcome, DispatchAttempt, DispatchReport, RobotMouthConfig, RobotVoiceConfig,
    SpeakRequest,
};

mod error;
pub use error::{Result, TransportError};

mod traits;
pub use traits::SpeechTransport;

mod http;
pub use http::HttpTransport;

mod dispatcher;
pub use dispatcher::{estimate_speech_duration, RemoteSpeechDispatcher};

mod monitor;
pub use monitor::{spawn_connection_monitor, ConnectionMonitor, DEFAULT_MONITOR_INTERVAL};

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockReply, MockTransport};
