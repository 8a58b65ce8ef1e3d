//! Speech recognition capability
//!
//! Engines push [`RecognitionEvent`]s through a channel; the session only
//! consumes final transcripts and start/error/end lifecycle events. Each
//! event is stamped with the [`ListenId`] of the `start` that produced it,
//! so a late event from an earlier listening session can be told apart.

use std::fmt;

use thiserror::Error;
use tokio::sync::mpsc;

/// Channel engines publish their events on
pub type RecognitionSender = mpsc::UnboundedSender<Recognition>;

/// Receiving side of [`RecognitionSender`]
pub type RecognitionReceiver = mpsc::UnboundedReceiver<Recognition>;

/// Identifies one listening session, issued per `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenId(u64);

impl ListenId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ListenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An event together with the session it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognition {
    pub listen: ListenId,
    pub event: RecognitionEvent,
}

impl Recognition {
    #[must_use]
    pub const fn new(listen: ListenId, event: RecognitionEvent) -> Self {
        Self { listen, event }
    }
}

/// Lifecycle and transcript events from a recognition engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    /// Partial transcript, may still change
    Interim(String),
    /// Finalized transcript for one utterance
    Final(String),
    Error(RecognitionError),
    Ended,
}

/// Recognition failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("no speech detected")]
    NoSpeech,

    #[error("no microphone available")]
    NoMicrophone,

    #[error("network error: {0}")]
    Network(String),

    #[error("recognition error: {0}")]
    Other(String),
}

impl RecognitionError {
    /// Map an engine error code (`not-allowed`, `no-speech`, `audio-capture`,
    /// `network`, ...) onto the taxonomy
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "not-allowed" | "service-not-allowed" => Self::PermissionDenied,
            "no-speech" => Self::NoSpeech,
            "audio-capture" => Self::NoMicrophone,
            "network" => Self::Network(code.to_string()),
            other => Self::Other(other.to_string()),
        }
    }

    /// Notification text for the user
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Microphone access denied. Please enable microphone permissions and try again."
            }
            Self::NoSpeech => "No speech detected. Please try speaking more clearly.",
            Self::NoMicrophone => "No microphone found. Please check your audio devices.",
            Self::Network(_) => "Network error occurred. Please check your internet connection.",
            Self::Other(_) => "Speech recognition error. Please try again.",
        }
    }
}

/// A speech-to-text engine the session can arm and disarm
///
/// Implementations report progress asynchronously through the
/// [`RecognitionSender`] they were built with.
pub trait SpeechRecognizer: Send {
    /// Begin capturing one utterance, stamping its events with `listen`
    ///
    /// # Errors
    ///
    /// Returns error if the engine cannot start
    fn start(&mut self, listen: ListenId) -> Result<(), RecognitionError>;

    /// Stop capturing; the engine may still deliver a final result
    fn stop(&mut self);

    /// Stop capturing and drop any pending result
    fn abort(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            RecognitionError::from_code("not-allowed"),
            RecognitionError::PermissionDenied
        );
        assert_eq!(RecognitionError::from_code("no-speech"), RecognitionError::NoSpeech);
        assert_eq!(
            RecognitionError::from_code("audio-capture"),
            RecognitionError::NoMicrophone
        );
        assert!(matches!(
            RecognitionError::from_code("network"),
            RecognitionError::Network(_)
        ));
        assert!(matches!(
            RecognitionError::from_code("aborted"),
            RecognitionError::Other(_)
        ));
    }

    #[test]
    fn test_user_messages() {
        assert!(RecognitionError::PermissionDenied
            .user_message()
            .starts_with("Microphone access denied"));
        assert!(RecognitionError::Other("x".into())
            .user_message()
            .contains("try again"));
    }
}
