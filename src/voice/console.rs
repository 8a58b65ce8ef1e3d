//! Typed-input recognizer
//!
//! Treats the next line typed while armed as the spoken utterance. Used when
//! no microphone or STT credential is available, and in tests.

use std::sync::{Arc, Mutex, PoisonError};

use super::{
    ListenId, Recognition, RecognitionError, RecognitionEvent, RecognitionSender,
    SpeechRecognizer,
};

/// Listening session currently armed, if any
type Armed = Arc<Mutex<Option<ListenId>>>;

fn take(armed: &Armed) -> Option<ListenId> {
    armed.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// Recognizer half owned by the assistant
#[derive(Debug)]
pub struct ConsoleRecognizer {
    events: RecognitionSender,
    armed: Armed,
}

/// Input half owned by whoever reads the terminal
#[derive(Debug, Clone)]
pub struct ConsoleInput {
    events: RecognitionSender,
    armed: Armed,
}

impl ConsoleRecognizer {
    #[must_use]
    pub fn new(events: RecognitionSender) -> (Self, ConsoleInput) {
        let armed = Armed::default();
        let input = ConsoleInput {
            events: events.clone(),
            armed: Arc::clone(&armed),
        };
        (Self { events, armed }, input)
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn start(&mut self, listen: ListenId) -> Result<(), RecognitionError> {
        let previous = self
            .armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(listen);
        if previous != Some(listen) {
            let _ = self
                .events
                .send(Recognition::new(listen, RecognitionEvent::Started));
        }
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(listen) = take(&self.armed) {
            let _ = self
                .events
                .send(Recognition::new(listen, RecognitionEvent::Ended));
        }
    }

    fn abort(&mut self) {
        take(&self.armed);
    }
}

impl ConsoleInput {
    /// Whether a line would currently be taken as speech
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Deliver a line as the final transcript if listening
    ///
    /// Returns `false` (and does nothing) when not armed.
    pub fn offer(&self, line: &str) -> bool {
        let Some(listen) = take(&self.armed) else {
            return false;
        };
        let text = line.trim();
        let event = if text.is_empty() {
            RecognitionEvent::Error(RecognitionError::NoSpeech)
        } else {
            RecognitionEvent::Final(text.to_string())
        };
        let _ = self.events.send(Recognition::new(listen, event));
        let _ = self
            .events
            .send(Recognition::new(listen, RecognitionEvent::Ended));
        true
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn event(rx: &mut mpsc::UnboundedReceiver<Recognition>) -> RecognitionEvent {
        rx.try_recv().unwrap().event
    }

    #[test]
    fn test_offer_only_while_armed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut recognizer, input) = ConsoleRecognizer::new(tx);

        assert!(!input.offer("ignored"));
        assert!(rx.try_recv().is_err());

        recognizer.start(ListenId::new(1)).unwrap();
        assert_eq!(event(&mut rx), RecognitionEvent::Started);
        assert!(input.is_armed());

        assert!(input.offer("  what time is it  "));
        assert_eq!(
            rx.try_recv().unwrap(),
            Recognition::new(
                ListenId::new(1),
                RecognitionEvent::Final("what time is it".to_string())
            )
        );
        assert_eq!(event(&mut rx), RecognitionEvent::Ended);
        assert!(!input.is_armed());
    }

    #[test]
    fn test_blank_line_is_no_speech() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut recognizer, input) = ConsoleRecognizer::new(tx);
        recognizer.start(ListenId::new(1)).unwrap();
        let _ = rx.try_recv();

        assert!(input.offer("   "));
        assert_eq!(
            event(&mut rx),
            RecognitionEvent::Error(RecognitionError::NoSpeech)
        );
    }

    #[test]
    fn test_stop_ends_and_abort_is_silent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut recognizer, input) = ConsoleRecognizer::new(tx);

        recognizer.start(ListenId::new(1)).unwrap();
        let _ = rx.try_recv();
        recognizer.stop();
        assert_eq!(event(&mut rx), RecognitionEvent::Ended);

        recognizer.start(ListenId::new(2)).unwrap();
        let _ = rx.try_recv();
        recognizer.abort();
        assert!(rx.try_recv().is_err());
        assert!(!input.offer("too late"));
    }

    #[test]
    fn test_events_carry_latest_session() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut recognizer, input) = ConsoleRecognizer::new(tx);

        recognizer.start(ListenId::new(3)).unwrap();
        recognizer.start(ListenId::new(4)).unwrap();
        assert_eq!(rx.try_recv().unwrap().listen, ListenId::new(3));
        assert_eq!(rx.try_recv().unwrap().listen, ListenId::new(4));

        input.offer("hello");
        assert_eq!(rx.try_recv().unwrap().listen, ListenId::new(4));
    }
}
