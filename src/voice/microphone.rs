//! Microphone speech recognition
//!
//! A capture thread owns the cpal stream, segments one utterance and hands
//! it to Whisper on the tokio runtime. Events flow back through the
//! recognizer's [`RecognitionSender`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::runtime::Handle;

use super::capture::{AudioCapture, SAMPLE_RATE, input_device_available, samples_to_wav};
use super::segmenter::{SegmentStatus, UtteranceSegmenter};
use super::stt::WhisperTranscriber;
use super::{
    ListenId, Recognition, RecognitionError, RecognitionEvent, RecognitionSender,
    SpeechRecognizer,
};

/// How often the capture thread drains the input buffer
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Flags shared with one capture thread
#[derive(Debug, Clone, Default)]
struct Control {
    stop: Arc<AtomicBool>,
    aborted: Arc<AtomicBool>,
}

impl Control {
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

/// Recognizes one utterance per `start` from the default microphone
pub struct MicrophoneRecognizer {
    events: RecognitionSender,
    transcriber: Arc<WhisperTranscriber>,
    runtime: Handle,
    active: Option<(Control, JoinHandle<()>)>,
    /// Signalled thread that may still hold the input stream
    retiring: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for MicrophoneRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MicrophoneRecognizer")
            .field("active", &self.active.is_some())
            .finish_non_exhaustive()
    }
}

impl MicrophoneRecognizer {
    /// Must be called from within a tokio runtime
    #[must_use]
    pub fn new(events: RecognitionSender, transcriber: WhisperTranscriber) -> Self {
        Self {
            events,
            transcriber: Arc::new(transcriber),
            runtime: Handle::current(),
            active: None,
            retiring: None,
        }
    }

    fn signal(&mut self, abort: bool) {
        let Some((control, handle)) = self.active.take() else {
            return;
        };
        if abort {
            control.aborted.store(true, Ordering::SeqCst);
        }
        control.stop.store(true, Ordering::SeqCst);
        // Exits within one poll interval; joined by the next start
        self.retiring = Some(handle);
    }
}

impl SpeechRecognizer for MicrophoneRecognizer {
    fn start(&mut self, listen: ListenId) -> Result<(), RecognitionError> {
        // Events from a superseded capture keep its old id
        self.signal(false);
        if let Some(handle) = self.retiring.take() {
            let _ = handle.join();
        }
        if !input_device_available() {
            return Err(RecognitionError::NoMicrophone);
        }

        let control = Control::default();
        let worker = CaptureWorker {
            listen,
            control: control.clone(),
            events: self.events.clone(),
            transcriber: Arc::clone(&self.transcriber),
            runtime: self.runtime.clone(),
        };

        tracing::debug!(%listen, "starting microphone capture");
        let handle = std::thread::Builder::new()
            .name(format!("herald-capture-{listen}"))
            .spawn(move || worker.run())
            .map_err(|e| RecognitionError::Other(e.to_string()))?;

        self.active = Some((control, handle));
        Ok(())
    }

    fn stop(&mut self) {
        self.signal(false);
    }

    fn abort(&mut self) {
        self.signal(true);
    }
}

impl Drop for MicrophoneRecognizer {
    fn drop(&mut self) {
        self.signal(true);
    }
}

struct CaptureWorker {
    listen: ListenId,
    control: Control,
    events: RecognitionSender,
    transcriber: Arc<WhisperTranscriber>,
    runtime: Handle,
}

impl CaptureWorker {
    fn emit(&self, event: RecognitionEvent) {
        if !self.control.aborted() {
            let _ = self.events.send(Recognition::new(self.listen, event));
        }
    }

    fn fail(&self, error: RecognitionError) {
        self.emit(RecognitionEvent::Error(error));
        self.emit(RecognitionEvent::Ended);
    }

    fn run(self) {
        let mut capture = match AudioCapture::new().and_then(|mut c| c.start().map(|()| c)) {
            Ok(capture) => capture,
            Err(e) => {
                tracing::error!(error = %e, "failed to open microphone");
                self.fail(RecognitionError::NoMicrophone);
                return;
            }
        };

        self.emit(RecognitionEvent::Started);
        let mut segmenter = UtteranceSegmenter::new();

        loop {
            std::thread::sleep(POLL_INTERVAL);
            if self.control.stopped() {
                capture.stop();
                self.emit(RecognitionEvent::Ended);
                return;
            }

            match segmenter.process(&capture.drain()) {
                SegmentStatus::Waiting | SegmentStatus::Speaking => {}
                SegmentStatus::TimedOut => {
                    capture.stop();
                    self.fail(RecognitionError::NoSpeech);
                    return;
                }
                SegmentStatus::Complete(samples) => {
                    capture.stop();
                    self.transcribe(&samples);
                    return;
                }
            }
        }
    }

    fn transcribe(self, samples: &[f32]) {
        let wav = match samples_to_wav(samples, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => {
                self.fail(RecognitionError::Other(e.to_string()));
                return;
            }
        };

        let runtime = self.runtime.clone();
        runtime.spawn(async move {
            let result = self.transcriber.transcribe(wav).await;
            match result {
                Ok(text) => {
                    self.emit(RecognitionEvent::Final(text));
                    self.emit(RecognitionEvent::Ended);
                }
                Err(error) => self.fail(error),
            }
        });
    }
}
