//! Voice processing module
//!
//! Speech recognition (microphone or typed), speech synthesis through
//! `ElevenLabs`, and audio playback.

mod capture;
mod console;
mod microphone;
mod playback;
mod recognition;
mod segmenter;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, input_device_available, samples_to_wav};
pub use console::{ConsoleInput, ConsoleRecognizer};
pub use microphone::MicrophoneRecognizer;
pub use playback::{AudioPlayback, AudioSink, NullSink, StopSignal};
pub use recognition::{
    ListenId, Recognition, RecognitionError, RecognitionEvent, RecognitionReceiver,
    RecognitionSender, SpeechRecognizer,
};
pub use segmenter::{SegmentStatus, UtteranceSegmenter};
pub use stt::{DEFAULT_STT_MODEL, OPENAI_BASE_URL, WhisperTranscriber};
pub use tts::{
    DEFAULT_MODEL, ELEVENLABS_BASE_URL, ElevenLabsClient, SpeechRequest, SpeechSynthesizer,
    SynthesisError,
};
