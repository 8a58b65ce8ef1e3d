//! Energy-based utterance segmentation
//!
//! Splits a microphone stream into one utterance: speech onset, then enough
//! trailing silence to call it finished.

use super::capture::SAMPLE_RATE;

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to count (0.3 seconds)
const MIN_SPEECH_SAMPLES: usize = SAMPLE_RATE as usize * 3 / 10;

/// Silence duration that ends an utterance (0.5 seconds)
const SILENCE_SAMPLES: usize = SAMPLE_RATE as usize / 2;

/// Give up if nobody speaks for this long (8 seconds)
const NO_SPEECH_TIMEOUT_SAMPLES: usize = SAMPLE_RATE as usize * 8;

/// Result of feeding a chunk of audio
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentStatus {
    /// Nothing heard yet
    Waiting,
    /// Speech in progress
    Speaking,
    /// A full utterance is ready
    Complete(Vec<f32>),
    /// Waited too long without hearing speech
    TimedOut,
}

/// Accumulates audio until one utterance is complete
#[derive(Debug, Default)]
pub struct UtteranceSegmenter {
    speech_buffer: Vec<f32>,
    in_speech: bool,
    silence_counter: usize,
    waited: usize,
}

impl UtteranceSegmenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of 16kHz mono samples
    pub fn process(&mut self, samples: &[f32]) -> SegmentStatus {
        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        if !self.in_speech {
            if !is_speech {
                self.waited += samples.len();
                if self.waited > NO_SPEECH_TIMEOUT_SAMPLES {
                    self.reset();
                    return SegmentStatus::TimedOut;
                }
                return SegmentStatus::Waiting;
            }
            tracing::trace!(energy, "speech onset");
            self.in_speech = true;
            self.silence_counter = 0;
            self.speech_buffer.clear();
        }

        self.speech_buffer.extend_from_slice(samples);
        if is_speech {
            self.silence_counter = 0;
        } else {
            self.silence_counter += samples.len();
        }

        if self.silence_counter > SILENCE_SAMPLES {
            if self.speech_buffer.len() > MIN_SPEECH_SAMPLES + self.silence_counter {
                tracing::debug!(samples = self.speech_buffer.len(), "utterance complete");
                let utterance = std::mem::take(&mut self.speech_buffer);
                self.reset();
                return SegmentStatus::Complete(utterance);
            }
            // Too short to be speech, keep waiting
            self.in_speech = false;
            self.speech_buffer.clear();
            return SegmentStatus::Waiting;
        }

        SegmentStatus::Speaking
    }

    /// Drop everything and start over
    pub fn reset(&mut self) {
        self.speech_buffer.clear();
        self.in_speech = false;
        self.silence_counter = 0;
        self.waited = 0;
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
