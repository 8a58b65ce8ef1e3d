//! Microphone input for the recognizer's capture thread
//!
//! [`AudioCapture`] records mono 16 kHz samples into a shared queue that the
//! capture thread drains every poll and feeds to the utterance segmenter.
//! Finished utterances are packed with [`samples_to_wav`] for upload.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Rate the segmenter and Whisper upload expect
pub const SAMPLE_RATE: u32 = 16000;

/// Checked before spawning a capture thread
#[must_use]
pub fn input_device_available() -> bool {
    cpal::default_host().default_input_device().is_some()
}

/// Mono speech capture from the default input device
///
/// The cpal stream is not `Send`, so an `AudioCapture` lives and dies on the
/// capture thread that opened it.
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    /// Samples not yet handed to the segmenter
    queued: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Pick the default input device and a mono config at [`SAMPLE_RATE`]
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] when there is no input device or it cannot
    /// record mono at that rate
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| Error::Audio("no microphone".to_string()))?;

        let rate = SampleRate(SAMPLE_RATE);
        let config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1 && (c.min_sample_rate()..=c.max_sample_rate()).contains(&rate)
            })
            .ok_or_else(|| {
                Error::Audio(format!("microphone cannot record mono at {SAMPLE_RATE} Hz"))
            })?
            .with_sample_rate(rate)
            .config();

        tracing::debug!(
            microphone = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            "microphone opened"
        );

        Ok(Self {
            device,
            config,
            queued: Arc::default(),
            stream: None,
        })
    }

    /// Begin recording; a second call while recording does nothing
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if the input stream cannot be built or played
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let queued = Arc::clone(&self.queued);
        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut samples) = queued.lock() {
                        samples.extend_from_slice(data);
                    }
                },
                |err| tracing::warn!(error = %err, "microphone stream error"),
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;
        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        self.stream = Some(stream);
        tracing::debug!("listening on microphone");
        Ok(())
    }

    /// Close the input stream, keeping anything already queued
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("microphone closed");
        }
    }

    /// Hand over everything recorded since the previous drain
    #[must_use]
    pub fn drain(&self) -> Vec<f32> {
        self.queued
            .lock()
            .map(|mut samples| std::mem::take(&mut *samples))
            .unwrap_or_default()
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pack one utterance as 16-bit mono PCM WAV, the upload format for Whisper
///
/// Samples outside `-1.0..=1.0` are clipped.
///
/// # Errors
///
/// Returns [`Error::Wav`] if encoding fails
#[allow(clippy::cast_possible_truncation)]
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample((sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}
