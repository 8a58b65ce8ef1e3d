//! Speech-to-text (STT) via `OpenAI` Whisper

use secrecy::{ExposeSecret, SecretString};

use super::RecognitionError;
use crate::{Error, Result};

/// Production API base URL
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Default transcription model
pub const DEFAULT_STT_MODEL: &str = "whisper-1";

/// Response from `OpenAI` Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes WAV audio to text
#[derive(Debug)]
pub struct WhisperTranscriber {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl WhisperTranscriber {
    /// Create a transcriber for the production endpoint
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: SecretString) -> Result<Self> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for Whisper".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_STT_MODEL.to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
        })
    }

    /// Point at another endpoint (tests, proxies)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Transcribe one utterance
    ///
    /// An empty transcript is reported as [`RecognitionError::NoSpeech`].
    ///
    /// # Errors
    ///
    /// Returns `Network` on transport failure and `Other` when the API
    /// rejects the request
    pub async fn transcribe(&self, wav: Vec<u8>) -> std::result::Result<String, RecognitionError> {
        tracing::debug!(audio_bytes = wav.len(), "starting Whisper transcription");

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| RecognitionError::Other(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose_secret().trim())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                RecognitionError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(RecognitionError::Other(format!(
                "Whisper API error {status}"
            )));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            RecognitionError::Other(e.to_string())
        })?;

        let text = result.text.trim();
        if text.is_empty() {
            return Err(RecognitionError::NoSpeech);
        }

        tracing::info!(transcript = %text, "transcription complete");
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_rejected() {
        let err = WhisperTranscriber::new(SecretString::from("  ")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_base_url_override() {
        let stt = WhisperTranscriber::new(SecretString::from("sk-test"))
            .unwrap()
            .with_base_url("http://127.0.0.1:1/");
        assert_eq!(stt.base_url, "http://127.0.0.1:1");
        assert_eq!(stt.model, DEFAULT_STT_MODEL);
    }
}
