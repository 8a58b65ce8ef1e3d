//! Text-to-speech (TTS) via the `ElevenLabs` API

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Production API base URL
pub const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";

/// Model used for every request
pub const DEFAULT_MODEL: &str = "eleven_monolingual_v1";

/// Fixed voice shaping parameters
const STABILITY: f32 = 0.5;
const SIMILARITY_BOOST: f32 = 0.5;
const STYLE: f32 = 0.5;

/// Synthesis failures, classified by how they are reported
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    /// HTTP 401
    #[error("invalid API credential")]
    Unauthorized,

    /// HTTP 429
    #[error("rate limited")]
    RateLimited,

    /// Any other status or transport failure
    #[error("synthesis failed: {0}")]
    Failed(String),
}

impl SynthesisError {
    /// Classify a non-success HTTP response
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            _ => Self::Failed(format!("ElevenLabs API error {status}: {body}")),
        }
    }

    /// Notification text for the user
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Unauthorized => {
                "Invalid API key. Please check your ElevenLabs API key in settings."
            }
            Self::RateLimited => "API rate limit exceeded. Please try again later.",
            Self::Failed(_) => {
                "Unable to play audio response. Please check your API key and internet connection."
            }
        }
    }
}

impl From<reqwest::Error> for SynthesisError {
    fn from(e: reqwest::Error) -> Self {
        Self::Failed(e.to_string())
    }
}

/// Everything needed for one synthesis call
#[derive(Debug)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: String,
    /// Speaking rate, 1.0 is normal
    pub speed: f32,
    pub api_key: SecretString,
}

/// Turns text into audio bytes
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize speech, returning encoded audio (MP3)
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or is rejected
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, SynthesisError>;
}

/// Synthesizes speech through `ElevenLabs`
#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl Default for ElevenLabsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ElevenLabsClient {
    /// Create a client for the production endpoint
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(ELEVENLABS_BASE_URL)
    }

    /// Create a client for another endpoint (tests, proxies)
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(serde::Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    speed: f32,
}

#[derive(serde::Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, SynthesisError> {
        let url = format!("{}/v1/text-to-speech/{}", self.base_url, request.voice_id);

        let body = ElevenLabsRequest {
            text: &request.text,
            model_id: &self.model,
            voice_settings: VoiceSettings {
                stability: STABILITY,
                similarity_boost: SIMILARITY_BOOST,
                style: STYLE,
                speed: request.speed,
            },
        };

        tracing::debug!(
            voice = %request.voice_id,
            chars = request.text.len(),
            "requesting speech synthesis"
        );

        let response = self
            .client
            .post(&url)
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", request.api_key.expose_secret().trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "ElevenLabs request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "ElevenLabs API error");
            return Err(SynthesisError::from_status(status, &body));
        }

        let audio = response.bytes().await?;
        tracing::debug!(bytes = audio.len(), "synthesis complete");
        Ok(audio.to_vec())
    }
}
