//! Shared test utilities

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use secrecy::ExposeSecret;
use tokio::sync::mpsc;

use herald::voice::{
    AudioSink, ListenId, Recognition, RecognitionError, RecognitionEvent, RecognitionSender,
    SpeechRecognizer, SpeechRequest, SpeechSynthesizer, StopSignal, SynthesisError,
};
use herald::{
    Assistant, AssistantHandle, AssistantOptions, AssistantUpdate, Collaborators, FixedClock,
    MemorySettingsStore, ResponseGenerator, Settings, SettingsOverrides,
};

/// Saturday 2024-06-01 14:05
#[must_use]
pub fn fixed_instant() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .and_then(|d| d.and_hms_opt(14, 5, 0))
        .expect("valid date")
}

#[must_use]
pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(fixed_instant()))
}

/// Seeded generator reading the fixed clock
#[must_use]
pub fn generator() -> ResponseGenerator {
    ResponseGenerator::seeded(fixed_clock(), 7)
}

/// Records recognizer calls; optionally refuses to start
#[derive(Debug, Clone, Default)]
pub struct FakeRecognizer {
    pub calls: Arc<Mutex<Vec<&'static str>>>,
    pub listens: Arc<Mutex<Vec<ListenId>>>,
    pub start_error: Option<RecognitionError>,
}

impl FakeRecognizer {
    #[must_use]
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Session ids passed to `start`, oldest first
    #[must_use]
    pub fn listens(&self) -> Vec<ListenId> {
        self.listens.lock().expect("listens lock").clone()
    }
}

impl SpeechRecognizer for FakeRecognizer {
    fn start(&mut self, listen: ListenId) -> Result<(), RecognitionError> {
        self.calls.lock().expect("calls lock").push("start");
        self.listens.lock().expect("listens lock").push(listen);
        match &self.start_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn stop(&mut self) {
        self.calls.lock().expect("calls lock").push("stop");
    }

    fn abort(&mut self) {
        self.calls.lock().expect("calls lock").push("abort");
    }
}

/// What the fake synthesizer saw
#[derive(Debug, Clone, PartialEq)]
pub struct SeenRequest {
    pub text: String,
    pub voice_id: String,
    pub speed: f32,
    pub api_key: String,
}

/// Returns a canned result for every request
#[derive(Debug, Clone)]
pub struct FakeSynthesizer {
    pub result: Result<Vec<u8>, SynthesisError>,
    pub seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl FakeSynthesizer {
    #[must_use]
    pub fn returning(result: Result<Vec<u8>, SynthesisError>) -> Self {
        Self {
            result,
            seen: Arc::default(),
        }
    }

    #[must_use]
    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().expect("seen lock").clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, SynthesisError> {
        self.seen.lock().expect("seen lock").push(SeenRequest {
            text: request.text.clone(),
            voice_id: request.voice_id.clone(),
            speed: request.speed,
            api_key: request.api_key.expose_secret().to_string(),
        });
        self.result.clone()
    }
}

/// Pretends to play for a fixed duration, honoring the stop signal
#[derive(Debug, Clone)]
pub struct FakeSink {
    pub duration: Duration,
    pub fail: bool,
    pub played: Arc<Mutex<Vec<(usize, f32)>>>,
}

impl Default for FakeSink {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(500),
            fail: false,
            played: Arc::default(),
        }
    }
}

impl FakeSink {
    #[must_use]
    pub fn played(&self) -> Vec<(usize, f32)> {
        self.played.lock().expect("played lock").clone()
    }
}

#[async_trait]
impl AudioSink for FakeSink {
    async fn play(&self, audio: Vec<u8>, volume: f32, stop: StopSignal) -> herald::Result<()> {
        self.played
            .lock()
            .expect("played lock")
            .push((audio.len(), volume));
        if self.fail {
            return Err(herald::Error::Audio("device unplugged".to_string()));
        }

        let step = Duration::from_millis(50);
        let mut elapsed = Duration::ZERO;
        while elapsed < self.duration && !stop.is_stopped() {
            tokio::time::sleep(step).await;
            elapsed += step;
        }
        Ok(())
    }
}

/// A running assistant wired to fakes
pub struct Harness {
    pub handle: AssistantHandle,
    pub updates: mpsc::UnboundedReceiver<AssistantUpdate>,
    pub recognition: RecognitionSender,
    pub recognizer: FakeRecognizer,
    pub synthesizer: FakeSynthesizer,
    pub sink: FakeSink,
    pub store: Arc<MemorySettingsStore>,
    pub driver: tokio::task::JoinHandle<()>,
}

/// Settings with a synthesis credential
#[must_use]
pub fn voiced_settings() -> Settings {
    Settings {
        api_key: "test-key".to_string(),
        ..Settings::default()
    }
}

/// Spawn an assistant with short, fixed delays
#[must_use]
pub fn spawn_assistant(
    settings: Settings,
    recognizer: FakeRecognizer,
    synthesizer: FakeSynthesizer,
    sink: FakeSink,
) -> Harness {
    spawn_with_overrides(
        settings,
        SettingsOverrides::default(),
        recognizer,
        synthesizer,
        sink,
    )
}

/// Like [`spawn_assistant`], with session-only overrides over `settings`
#[must_use]
pub fn spawn_with_overrides(
    settings: Settings,
    overrides: SettingsOverrides,
    recognizer: FakeRecognizer,
    synthesizer: FakeSynthesizer,
    sink: FakeSink,
) -> Harness {
    let (recognition, events) = mpsc::unbounded_channel();
    let store = Arc::new(MemorySettingsStore::new(settings.clone()));

    let collaborators = Collaborators {
        generator: generator(),
        recognizer: Box::new(recognizer.clone()),
        synthesizer: Arc::new(synthesizer.clone()),
        sink: Arc::new(sink.clone()),
        store: store.clone(),
        clock: fixed_clock(),
    };
    let options = AssistantOptions {
        thinking_min: Duration::from_millis(1000),
        thinking_max: Duration::from_millis(1000),
        restart_delay: Duration::from_millis(1000),
    };

    let (assistant, handle, updates) = Assistant::new(collaborators, events, settings, options);
    let driver = tokio::spawn(assistant.with_overrides(overrides).run());

    Harness {
        handle,
        updates,
        recognition,
        recognizer,
        synthesizer,
        sink,
        store,
        driver,
    }
}

impl Harness {
    /// Deliver an event as the most recently started listening session
    pub fn hear(&self, event: RecognitionEvent) {
        let listen = *self
            .recognizer
            .listens()
            .last()
            .expect("recognizer was never started");
        self.hear_from(listen, event);
    }

    /// Deliver an event tagged with a specific session
    pub fn hear_from(&self, listen: ListenId, event: RecognitionEvent) {
        self.recognition
            .send(Recognition::new(listen, event))
            .expect("assistant exited");
    }

    /// Next update matching `pick`, skipping others
    pub async fn next_matching<T>(
        &mut self,
        mut pick: impl FnMut(AssistantUpdate) -> Option<T>,
    ) -> T {
        let wait = async {
            loop {
                let update = self.updates.recv().await.expect("assistant exited");
                if let Some(found) = pick(update) {
                    return found;
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(60), wait)
            .await
            .expect("timed out waiting for update")
    }

    /// Let every pending timer and task run
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_secs(10)).await;
    }

    /// Drain the updates received so far
    pub fn drain(&mut self) -> Vec<AssistantUpdate> {
        let mut out = Vec::new();
        while let Ok(update) = self.updates.try_recv() {
            out.push(update);
        }
        out
    }
}
