//! Async driver for the turn state machine
//!
//! [`Assistant`] owns the [`TurnStateMachine`] and its collaborators. It
//! multiplexes user commands, recognition events and completions of the work
//! it spawned, executes the resulting [`Effect`]s, and publishes
//! [`AssistantUpdate`]s for whatever renders the session.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{mpsc, oneshot};

use crate::config::{Settings, SettingsOverrides, SettingsStore};
use crate::generator::{Clock, ResponseGenerator};
use crate::session::{
    ConversationTurn, DEFAULT_RESTART_DELAY, Effect, Notification, PlaybackOutcome, SessionPhase,
    TurnId, TurnStateMachine,
};
use crate::voice::{
    AudioSink, Recognition, RecognitionEvent, RecognitionReceiver, SpeechRecognizer,
    SpeechRequest, SpeechSynthesizer, StopSignal, SynthesisError,
};
use crate::{Error, Result};

/// Sentence spoken by the voice test
pub const TEST_VOICE_TEXT: &str = "Hello! This is a test of your selected voice settings. Your AI assistant is working perfectly.";

pub const SETTINGS_SAVED_MESSAGE: &str = "Settings saved successfully!";
pub const SETTINGS_SAVE_FAILED_MESSAGE: &str = "Failed to save settings.";

/// Canned requests offered as shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuickAction {
    Greeting,
    Time,
    Weather,
    Joke,
    Calculate,
    Help,
}

impl QuickAction {
    pub const ALL: [Self; 6] = [
        Self::Greeting,
        Self::Time,
        Self::Weather,
        Self::Joke,
        Self::Calculate,
        Self::Help,
    ];

    /// Text submitted on the user's behalf
    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Self::Greeting => "Hello, how are you?",
            Self::Time => "What time is it?",
            Self::Weather => "What's the weather like today?",
            Self::Joke => "Tell me a joke",
            Self::Calculate => "What is 25 x 4?",
            Self::Help => "What can you do?",
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Time => "time",
            Self::Weather => "weather",
            Self::Joke => "joke",
            Self::Calculate => "calculate",
            Self::Help => "help",
        }
    }
}

impl fmt::Display for QuickAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QuickAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| Error::Config(format!("unknown quick action: {s}")))
    }
}

/// Requests accepted by the running assistant
#[derive(Debug)]
pub enum AssistantCommand {
    StartListening,
    StopListening,
    ToggleListening,
    /// Typed or otherwise direct input
    Submit(String),
    QuickAction(QuickAction),
    /// Clear the conversation
    Clear,
    /// The session is no longer in view
    VisibilityLost,
    /// Speak [`TEST_VOICE_TEXT`] with the current settings
    TestVoice,
    /// Persist new stored settings; session overrides still apply on top
    SaveSettings(Settings),
    /// Effective settings, overrides included
    CurrentSettings(oneshot::Sender<Settings>),
    /// Settings as persisted, without session overrides
    StoredSettings(oneshot::Sender<Settings>),
    History(oneshot::Sender<Vec<ConversationTurn>>),
    Shutdown,
}

/// Changes worth showing to the user
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantUpdate {
    Phase(SessionPhase),
    Message(ConversationTurn),
    Notification(Notification),
    Interim(String),
    Cleared,
}

/// Timing knobs
#[derive(Debug, Clone, Copy)]
pub struct AssistantOptions {
    /// Shortest simulated thinking pause before replying
    pub thinking_min: Duration,
    /// Longest simulated thinking pause
    pub thinking_max: Duration,
    /// Pause before listening re-arms in continuous mode
    pub restart_delay: Duration,
}

impl Default for AssistantOptions {
    fn default() -> Self {
        Self {
            thinking_min: Duration::from_millis(1000),
            thinking_max: Duration::from_millis(2000),
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }
}

/// Everything the assistant talks to
pub struct Collaborators {
    pub generator: ResponseGenerator,
    pub recognizer: Box<dyn SpeechRecognizer>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub sink: Arc<dyn AudioSink>,
    pub store: Arc<dyn SettingsStore>,
    pub clock: Arc<dyn Clock>,
}

/// Cloneable handle for sending commands
#[derive(Debug, Clone)]
pub struct AssistantHandle {
    commands: mpsc::UnboundedSender<AssistantCommand>,
}

impl AssistantHandle {
    /// Send a command
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stopped`] if the assistant has exited
    pub fn send(&self, command: AssistantCommand) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::Stopped)
    }

    /// Submit text as if the user had said it
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stopped`] if the assistant has exited
    pub fn submit(&self, text: impl Into<String>) -> Result<()> {
        self.send(AssistantCommand::Submit(text.into()))
    }

    /// Fetch the current settings
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stopped`] if the assistant has exited
    pub async fn settings(&self) -> Result<Settings> {
        let (tx, rx) = oneshot::channel();
        self.send(AssistantCommand::CurrentSettings(tx))?;
        rx.await.map_err(|_| Error::Stopped)
    }

    /// Fetch the settings as stored, for editing and saving back
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stopped`] if the assistant has exited
    pub async fn stored_settings(&self) -> Result<Settings> {
        let (tx, rx) = oneshot::channel();
        self.send(AssistantCommand::StoredSettings(tx))?;
        rx.await.map_err(|_| Error::Stopped)
    }

    /// Fetch the conversation so far
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stopped`] if the assistant has exited
    pub async fn history(&self) -> Result<Vec<ConversationTurn>> {
        let (tx, rx) = oneshot::channel();
        self.send(AssistantCommand::History(tx))?;
        rx.await.map_err(|_| Error::Stopped)
    }

    /// Ask the assistant to stop
    pub fn shutdown(&self) {
        let _ = self.send(AssistantCommand::Shutdown);
    }
}

/// Results of spawned work, fed back into the state machine
#[derive(Debug)]
enum Completion {
    Thought { turn: TurnId, text: String },
    Synthesized {
        turn: TurnId,
        result: std::result::Result<Vec<u8>, SynthesisError>,
    },
    Played { turn: TurnId, outcome: PlaybackOutcome },
    RestartDue(TurnId),
}

/// Runs a voice assistant session
pub struct Assistant {
    machine: TurnStateMachine,
    generator: ResponseGenerator,
    recognizer: Box<dyn SpeechRecognizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
    store: Arc<dyn SettingsStore>,
    /// What the store holds
    stored: Settings,
    overrides: SettingsOverrides,
    /// `stored` with `overrides` applied
    settings: Settings,
    options: AssistantOptions,
    commands: mpsc::UnboundedReceiver<AssistantCommand>,
    recognition: RecognitionReceiver,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    updates: mpsc::UnboundedSender<AssistantUpdate>,
    playback: Option<StopSignal>,
    published_phase: SessionPhase,
}

impl fmt::Debug for Assistant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assistant")
            .field("machine", &self.machine)
            .field("settings", &self.settings)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Assistant {
    /// Wire up an assistant
    ///
    /// `recognition` must be the receiving end of the channel the recognizer
    /// publishes on. Returns the assistant, a command handle and the update
    /// stream.
    #[must_use]
    pub fn new(
        collaborators: Collaborators,
        recognition: RecognitionReceiver,
        settings: Settings,
        options: AssistantOptions,
    ) -> (Self, AssistantHandle, mpsc::UnboundedReceiver<AssistantUpdate>) {
        let Collaborators {
            generator,
            recognizer,
            synthesizer,
            sink,
            store,
            clock,
        } = collaborators;

        let stored = settings.normalized();
        let settings = stored.clone();
        let machine = TurnStateMachine::new(settings.session_options(options.restart_delay), clock);

        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let (updates, updates_rx) = mpsc::unbounded_channel();

        let assistant = Self {
            machine,
            generator,
            recognizer,
            synthesizer,
            sink,
            store,
            stored,
            overrides: SettingsOverrides::default(),
            settings,
            options,
            commands,
            recognition,
            completions_tx,
            completions,
            updates,
            playback: None,
            published_phase: SessionPhase::Idle,
        };

        (
            assistant,
            AssistantHandle {
                commands: commands_tx,
            },
            updates_rx,
        )
    }

    /// Layer session-only overrides over the stored settings
    ///
    /// Overrides shape this session but are never saved.
    #[must_use]
    pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
        self.overrides = overrides;
        self.refresh_settings();
        self
    }

    fn refresh_settings(&mut self) {
        self.settings = self.overrides.apply(self.stored.clone());
        self.machine
            .set_options(self.settings.session_options(self.options.restart_delay));
    }

    /// Process events until shutdown or every handle is dropped
    pub async fn run(mut self) {
        tracing::info!(
            continuous = self.settings.continuous_listening,
            voice = self.settings.synthesis_enabled(),
            "assistant started"
        );

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Some(recognition) = self.recognition.recv() => {
                    let effects = self.machine.handle_recognition(recognition);
                    self.apply(effects);
                }
                Some(completion) = self.completions.recv() => {
                    self.handle_completion(completion);
                }
            }
        }

        self.shutdown();
    }

    /// Returns `false` when the assistant should exit
    fn handle_command(&mut self, command: AssistantCommand) -> bool {
        tracing::debug!(?command, "command");
        let effects = match command {
            AssistantCommand::StartListening => self.machine.request_start(),
            AssistantCommand::StopListening => self.machine.request_stop(),
            AssistantCommand::ToggleListening => self.machine.toggle_listening(),
            AssistantCommand::Submit(text) => self.machine.submit(&text),
            AssistantCommand::QuickAction(action) => self.machine.submit(action.text()),
            AssistantCommand::Clear => self.machine.reset(),
            AssistantCommand::VisibilityLost => self.machine.visibility_lost(),
            AssistantCommand::TestVoice => self.machine.preview_voice(TEST_VOICE_TEXT),
            AssistantCommand::SaveSettings(settings) => self.save_settings(settings),
            AssistantCommand::CurrentSettings(reply) => {
                let _ = reply.send(self.settings.clone());
                Vec::new()
            }
            AssistantCommand::StoredSettings(reply) => {
                let _ = reply.send(self.stored.clone());
                Vec::new()
            }
            AssistantCommand::History(reply) => {
                let _ = reply.send(self.machine.conversation().turns().to_vec());
                Vec::new()
            }
            AssistantCommand::Shutdown => return false,
        };
        self.apply(effects);
        true
    }

    fn save_settings(&mut self, settings: Settings) -> Vec<Effect> {
        let stored = self.overrides.persistable(settings, &self.stored);
        let notification = match self.store.save(&stored) {
            Ok(()) => Notification::success(SETTINGS_SAVED_MESSAGE),
            Err(e) => {
                tracing::error!(error = %e, "failed to save settings");
                Notification::error(SETTINGS_SAVE_FAILED_MESSAGE)
            }
        };

        self.stored = stored;
        self.refresh_settings();
        vec![Effect::Notify(notification)]
    }

    fn handle_completion(&mut self, completion: Completion) {
        let effects = match completion {
            Completion::Thought { turn, text } => {
                let reply = self.generator.generate(&text);
                self.machine.handle_response(turn, &reply)
            }
            Completion::Synthesized { turn, result } => {
                self.machine.handle_synthesis_result(turn, result)
            }
            Completion::Played { turn, outcome } => {
                self.machine.handle_playback_finished(turn, outcome)
            }
            Completion::RestartDue(token) => self.machine.restart_due(token),
        };
        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.execute(effect);
        }
        self.publish_phase();
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::StartRecognition(listen) => {
                if let Err(error) = self.recognizer.start(listen) {
                    tracing::warn!(%listen, %error, "failed to start recognition");
                    let effects = self.machine.handle_recognition(Recognition::new(
                        listen,
                        RecognitionEvent::Error(error),
                    ));
                    self.apply(effects);
                }
            }
            Effect::StopRecognition => self.recognizer.stop(),
            Effect::AbortRecognition => self.recognizer.abort(),
            Effect::Think { turn, text } => self.spawn_thinking(turn, text),
            Effect::Synthesize { turn, text } => self.spawn_synthesis(turn, text),
            Effect::Play { turn, audio } => self.spawn_playback(turn, audio),
            Effect::StopPlayback => self.stop_playback(),
            Effect::ScheduleRestart { token, delay } => {
                let tx = self.completions_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Completion::RestartDue(token));
                });
            }
            Effect::Interim(text) => self.publish(AssistantUpdate::Interim(text)),
            Effect::Appended(turn) => self.publish(AssistantUpdate::Message(turn)),
            Effect::Cleared => self.publish(AssistantUpdate::Cleared),
            Effect::Notify(notification) => {
                self.publish(AssistantUpdate::Notification(notification));
            }
        }
    }

    fn spawn_thinking(&self, turn: TurnId, text: String) {
        let delay = self.thinking_delay();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Completion::Thought { turn, text });
        });
    }

    #[allow(clippy::cast_possible_truncation)]
    fn thinking_delay(&self) -> Duration {
        let min = self.options.thinking_min.as_millis() as u64;
        let max = (self.options.thinking_max.as_millis() as u64).max(min);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    fn spawn_synthesis(&self, turn: TurnId, text: String) {
        let request = SpeechRequest {
            text,
            voice_id: self.settings.voice_id.clone(),
            speed: self.settings.speech_speed,
            api_key: self.settings.api_key_secret(),
        };
        let synthesizer = Arc::clone(&self.synthesizer);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = synthesizer.synthesize(&request).await;
            let _ = tx.send(Completion::Synthesized { turn, result });
        });
    }

    fn spawn_playback(&mut self, turn: TurnId, audio: Vec<u8>) {
        self.stop_playback();

        let stop = StopSignal::new();
        self.playback = Some(stop.clone());

        let sink = Arc::clone(&self.sink);
        let volume = self.settings.volume;
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let outcome = match sink.play(audio, volume, stop).await {
                Ok(()) => PlaybackOutcome::Completed,
                Err(e) => PlaybackOutcome::Failed(e.to_string()),
            };
            let _ = tx.send(Completion::Played { turn, outcome });
        });
    }

    fn stop_playback(&mut self) {
        if let Some(stop) = self.playback.take() {
            stop.stop();
        }
    }

    fn publish(&self, update: AssistantUpdate) {
        let _ = self.updates.send(update);
    }

    fn publish_phase(&mut self) {
        let phase = self.machine.phase();
        if phase != self.published_phase {
            self.published_phase = phase;
            self.publish(AssistantUpdate::Phase(phase));
        }
    }

    fn shutdown(&mut self) {
        self.recognizer.abort();
        self.stop_playback();
        tracing::info!(turns = self.machine.conversation().len(), "assistant stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_action_texts() {
        assert_eq!(QuickAction::Calculate.text(), "What is 25 x 4?");
        assert_eq!(QuickAction::Joke.text(), "Tell me a joke");
        assert_eq!(QuickAction::ALL.len(), 6);
    }

    #[test]
    fn test_quick_action_parse() {
        assert_eq!("Weather".parse::<QuickAction>().unwrap(), QuickAction::Weather);
        assert!("dance".parse::<QuickAction>().is_err());
        for action in QuickAction::ALL {
            assert_eq!(action.name().parse::<QuickAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_default_timing() {
        let options = AssistantOptions::default();
        assert_eq!(options.thinking_min, Duration::from_millis(1000));
        assert_eq!(options.thinking_max, Duration::from_millis(2000));
        assert_eq!(options.restart_delay, Duration::from_secs(1));
    }
}
