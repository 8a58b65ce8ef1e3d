//! Turn sequencing
//!
//! [`TurnStateMachine`] owns the session phase and the conversation log. It
//! performs no IO: every input returns a list of [`Effect`]s for a driver to
//! carry out, and results come back tagged with the [`TurnId`] they belong to
//! so completions from an abandoned turn are ignored. Recognition events are
//! likewise tagged with the [`ListenId`] of the listening session that
//! produced them.
//!
//! ```text
//!          request_start              final transcript / submit
//!   Idle ───────────────▶ Listening ─────────────────────────▶ Idle ─▶ Processing
//!    ▲  ◀── stop/end/error ──┘                                            │
//!    │                                                    response ready │
//!    ├───────────────── no credential / empty response ◀─────────────────┤
//!    │                                                                   ▼
//!    └───────────────── playback done / synthesis error ◀──────────── Speaking
//! ```

pub mod conversation;
pub mod notification;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::generator::Clock;
use crate::voice::{ListenId, Recognition, RecognitionError, RecognitionEvent, SynthesisError};

pub use conversation::{Conversation, ConversationTurn, Speaker};
pub use notification::{NOTIFICATION_TTL, Notification, NotificationLevel};

/// Delay before listening re-arms in continuous mode
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(1);

/// Shown when audio playback itself fails
pub const PLAYBACK_FAILED_MESSAGE: &str =
    "Unable to play audio response. Please check your API key and internet connection.";

/// Shown when a voice preview is requested without a credential
pub const MISSING_CREDENTIAL_MESSAGE: &str =
    "Add your ElevenLabs API key in settings to enable voice responses.";

/// Exactly one of these is current at any instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Listening,
    Processing,
    Speaking,
}

impl SessionPhase {
    /// Status line text
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Listening => "Listening...",
            Self::Processing => "Processing...",
            Self::Speaking => "Speaking...",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifies one turn; completions carrying an old id are discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How audio playback ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Failed(String),
}

/// Work the driver must perform on behalf of the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Begin speech recognition, tagging its events with the id
    StartRecognition(ListenId),
    /// Stop recognition, letting the engine finish
    StopRecognition,
    /// Stop recognition discarding any in-flight result
    AbortRecognition,
    /// Wait out the thinking delay, generate a reply, then call
    /// [`TurnStateMachine::handle_response`]
    Think { turn: TurnId, text: String },
    /// Request audio, then call [`TurnStateMachine::handle_synthesis_result`]
    Synthesize { turn: TurnId, text: String },
    /// Play audio, replacing any current playback, then call
    /// [`TurnStateMachine::handle_playback_finished`]
    Play { turn: TurnId, audio: Vec<u8> },
    /// Stop the current playback
    StopPlayback,
    /// After the delay, call [`TurnStateMachine::restart_due`] with the token
    ScheduleRestart { token: TurnId, delay: Duration },
    /// Show in-progress transcript text
    Interim(String),
    /// A turn was added to the conversation
    Appended(ConversationTurn),
    /// The conversation was cleared
    Cleared,
    /// Show a notification
    Notify(Notification),
}

/// Behavior switches derived from settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Re-arm listening after each completed turn
    pub continuous: bool,
    /// A synthesis credential is configured
    pub synthesis_enabled: bool,
    pub restart_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            continuous: false,
            synthesis_enabled: false,
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnKind {
    /// User input answered by the assistant
    Conversation,
    /// Voice preview outside the conversation
    Preview,
}

#[derive(Debug, Clone, Copy)]
struct ActiveTurn {
    id: TurnId,
    kind: TurnKind,
}

/// Sequences listening, processing and speaking
pub struct TurnStateMachine {
    phase: SessionPhase,
    options: SessionOptions,
    conversation: Conversation,
    clock: Arc<dyn Clock>,
    next_turn: u64,
    active: Option<ActiveTurn>,
    /// Single-slot queue for input arriving mid-turn, latest wins
    pending: Option<String>,
    /// Armed continuous-mode restart
    restart: Option<TurnId>,
    /// Most recently started listening session
    listen: Option<ListenId>,
}

impl fmt::Debug for TurnStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnStateMachine")
            .field("phase", &self.phase)
            .field("options", &self.options)
            .field("turns", &self.conversation.len())
            .field("pending", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}

impl TurnStateMachine {
    #[must_use]
    pub fn new(options: SessionOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            phase: SessionPhase::Idle,
            options,
            conversation: Conversation::new(),
            clock,
            next_turn: 0,
            active: None,
            pending: None,
            restart: None,
            listen: None,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub const fn options(&self) -> SessionOptions {
        self.options
    }

    #[must_use]
    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Text waiting for the current turn to finish
    #[must_use]
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Apply new settings-derived options
    pub fn set_options(&mut self, options: SessionOptions) {
        if !options.continuous {
            self.restart = None;
        }
        self.options = options;
    }

    /// Start listening; ignored unless idle
    pub fn request_start(&mut self) -> Vec<Effect> {
        if self.phase != SessionPhase::Idle {
            tracing::debug!(phase = ?self.phase, "start listening ignored");
            return Vec::new();
        }
        self.restart = None;
        let listen = self.listen.map_or(ListenId::new(1), ListenId::next);
        self.listen = Some(listen);
        self.set_phase(SessionPhase::Listening);
        vec![Effect::StartRecognition(listen)]
    }

    /// Stop listening; ignored unless listening
    pub fn request_stop(&mut self) -> Vec<Effect> {
        if self.phase != SessionPhase::Listening {
            return Vec::new();
        }
        self.set_phase(SessionPhase::Idle);
        vec![Effect::StopRecognition]
    }

    /// Stop if listening, otherwise try to start
    pub fn toggle_listening(&mut self) -> Vec<Effect> {
        if self.phase == SessionPhase::Listening {
            self.request_stop()
        } else {
            self.request_start()
        }
    }

    /// Feed a lifecycle or transcript event from the recognition engine
    ///
    /// Events from any session but the most recently started one are
    /// dropped. A stopped session may still deliver its final transcript.
    pub fn handle_recognition(&mut self, recognition: Recognition) -> Vec<Effect> {
        let Recognition { listen, event } = recognition;
        if self.listen != Some(listen) {
            tracing::debug!(%listen, current = ?self.listen, "discarding stale recognition event");
            return Vec::new();
        }

        match event {
            RecognitionEvent::Started => {
                tracing::debug!(phase = ?self.phase, "recognition started");
                Vec::new()
            }
            RecognitionEvent::Interim(text) => {
                if self.phase == SessionPhase::Listening {
                    vec![Effect::Interim(text)]
                } else {
                    Vec::new()
                }
            }
            RecognitionEvent::Final(text) => self.handle_transcript(&text),
            RecognitionEvent::Error(error) => self.handle_recognition_error(&error),
            RecognitionEvent::Ended => {
                if self.phase == SessionPhase::Listening {
                    self.set_phase(SessionPhase::Idle);
                }
                Vec::new()
            }
        }
    }

    /// A finalized transcript: stop listening, then process it
    pub fn handle_transcript(&mut self, text: &str) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.phase == SessionPhase::Listening {
            self.set_phase(SessionPhase::Idle);
            effects.push(Effect::StopRecognition);
        }
        effects.extend(self.submit(text));
        effects
    }

    fn handle_recognition_error(&mut self, error: &RecognitionError) -> Vec<Effect> {
        tracing::warn!(%error, phase = ?self.phase, "speech recognition error");
        let mut effects = Vec::new();
        if self.phase == SessionPhase::Listening {
            self.set_phase(SessionPhase::Idle);
            effects.push(Effect::StopRecognition);
        }
        self.restart = None;
        effects.push(Effect::Notify(Notification::error(error.user_message())));
        effects
    }

    /// Submit text directly, as a quick action or typed input does
    ///
    /// Input arriving while a turn is processing or speaking waits in a
    /// single slot and replaces anything already waiting there.
    pub fn submit(&mut self, text: &str) -> Vec<Effect> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("ignoring empty submission");
            return Vec::new();
        }

        match self.phase {
            SessionPhase::Processing | SessionPhase::Speaking => {
                if let Some(replaced) = self.pending.replace(text.to_string()) {
                    tracing::debug!(replaced = %replaced, "pending submission replaced");
                }
                tracing::debug!(text, "turn in flight, submission queued");
                Vec::new()
            }
            SessionPhase::Listening => {
                self.set_phase(SessionPhase::Idle);
                let mut effects = vec![Effect::StopRecognition];
                effects.extend(self.begin_turn(text));
                effects
            }
            SessionPhase::Idle => self.begin_turn(text),
        }
    }

    fn begin_turn(&mut self, text: &str) -> Vec<Effect> {
        let turn = self.allocate(TurnKind::Conversation);
        let appended = self
            .conversation
            .push(Speaker::User, text, self.clock.now());
        self.set_phase(SessionPhase::Processing);
        tracing::debug!(%turn, text, "turn started");

        vec![
            Effect::Appended(appended),
            Effect::Think {
                turn,
                text: text.to_string(),
            },
        ]
    }

    /// The reply for a turn is ready
    pub fn handle_response(&mut self, turn: TurnId, text: &str) -> Vec<Effect> {
        if !self.is_current(turn, SessionPhase::Processing) {
            tracing::debug!(%turn, "discarding stale response");
            return Vec::new();
        }

        let mut effects = vec![Effect::Appended(self.conversation.push(
            Speaker::Assistant,
            text,
            self.clock.now(),
        ))];

        if self.options.synthesis_enabled && !text.trim().is_empty() {
            self.set_phase(SessionPhase::Speaking);
            effects.push(Effect::Synthesize {
                turn,
                text: text.to_string(),
            });
        } else {
            effects.extend(self.finish_turn(true));
        }
        effects
    }

    /// Synthesized audio (or the failure) for a turn arrived
    pub fn handle_synthesis_result(
        &mut self,
        turn: TurnId,
        result: Result<Vec<u8>, SynthesisError>,
    ) -> Vec<Effect> {
        if !self.is_current(turn, SessionPhase::Speaking) {
            tracing::debug!(%turn, "discarding stale synthesis result");
            return Vec::new();
        }

        match result {
            Ok(audio) if !audio.is_empty() => vec![Effect::Play { turn, audio }],
            Ok(_) => {
                tracing::warn!(%turn, "synthesis returned no audio");
                self.finish_turn(true)
            }
            Err(error) => {
                tracing::warn!(%turn, %error, "speech synthesis failed");
                let mut effects = vec![Effect::Notify(Notification::error(error.user_message()))];
                effects.extend(self.finish_turn(false));
                effects
            }
        }
    }

    /// Playback ended; completion and failure both return to idle
    pub fn handle_playback_finished(
        &mut self,
        turn: TurnId,
        outcome: PlaybackOutcome,
    ) -> Vec<Effect> {
        if !self.is_current(turn, SessionPhase::Speaking) {
            tracing::debug!(%turn, "discarding stale playback result");
            return Vec::new();
        }

        let mut effects = Vec::new();
        if let PlaybackOutcome::Failed(reason) = outcome {
            tracing::warn!(%turn, %reason, "audio playback failed");
            effects.push(Effect::Notify(Notification::error(PLAYBACK_FAILED_MESSAGE)));
        }
        effects.extend(self.finish_turn(true));
        effects
    }

    /// The continuous-mode delay elapsed
    pub fn restart_due(&mut self, token: TurnId) -> Vec<Effect> {
        if self.restart != Some(token) || !self.options.continuous {
            return Vec::new();
        }
        self.restart = None;
        self.request_start()
    }

    /// Speak text without adding a turn to the conversation
    pub fn preview_voice(&mut self, text: &str) -> Vec<Effect> {
        if !self.options.synthesis_enabled {
            return vec![Effect::Notify(Notification::error(MISSING_CREDENTIAL_MESSAGE))];
        }
        if self.phase != SessionPhase::Idle {
            tracing::debug!(phase = ?self.phase, "voice preview ignored");
            return Vec::new();
        }

        let turn = self.allocate(TurnKind::Preview);
        self.set_phase(SessionPhase::Speaking);
        vec![Effect::Synthesize {
            turn,
            text: text.to_string(),
        }]
    }

    /// Clear the conversation and return to idle from any phase
    pub fn reset(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        match self.phase {
            SessionPhase::Listening => effects.push(Effect::AbortRecognition),
            SessionPhase::Speaking => effects.push(Effect::StopPlayback),
            SessionPhase::Idle | SessionPhase::Processing => {}
        }

        self.conversation.clear();
        self.active = None;
        self.pending = None;
        self.restart = None;
        self.set_phase(SessionPhase::Idle);
        effects.push(Effect::Cleared);
        effects
    }

    /// The UI lost visibility; abandon any listening in progress
    pub fn visibility_lost(&mut self) -> Vec<Effect> {
        self.restart = None;
        if self.phase != SessionPhase::Listening {
            return Vec::new();
        }
        self.set_phase(SessionPhase::Idle);
        vec![Effect::AbortRecognition]
    }

    fn finish_turn(&mut self, completed: bool) -> Vec<Effect> {
        let finished = self.active.take();
        self.set_phase(SessionPhase::Idle);

        if let Some(next) = self.pending.take() {
            return self.begin_turn(&next);
        }

        match finished {
            Some(ActiveTurn {
                id,
                kind: TurnKind::Conversation,
            }) if completed && self.options.continuous => {
                tracing::info!(turn = %id, "turn complete, re-arming listening");
                self.restart = Some(id);
                vec![Effect::ScheduleRestart {
                    token: id,
                    delay: self.options.restart_delay,
                }]
            }
            Some(active) => {
                tracing::info!(turn = %active.id, completed, "turn complete");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    fn allocate(&mut self, kind: TurnKind) -> TurnId {
        self.next_turn += 1;
        let id = TurnId(self.next_turn);
        self.active = Some(ActiveTurn { id, kind });
        self.restart = None;
        id
    }

    fn is_current(&self, turn: TurnId, phase: SessionPhase) -> bool {
        self.phase == phase && self.active.is_some_and(|active| active.id == turn)
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            tracing::debug!(from = ?self.phase, to = ?phase, "phase transition");
            self.phase = phase;
        }
    }
}
