//! Herald - conversational voice assistant
//!
//! This library provides the core of the assistant:
//! - Intent classification and arithmetic extraction
//! - Templated response generation
//! - Turn sequencing (listen, process, speak) as a pure state machine
//! - Speech recognition, `ElevenLabs` synthesis and audio playback
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Terminal adapter                     │
//! │      REPL  │  quick actions  │  settings  │  ...    │
//! └────────────────────┬────────────────────────────────┘
//!                      │ commands / updates
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Assistant                         │
//! │   TurnStateMachine  │  ResponseGenerator  │  Store   │
//! └────────────────────┬────────────────────────────────┘
//!                      │ effects
//! ┌────────────────────▼────────────────────────────────┐
//! │                      Voice                           │
//! │   Recognizer  │  ElevenLabs  │  Playback             │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod assistant;
pub mod config;
pub mod error;
pub mod generator;
pub mod intent;
pub mod responses;
pub mod session;
pub mod voice;

pub use assistant::{
    Assistant, AssistantCommand, AssistantHandle, AssistantOptions, AssistantUpdate,
    Collaborators, QuickAction,
};
pub use config::{
    FileSettingsStore, MemorySettingsStore, Settings, SettingsOverrides, SettingsStore,
};
pub use error::{Error, Result};
pub use generator::{Clock, FixedClock, ResponseGenerator, SystemClock};
pub use intent::{IntentCategory, Utterance, classify};
pub use responses::ResponseCatalog;
pub use session::{
    Conversation, ConversationTurn, Effect, Notification, SessionOptions, SessionPhase, Speaker,
    TurnId, TurnStateMachine,
};
