//! Text-in, text-out response generation
//!
//! Composes classification, arithmetic and the template catalog. The clock
//! and RNG are injected so output is reproducible under test.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime, NaiveTime};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::intent::{self, IntentCategory, Utterance, arithmetic};
use crate::responses::{RESULT_PLACEHOLDER, ResponseCatalog, TIME_PLACEHOLDER};

/// Source of local wall-clock time
pub trait Clock: Send + Sync {
    /// Current local date and time
    fn now(&self) -> NaiveDateTime;
}

/// Reads the system clock in the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Render a time as 12-hour `H:MM AM/PM`
#[must_use]
pub fn format_time(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// A generated reply and the category that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub category: IntentCategory,
    pub text: String,
}

/// Produces a response for any utterance
pub struct ResponseGenerator {
    catalog: ResponseCatalog,
    clock: Arc<dyn Clock>,
    rng: Box<dyn RngCore + Send>,
}

impl std::fmt::Debug for ResponseGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseGenerator").finish_non_exhaustive()
    }
}

impl ResponseGenerator {
    /// Create a generator with explicit clock and RNG
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, rng: Box<dyn RngCore + Send>) -> Self {
        Self {
            catalog: ResponseCatalog,
            clock,
            rng,
        }
    }

    /// Create a generator using the system clock and an entropy-seeded RNG
    #[must_use]
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock), Box::new(StdRng::from_entropy()))
    }

    /// Create a reproducible generator
    #[must_use]
    pub fn seeded(clock: Arc<dyn Clock>, seed: u64) -> Self {
        Self::new(clock, Box::new(StdRng::seed_from_u64(seed)))
    }

    /// Generate response text for raw user input
    pub fn generate(&mut self, raw: &str) -> String {
        self.respond(&Utterance::new(raw)).text
    }

    /// Classify the utterance and fill in the matching template
    pub fn respond(&mut self, utterance: &Utterance) -> Response {
        let text = utterance.normalized();
        let category = intent::classify(text);

        let response = match category {
            IntentCategory::TimeQuery => {
                let time = format_time(self.clock.now().time());
                self.pick(category).replace(TIME_PLACEHOLDER, &time)
            }
            IntentCategory::Calculation => {
                // The classifier only yields Calculation when extraction succeeds
                let result = arithmetic::calculate(text);
                if result.is_answer() {
                    self.pick(category)
                        .replace(RESULT_PLACEHOLDER, &result.to_string())
                } else {
                    return self.respond_with(IntentCategory::Fallback);
                }
            }
            _ => self.pick(category).to_string(),
        };

        tracing::debug!(%category, input = utterance.raw(), "generated response");
        Response {
            category,
            text: response,
        }
    }

    fn respond_with(&mut self, category: IntentCategory) -> Response {
        Response {
            category,
            text: self.pick(category).to_string(),
        }
    }

    fn pick(&mut self, category: IntentCategory) -> &'static str {
        self.catalog.pick_random(category, &mut self.rng)
    }
}
