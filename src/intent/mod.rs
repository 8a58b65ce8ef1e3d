//! Intent classification
//!
//! Maps an utterance to exactly one [`IntentCategory`] using substring
//! keyword rules evaluated first-match-wins. Matching is plain containment,
//! not word-boundary aware: "hi" also matches inside "this".

pub mod arithmetic;

use std::fmt;

use serde::{Deserialize, Serialize};

/// One piece of user input with its normalized form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    raw: String,
    normalized: String,
}

impl Utterance {
    /// Create an utterance, deriving the lowercased and trimmed form
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalize(&raw);
        Self { raw, normalized }
    }

    /// Text as received
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Lowercased, trimmed text used for matching
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

/// Lowercase and trim
#[must_use]
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Intent buckets driving the response template family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Greeting,
    TimeQuery,
    WeatherQuery,
    Calculation,
    Joke,
    Help,
    Fallback,
}

impl IntentCategory {
    /// All categories in declaration order
    pub const ALL: [Self; 7] = [
        Self::Greeting,
        Self::TimeQuery,
        Self::WeatherQuery,
        Self::Calculation,
        Self::Joke,
        Self::Help,
        Self::Fallback,
    ];

    /// Short identifier used in logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::TimeQuery => "time",
            Self::WeatherQuery => "weather",
            Self::Calculation => "calculation",
            Self::Joke => "joke",
            Self::Help => "help",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a rule decides whether it applies
#[derive(Debug, Clone, Copy)]
pub enum Predicate {
    /// Text contains any of the substrings
    Keywords(&'static [&'static str]),
    /// Text contains a valid binary arithmetic expression
    Expression,
}

impl Predicate {
    fn matches(&self, normalized: &str) -> bool {
        match self {
            Self::Keywords(keywords) => keywords.iter().any(|k| normalized.contains(k)),
            Self::Expression => arithmetic::extract(normalized).is_some(),
        }
    }
}

/// A category paired with its predicate
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub category: IntentCategory,
    pub predicate: Predicate,
}

const GREETING_KEYWORDS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "how are you",
    "good morning",
    "good afternoon",
    "good evening",
];

const TIME_KEYWORDS: &[&str] = &["time", "what time", "what's the time", "clock"];

const WEATHER_KEYWORDS: &[&str] = &["weather", "forecast", "temperature", "how's the weather"];

const JOKE_KEYWORDS: &[&str] = &["joke", "funny", "tell me a joke", "make me laugh", "humor"];

const HELP_KEYWORDS: &[&str] = &[
    "help",
    "what can you",
    "what do you do",
    "capabilities",
    "commands",
];

/// Classification order, first match wins, [`IntentCategory::Fallback`] if none
///
/// Calculation is deliberately placed ahead of every keyword rule, so
/// "hey what is 2 + 2" is a calculation rather than a greeting. A plain
/// keyword-first order (greeting, time, weather, then arithmetic) would let
/// those keywords shadow the expression. The keyword rules keep that
/// relative order among themselves.
pub const PRECEDENCE: [Rule; 6] = [
    Rule {
        category: IntentCategory::Calculation,
        predicate: Predicate::Expression,
    },
    Rule {
        category: IntentCategory::Greeting,
        predicate: Predicate::Keywords(GREETING_KEYWORDS),
    },
    Rule {
        category: IntentCategory::TimeQuery,
        predicate: Predicate::Keywords(TIME_KEYWORDS),
    },
    Rule {
        category: IntentCategory::WeatherQuery,
        predicate: Predicate::Keywords(WEATHER_KEYWORDS),
    },
    Rule {
        category: IntentCategory::Joke,
        predicate: Predicate::Keywords(JOKE_KEYWORDS),
    },
    Rule {
        category: IntentCategory::Help,
        predicate: Predicate::Keywords(HELP_KEYWORDS),
    },
];

/// Classify normalized text; total, never fails
#[must_use]
pub fn classify(normalized: &str) -> IntentCategory {
    PRECEDENCE
        .iter()
        .find(|rule| rule.predicate.matches(normalized))
        .map_or(IntentCategory::Fallback, |rule| rule.category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utterance_normalization() {
        let utterance = Utterance::new("  What TIME is it?  ");
        assert_eq!(utterance.raw(), "  What TIME is it?  ");
        assert_eq!(utterance.normalized(), "what time is it?");
    }

    #[test]
    fn test_classify_keywords() {
        assert_eq!(classify("hello there"), IntentCategory::Greeting);
        assert_eq!(classify("good evening"), IntentCategory::Greeting);
        assert_eq!(classify("what time is it"), IntentCategory::TimeQuery);
        assert_eq!(classify("look at the clock"), IntentCategory::TimeQuery);
        assert_eq!(classify("what's the forecast"), IntentCategory::WeatherQuery);
        assert_eq!(classify("tell me a joke"), IntentCategory::Joke);
        assert_eq!(classify("what can you do"), IntentCategory::Help);
        assert_eq!(classify("quantum chromodynamics"), IntentCategory::Fallback);
    }

    #[test]
    fn test_keyword_precedence() {
        // Greeting beats time
        assert_eq!(classify("hey, what time is it"), IntentCategory::Greeting);
        // Weather beats joke
        assert_eq!(classify("a funny forecast"), IntentCategory::WeatherQuery);
    }

    #[test]
    fn test_substring_matching_is_not_word_bounded() {
        assert_eq!(classify("that was unfunny"), IntentCategory::Joke);
        assert_eq!(classify("this"), IntentCategory::Greeting);
    }

    #[test]
    fn test_expression_overrides_keywords() {
        assert_eq!(classify("hey what is 2 + 2"), IntentCategory::Calculation);
        assert_eq!(classify("calculate 10 divided by 0"), IntentCategory::Calculation);
    }

    #[test]
    fn test_calculation_keywords_without_expression_fall_through() {
        assert_eq!(classify("calculate"), IntentCategory::Fallback);
        assert_eq!(classify("multiply them"), IntentCategory::Fallback);
        assert_eq!(classify("2+3*4"), IntentCategory::Fallback);
    }
}
