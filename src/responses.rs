//! Static response templates per intent category

use rand::Rng;
use rand::seq::SliceRandom;

use crate::intent::IntentCategory;

/// Replaced with the current wall-clock time
pub const TIME_PLACEHOLDER: &str = "[TIME]";

/// Replaced with a calculation result
pub const RESULT_PLACEHOLDER: &str = "[RESULT]";

const GREETING: &[&str] = &[
    "Hello! I'm your professional AI voice assistant. How may I assist you today?",
    "Welcome! I'm here to help with whatever you need. What's on your mind?",
    "Good to hear from you! I'm ready to assist. What would you like to know?",
    "Greetings! Your AI assistant is online and ready to help. How can I support you?",
];

const TIME: &[&str] = &[
    "The current time is [TIME]. Is there anything else I can help you with?",
    "It's [TIME] right now. What else would you like to know?",
    "The time is currently [TIME]. How else may I assist you?",
    "According to my system clock, it's [TIME]. What other information do you need?",
];

const WEATHER: &[&str] = &[
    "I'd be happy to help with weather information. For the most accurate forecast, I recommend checking your preferred weather service or app.",
    "While I don't have access to real-time weather data, I suggest using a dedicated weather application for current conditions and forecasts.",
    "For up-to-date weather information, please check your local weather service, as I don't currently have access to meteorological data.",
];

const CALCULATION: &[&str] = &[
    "Let me calculate that for you... The result is [RESULT].",
    "I've processed the calculation, and the answer is [RESULT].",
    "After computing the values, the result equals [RESULT].",
    "The mathematical result of your query is [RESULT].",
];

const JOKE: &[&str] = &[
    "Why don't scientists trust atoms? Because they make up everything!",
    "I told my computer a joke about UDP, but it didn't get it.",
    "Why do programmers prefer dark mode? Because light attracts bugs!",
    "What's the best thing about Switzerland? I don't know, but the flag is a big plus!",
    "Why don't eggs tell jokes? They'd crack each other up!",
    "What do you call a fake noodle? An impasta!",
];

const HELP: &[&str] = &[
    "I can help you with various tasks! Try asking me about the time, simple calculations, tell you jokes, or just have a friendly conversation. You can also use the quick action buttons for easy access to common requests.",
    "I'm here to assist with time queries, basic math problems, jokes, and general conversation. Feel free to use voice commands or click the quick action buttons above.",
    "My capabilities include providing the current time, performing calculations, sharing jokes, and engaging in conversation. Use either voice input or the convenient quick actions.",
];

const FALLBACK: &[&str] = &[
    "That's an interesting question! While I don't have specific information about that topic, I'm here to help with general questions, calculations, time queries, or we can simply have a conversation.",
    "I don't have detailed information on that particular subject, but I can assist with time queries, math problems, jokes, or general discussion. What else would you like to explore?",
    "I'm not equipped with information on that specific topic, but I excel at helping with calculations, time queries, jokes, and casual conversation. How else can I assist you?",
];

/// Read-only mapping from category to its templates
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseCatalog;

impl ResponseCatalog {
    /// Templates for a category, in fixed order
    #[must_use]
    pub const fn templates_for(self, category: IntentCategory) -> &'static [&'static str] {
        match category {
            IntentCategory::Greeting => GREETING,
            IntentCategory::TimeQuery => TIME,
            IntentCategory::WeatherQuery => WEATHER,
            IntentCategory::Calculation => CALCULATION,
            IntentCategory::Joke => JOKE,
            IntentCategory::Help => HELP,
            IntentCategory::Fallback => FALLBACK,
        }
    }

    /// Pick one of the category's templates uniformly at random
    pub fn pick_random<R: Rng + ?Sized>(self, category: IntentCategory, rng: &mut R) -> &'static str {
        self.templates_for(category)
            .choose(rng)
            .copied()
            // Every table is non-empty; keep a total fallback anyway
            .unwrap_or(FALLBACK[0])
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_every_category_has_templates() {
        let catalog = ResponseCatalog;
        for category in IntentCategory::ALL {
            assert!(!catalog.templates_for(category).is_empty(), "{category}");
        }
        assert_eq!(catalog.templates_for(IntentCategory::Joke).len(), 6);
    }

    #[test]
    fn test_placeholders_belong_to_their_categories() {
        let catalog = ResponseCatalog;
        for category in IntentCategory::ALL {
            for template in catalog.templates_for(category) {
                assert_eq!(
                    template.contains(TIME_PLACEHOLDER),
                    category == IntentCategory::TimeQuery
                );
                assert_eq!(
                    template.contains(RESULT_PLACEHOLDER),
                    category == IntentCategory::Calculation
                );
            }
        }
    }

    #[test]
    fn test_pick_random_is_member_and_roughly_uniform() {
        let catalog = ResponseCatalog;
        let mut rng = StdRng::seed_from_u64(7);
        let templates = catalog.templates_for(IntentCategory::Joke);
        let mut counts = vec![0usize; templates.len()];

        for _ in 0..6000 {
            let picked = catalog.pick_random(IntentCategory::Joke, &mut rng);
            let index = templates.iter().position(|t| *t == picked).unwrap();
            counts[index] += 1;
        }

        for count in counts {
            assert!((800..1200).contains(&count), "count {count}");
        }
    }
}
