//! End-to-end response generation tests

use std::sync::{Arc, LazyLock};

use regex::Regex;

use herald::intent::arithmetic::DIVISION_BY_ZERO;
use herald::{FixedClock, IntentCategory, ResponseCatalog, ResponseGenerator, Utterance};

mod common;

static CLOCK_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(1[0-2]|[1-9]):[0-5]\d (AM|PM)\b").expect("valid regex"));

#[test]
fn test_time_query_contains_clock_time() {
    let mut generator = common::generator();
    let response = generator.respond(&Utterance::new("What time is it?"));

    assert_eq!(response.category, IntentCategory::TimeQuery);
    assert!(CLOCK_TIME.is_match(&response.text), "{}", response.text);
    assert!(response.text.contains("2:05 PM"));
    assert!(!response.text.contains("[TIME]"));
}

#[test]
fn test_time_query_morning_and_midnight() {
    let base = common::fixed_instant().date();
    for (hour, expected) in [(0, "12:30 AM"), (9, "9:30 AM"), (12, "12:30 PM")] {
        let at = base.and_hms_opt(hour, 30, 0).expect("valid time");
        let mut generator = ResponseGenerator::seeded(Arc::new(FixedClock(at)), 1);
        let text = generator.generate("what's the time");
        assert!(text.contains(expected), "{text}");
    }
}

#[test]
fn test_division_by_zero_is_reported() {
    let mut generator = common::generator();
    let response = generator.respond(&Utterance::new("calculate 10 divided by 0"));

    assert_eq!(response.category, IntentCategory::Calculation);
    assert!(response.text.contains(DIVISION_BY_ZERO), "{}", response.text);
}

#[test]
fn test_calculation_results() {
    let mut generator = common::generator();
    for (input, result) in [
        ("what is 7 + 3", "10"),
        ("7 / 2", "3.50"),
        ("what's 6 times 7", "42"),
        ("12 × 12", "144"),
        ("1.5 * 2", "3"),
        ("10 - 25", "-15"),
    ] {
        let text = generator.generate(input);
        assert!(text.contains(&format!(" {result}.")), "{input} -> {text}");
    }
}

#[test]
fn test_joke_is_one_of_the_six() {
    let jokes = ResponseCatalog.templates_for(IntentCategory::Joke);
    assert_eq!(jokes.len(), 6);

    let mut generator = common::generator();
    for _ in 0..50 {
        let text = generator.generate("tell me a joke");
        assert!(jokes.contains(&text.as_str()), "{text}");
    }
}

#[test]
fn test_expression_beats_keywords() {
    let mut generator = common::generator();
    let response = generator.respond(&Utterance::new("hello, what is 2 + 2"));
    assert_eq!(response.category, IntentCategory::Calculation);
    assert!(response.text.contains('4'));
}

#[test]
fn test_chained_arithmetic_falls_back() {
    let mut generator = common::generator();
    let response = generator.respond(&Utterance::new("2+3*4"));
    assert_eq!(response.category, IntentCategory::Fallback);
}

#[test]
fn test_generate_is_total() {
    let mut generator = common::generator();
    let inputs = [
        "",
        "   ",
        "?!?",
        "🤖🤖",
        "9999999999999999999999999999999 * 9999999999999999999999999999999",
        "1e308 * 10",
        "how's the weather in paris",
        "WHAT CAN YOU DO",
        "good morning",
        "asdfghjkl",
    ];
    for input in inputs {
        let text = generator.generate(input);
        assert!(!text.trim().is_empty(), "empty response for {input:?}");
        assert!(!text.contains('['), "unfilled placeholder for {input:?}: {text}");
    }
}

#[test]
fn test_seeded_generators_agree() {
    let mut a = common::generator();
    let mut b = common::generator();
    for input in ["hi", "tell me a joke", "help", "weather", "random words"] {
        assert_eq!(a.generate(input), b.generate(input));
    }
}
