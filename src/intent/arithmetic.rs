//! Binary arithmetic extraction and evaluation
//!
//! Recognizes exactly one `<number> <operator> <number>` expression in free
//! text. Operands are unsigned integers or decimals. Chained expressions such
//! as `2+3*4` are rejected rather than truncated.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Operator alternatives, symbols first then spoken forms
const OPERATOR_PATTERN: &str =
    r"\+|-|\*|x|×|/|÷|plus|minus|times|multiplied\s+by|divided\s+by";

/// Unsigned integer or decimal operand
const NUMBER_PATTERN: &str = r"\d+(?:\.\d+)?";

/// First `<number> <operator> <number>` occurrence
static EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"({NUMBER_PATTERN})\s*({OPERATOR_PATTERN})\s*({NUMBER_PATTERN})"
    ))
    .expect("valid regex")
});

/// Another operation directly following a matched expression
static CHAINED_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*(?:{OPERATOR_PATTERN})\s*\d")).expect("valid regex")
});

/// Another operation directly preceding a matched expression
static CHAINED_BEFORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\d\s*(?:{OPERATOR_PATTERN})\s*$")).expect("valid regex")
});

/// Rendered in place of a number when dividing by zero
pub const DIVISION_BY_ZERO: &str = "undefined (division by zero)";

/// Supported binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    /// Parse an operator token as matched in normalized text
    ///
    /// `x` is accepted as a multiplication alias, which means an ordinary
    /// letter `x` between two numbers reads as multiplication.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let word = token.split_whitespace().next().unwrap_or(token);
        match word {
            "+" | "plus" => Some(Self::Add),
            "-" | "minus" => Some(Self::Subtract),
            "*" | "x" | "×" | "times" | "multiplied" => Some(Self::Multiply),
            "/" | "÷" | "divided" => Some(Self::Divide),
            _ => None,
        }
    }

    /// Canonical symbol
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '*',
            Self::Divide => '/',
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A single binary expression found in text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expression {
    pub lhs: f64,
    pub operator: Operator,
    pub rhs: f64,
}

impl Expression {
    /// Evaluate this expression
    #[must_use]
    pub fn evaluate(&self) -> CalculationResult {
        evaluate(self.lhs, self.operator, self.rhs)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.operator, self.rhs)
    }
}

/// Outcome of a calculation
///
/// Division by zero and a missing expression are regular values, never errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalculationResult {
    /// Finite numeric result
    Value(f64),
    /// Divisor was zero
    DivisionByZero,
    /// Result does not fit in a finite `f64`
    OutOfRange,
    /// Text contained no usable expression
    NoExpression,
}

impl CalculationResult {
    /// Whether this result can be substituted into a response
    #[must_use]
    pub const fn is_answer(&self) -> bool {
        !matches!(self, Self::NoExpression)
    }
}

impl fmt::Display for CalculationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.write_str(&format_number(*value)),
            Self::DivisionByZero => f.write_str(DIVISION_BY_ZERO),
            Self::OutOfRange => f.write_str("too large to represent"),
            Self::NoExpression => f.write_str("no expression found"),
        }
    }
}

/// Find the first binary expression in normalized text
///
/// Returns `None` when there is no expression, when an operand does not fit
/// in an `f64`, or when the first expression is part of a longer chain.
#[must_use]
pub fn extract(text: &str) -> Option<Expression> {
    let captures = EXPRESSION.captures(text)?;
    let whole = captures.get(0)?;

    if CHAINED_AFTER.is_match(&text[whole.end()..])
        || CHAINED_BEFORE.is_match(&text[..whole.start()])
    {
        tracing::debug!(text, "rejecting chained arithmetic expression");
        return None;
    }

    let lhs = parse_operand(captures.get(1)?.as_str())?;
    let operator = Operator::from_token(captures.get(2)?.as_str())?;
    let rhs = parse_operand(captures.get(3)?.as_str())?;

    Some(Expression { lhs, operator, rhs })
}

/// Evaluate a binary operation
#[must_use]
pub fn evaluate(lhs: f64, operator: Operator, rhs: f64) -> CalculationResult {
    let value = match operator {
        Operator::Add => lhs + rhs,
        Operator::Subtract => lhs - rhs,
        Operator::Multiply => lhs * rhs,
        Operator::Divide => {
            if rhs == 0.0 {
                return CalculationResult::DivisionByZero;
            }
            lhs / rhs
        }
    };

    if value.is_finite() {
        CalculationResult::Value(value)
    } else {
        CalculationResult::OutOfRange
    }
}

/// Extract and evaluate in one step
#[must_use]
pub fn calculate(text: &str) -> CalculationResult {
    extract(text).map_or(CalculationResult::NoExpression, |expr| expr.evaluate())
}

/// Integral values render without a decimal point, others with two decimals
#[must_use]
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // Avoid rendering negative zero
        return "0".to_string();
    }
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn parse_operand(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_symbol_operators() {
        let expr = extract("what is 7 + 3").unwrap();
        assert_eq!(expr.lhs, 7.0);
        assert_eq!(expr.operator, Operator::Add);
        assert_eq!(expr.rhs, 3.0);

        assert_eq!(extract("12*4").unwrap().operator, Operator::Multiply);
        assert_eq!(extract("6 x 7").unwrap().operator, Operator::Multiply);
        assert_eq!(extract("6 × 7").unwrap().operator, Operator::Multiply);
        assert_eq!(extract("9 ÷ 3").unwrap().operator, Operator::Divide);
        assert_eq!(extract("9 - 3").unwrap().operator, Operator::Subtract);
    }

    #[test]
    fn test_extract_spoken_operators() {
        let expr = extract("calculate 10 divided by 0").unwrap();
        assert_eq!(expr.operator, Operator::Divide);
        assert_eq!(expr.rhs, 0.0);

        assert_eq!(extract("5 plus 2").unwrap().operator, Operator::Add);
        assert_eq!(extract("5 minus 2").unwrap().operator, Operator::Subtract);
        assert_eq!(extract("5 times 2").unwrap().operator, Operator::Multiply);
        assert_eq!(
            extract("5 multiplied by 2").unwrap().operator,
            Operator::Multiply
        );
    }

    #[test]
    fn test_extract_decimals() {
        let expr = extract("what's 2.5 * 4").unwrap();
        assert_eq!(expr.lhs, 2.5);
        assert_eq!(expr.rhs, 4.0);
    }

    #[test]
    fn test_extract_uses_first_match_only() {
        let expr = extract("first 1 + 2 and then 8 / 4").unwrap();
        assert_eq!(expr.lhs, 1.0);
        assert_eq!(expr.operator, Operator::Add);
        assert_eq!(expr.rhs, 2.0);
    }

    #[test]
    fn test_extract_rejects_chained_expressions() {
        assert!(extract("2+3*4").is_none());
        assert!(extract("what is 10 - 2 - 1").is_none());
        assert!(extract("1 plus 2 times 3").is_none());
    }

    #[test]
    fn test_extract_without_expression() {
        assert!(extract("calculate something").is_none());
        assert!(extract("i have 3 apples").is_none());
        assert!(extract("").is_none());
    }

    #[test]
    fn test_evaluate_formats_results() {
        assert_eq!(calculate("7 + 3").to_string(), "10");
        assert_eq!(calculate("7 / 2").to_string(), "3.50");
        assert_eq!(calculate("10 / 3").to_string(), "3.33");
        assert_eq!(calculate("3 - 5").to_string(), "-2");
        assert_eq!(calculate("1.5 x 2").to_string(), "3");
        assert_eq!(calculate("5 - 5").to_string(), "0");
    }

    #[test]
    fn test_division_by_zero_is_a_value() {
        assert_eq!(
            evaluate(10.0, Operator::Divide, 0.0),
            CalculationResult::DivisionByZero
        );
        assert_eq!(calculate("4 ÷ 0").to_string(), DIVISION_BY_ZERO);
        assert_eq!(calculate("0 * 0"), CalculationResult::Value(0.0));
    }

    #[test]
    fn test_no_expression_result() {
        let result = calculate("hello there");
        assert_eq!(result, CalculationResult::NoExpression);
        assert!(!result.is_answer());
    }
}
