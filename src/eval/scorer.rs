//! Scoring of extracted values against compiled expectations.
//!
//! All-fields-must-match semantics: the run succeeds only when every
//! expected field compares true. A field missing from the extraction
//! result fails the run outright.

use serde_json::{Map, Value};
use tracing::debug;

use super::spec::{CompareOp, CompiledEval, ExpectedValue};

/// Outcome of one field comparison.
#[derive(Debug, Clone)]
pub struct FieldCheck {
    /// Field name.
    pub field: String,
    /// Whether the comparison held.
    pub passed: bool,
    /// Expected value, rendered for reporting.
    pub expected: String,
    /// Extracted value, rendered for reporting.
    pub actual: String,
}

/// Aggregate scoring result.
#[derive(Debug, Clone)]
pub struct ScoreReport {
    /// True iff every field check passed.
    pub success: bool,
    /// Individual field outcomes, in field order.
    pub checks: Vec<FieldCheck>,
}

/// Scores an extracted result against a compiled evaluation spec.
pub fn score(extracted: &Map<String, Value>, eval: &CompiledEval) -> ScoreReport {
    let mut checks = Vec::new();

    for (field, expected) in eval.expected() {
        let actual = extracted.get(field);
        let op = eval.operator(field);
        let passed = field_matches(expected, op, actual);

        debug!(
            "Field check '{}': {} (expected {} {})",
            field,
            if passed { "PASS" } else { "FAIL" },
            op.symbol(),
            expected
        );

        checks.push(FieldCheck {
            field: field.clone(),
            passed,
            expected: match expected {
                ExpectedValue::Number(n) => format!("{} {}", op.symbol(), n),
                other => other.to_string(),
            },
            actual: actual
                .map(|v| v.to_string())
                .unwrap_or_else(|| "<missing>".to_string()),
        });
    }

    ScoreReport {
        success: checks.iter().all(|c| c.passed),
        checks,
    }
}

/// Compares one expected value against the extracted value.
///
/// Strings match on case-insensitive substring containment (the extracted
/// text only needs to contain the expectation). Numbers apply the compiled
/// operator. Everything else, including type mismatches, falls through to
/// strict type-sensitive equality; a mismatch therefore generally fails,
/// which is the intended defensive behavior.
fn field_matches(expected: &ExpectedValue, op: CompareOp, actual: Option<&Value>) -> bool {
    let Some(actual) = actual else {
        return false;
    };

    match (expected, actual) {
        (ExpectedValue::Text(want), Value::String(got)) => {
            got.to_lowercase().contains(&want.to_lowercase())
        }
        (ExpectedValue::Number(want), Value::Number(got)) => got
            .as_f64()
            .map(|got| op.apply(got, *want))
            .unwrap_or(false),
        (expected, actual) => expected.to_value() == *actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::spec::{compile, EvalSpec, FieldSpec, FieldType};

    fn compiled(entries: &[(&str, FieldType, &str, Option<&str>)]) -> CompiledEval {
        let mut spec = EvalSpec::new();
        for (name, field_type, expected, operator) in entries {
            spec.insert(
                name.to_string(),
                FieldSpec {
                    field_type: *field_type,
                    expected_value: expected.to_string(),
                    operator: operator.map(String::from),
                },
            );
        }
        compile(&spec).unwrap().unwrap()
    }

    fn extracted(json: &str) -> Map<String, Value> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_number_default_operator_is_equality() {
        let eval = compiled(&[("count", FieldType::Number, "5", None)]);
        let report = score(&extracted(r#"{"count": 5}"#), &eval);
        assert!(report.success);
    }

    #[test]
    fn test_number_operators() {
        let eval = compiled(&[("price", FieldType::Number, "100", Some("<"))]);
        assert!(score(&extracted(r#"{"price": 42}"#), &eval).success);
        assert!(!score(&extracted(r#"{"price": 150}"#), &eval).success);
    }

    #[test]
    fn test_string_case_insensitive_containment() {
        let eval = compiled(&[("status", FieldType::String, "order confirmed", None)]);
        let report = score(&extracted(r#"{"status": "Order Confirmed #123"}"#), &eval);
        assert!(report.success);
    }

    #[test]
    fn test_string_not_contained_fails() {
        let eval = compiled(&[("status", FieldType::String, "cancelled", None)]);
        let report = score(&extracted(r#"{"status": "Order Confirmed #123"}"#), &eval);
        assert!(!report.success);
    }

    #[test]
    fn test_boolean_strict_equality() {
        let eval = compiled(&[("in_stock", FieldType::Boolean, "TRUE", None)]);
        assert!(score(&extracted(r#"{"in_stock": true}"#), &eval).success);
        assert!(!score(&extracted(r#"{"in_stock": false}"#), &eval).success);
    }

    #[test]
    fn test_all_fields_must_match() {
        let eval = compiled(&[
            ("title", FieldType::String, "widget", None),
            ("price", FieldType::Number, "10", None),
        ]);
        let report = score(&extracted(r#"{"title": "Widget Deluxe", "price": 11}"#), &eval);
        assert!(!report.success);
        assert_eq!(report.checks.len(), 2);
        assert!(report.checks.iter().any(|c| c.field == "title" && c.passed));
        assert!(report.checks.iter().any(|c| c.field == "price" && !c.passed));
    }

    #[test]
    fn test_missing_field_fails_the_run() {
        let eval = compiled(&[("title", FieldType::String, "widget", None)]);
        let report = score(&extracted(r#"{}"#), &eval);
        assert!(!report.success);
        assert_eq!(report.checks[0].actual, "<missing>");
    }

    #[test]
    fn test_type_mismatch_falls_through_to_strict_equality() {
        // Expected a string but the page yielded a number: the comparison
        // degrades to strict equality and fails.
        let eval = compiled(&[("title", FieldType::String, "42", None)]);
        let report = score(&extracted(r#"{"title": 42}"#), &eval);
        assert!(!report.success);
    }
}
