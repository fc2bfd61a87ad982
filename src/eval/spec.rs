//! Evaluation spec compilation.
//!
//! A user describes expected output fields declaratively (type, expected
//! value, optional numeric operator). Compilation turns that into the
//! extraction schema sent to the automation capability and the typed
//! expectations the scorer compares against.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Primitive type of an expected output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
}

impl FieldType {
    /// JSON schema type name for this field type.
    pub fn schema_type(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
        }
    }
}

/// Declarative description of one expected output field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    /// Field type, which selects the comparison rule.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Raw expected value; coerced according to `field_type` at compile time.
    pub expected_value: String,
    /// Comparison operator, numeric fields only. Defaults to equality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

/// A full evaluation spec: field name to expectation.
pub type EvalSpec = BTreeMap<String, FieldSpec>;

/// Comparison operator for numeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompareOp {
    Lt,
    Gt,
    Le,
    Ge,
    #[default]
    Eq,
}

impl CompareOp {
    /// Parses an operator, with anything unrecognized (or absent)
    /// collapsing to equality.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("<") => CompareOp::Lt,
            Some(">") => CompareOp::Gt,
            Some("<=") => CompareOp::Le,
            Some(">=") => CompareOp::Ge,
            _ => CompareOp::Eq,
        }
    }

    /// Applies the operator to `extracted <op> expected`.
    pub fn apply(&self, extracted: f64, expected: f64) -> bool {
        match self {
            CompareOp::Lt => extracted < expected,
            CompareOp::Gt => extracted > expected,
            CompareOp::Le => extracted <= expected,
            CompareOp::Ge => extracted >= expected,
            CompareOp::Eq => extracted == expected,
        }
    }

    /// The operator's symbol, for logs and check reports.
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "=",
        }
    }
}

/// A type-coerced expected value.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedValue {
    Text(String),
    Number(f64),
    Flag(bool),
}

impl ExpectedValue {
    /// The expectation as a plain JSON value, used for the strict-equality
    /// fallback when types don't line up.
    pub fn to_value(&self) -> Value {
        match self {
            ExpectedValue::Text(s) => Value::String(s.clone()),
            ExpectedValue::Number(n) => serde_json::json!(n),
            ExpectedValue::Flag(b) => Value::Bool(*b),
        }
    }
}

impl std::fmt::Display for ExpectedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpectedValue::Text(s) => write!(f, "{}", s),
            ExpectedValue::Number(n) => write!(f, "{}", n),
            ExpectedValue::Flag(b) => write!(f, "{}", b),
        }
    }
}

/// A compiled evaluation spec, ready for extraction and scoring.
#[derive(Debug, Clone)]
pub struct CompiledEval {
    /// Field name to primitive type, in field order.
    fields: BTreeMap<String, FieldType>,
    /// Field name to coerced expected value.
    expected: BTreeMap<String, ExpectedValue>,
    /// Field name to numeric operator (numeric fields only).
    operators: BTreeMap<String, CompareOp>,
}

impl CompiledEval {
    /// The expected values, keyed by field name.
    pub fn expected(&self) -> &BTreeMap<String, ExpectedValue> {
        &self.expected
    }

    /// The operator for a field; equality when none was compiled.
    pub fn operator(&self, field: &str) -> CompareOp {
        self.operators.get(field).copied().unwrap_or_default()
    }

    /// Renders the extraction schema as a JSON schema object.
    pub fn extraction_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, field_type)| {
                (
                    name.clone(),
                    serde_json::json!({ "type": field_type.schema_type() }),
                )
            })
            .collect();
        let required: Vec<&String> = self.fields.keys().collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// The extraction instruction listing the wanted fields.
    pub fn extraction_prompt(&self) -> String {
        let names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        format!(
            "Extract the following fields from the page: {}",
            names.join(", ")
        )
    }
}

/// Compiles an evaluation spec.
///
/// Returns `None` for an empty spec, which skips evaluation entirely.
/// Numeric expected values that don't parse fail compilation with a
/// [`ValidationError`], so a malformed spec never starts a run. Boolean
/// expected values are true iff the text is case-insensitively "true";
/// anything else coerces to false without complaint.
pub fn compile(spec: &EvalSpec) -> Result<Option<CompiledEval>, ValidationError> {
    if spec.is_empty() {
        return Ok(None);
    }

    let mut fields = BTreeMap::new();
    let mut expected = BTreeMap::new();
    let mut operators = BTreeMap::new();

    for (name, field_spec) in spec {
        fields.insert(name.clone(), field_spec.field_type);
        match field_spec.field_type {
            FieldType::String => {
                expected.insert(
                    name.clone(),
                    ExpectedValue::Text(field_spec.expected_value.clone()),
                );
            }
            FieldType::Number => {
                let parsed: f64 = field_spec.expected_value.trim().parse().map_err(|_| {
                    ValidationError::UnparsableNumber {
                        field: name.clone(),
                        value: field_spec.expected_value.clone(),
                    }
                })?;
                expected.insert(name.clone(), ExpectedValue::Number(parsed));
                operators.insert(name.clone(), CompareOp::parse(field_spec.operator.as_deref()));
            }
            FieldType::Boolean => {
                let flag = field_spec.expected_value.eq_ignore_ascii_case("true");
                expected.insert(name.clone(), ExpectedValue::Flag(flag));
            }
        }
    }

    Ok(Some(CompiledEval {
        fields,
        expected,
        operators,
    }))
}
