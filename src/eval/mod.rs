//! Evaluation of task outcomes.
//!
//! Turns user-supplied field expectations into an extraction schema plus
//! per-field comparators, scores extracted values against them, and holds
//! the standalone screenshot comparator.

pub mod compare;
pub mod scorer;
pub mod spec;

pub use compare::{compare_data_uris, CompareOutcome, SIMILARITY_THRESHOLD};
pub use scorer::{score, FieldCheck, ScoreReport};
pub use spec::{compile, CompareOp, CompiledEval, EvalSpec, ExpectedValue, FieldSpec, FieldType};
