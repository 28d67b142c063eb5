//! Inference request screening.
//!
//! Pure stages (`selector`, `normalize`, `ordering`, `verdict`) are composed
//! by [`GuardrailProcessor`], which owns the only network call.

mod guardrails;
pub mod normalize;
pub mod ordering;
pub mod selector;
pub mod verdict;

pub use guardrails::{GuardrailProcessor, InspectionOutcome, SkipReason};
pub use normalize::{normalize_turn, normalize_turns, FUNCTION_INPUT_SEPARATOR};
pub use ordering::canonical_order;
pub use selector::select_turns;
pub use verdict::interpret_verdict;
