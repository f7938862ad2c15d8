//! The Quality Profile Evaluator: a pure function from
//! (release attributes, profile) to acceptance + score. No I/O lives here —
//! callers resolve profiles/definitions from the store first.

pub mod evaluator;
pub mod title_parser;

pub use evaluator::{evaluate, Acceptance, RejectReason, DEFAULT_RUNTIME_MINUTES};
