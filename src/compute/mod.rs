//! Compute module - Predicate evaluation and search.

mod automaton;
mod evaluator;
mod progression;
mod reward;
mod robustness;
mod tree;

pub mod evolution;
pub mod search;

pub use automaton::*;
pub use evaluator::*;
pub use progression::*;
pub use reward::*;
pub use robustness::*;
pub use tree::*;
