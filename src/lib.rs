//! Grammar-guided search for temporal predicates.
//!
//! Candidate predicates are strings derived from a BNF grammar. Each one is
//! compiled into an automaton and scored against example traces, which it
//! should accept, and counter-example traces, which it should reject.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration, grammars, traces and the predicate language
//! - `compute`: Robustness, automata, trace evaluation, fitness and search
//!
//! # Example
//!
//! ```rust,no_run
//! use pred_search::{
//!     compute::search::build_search,
//!     schema::SearchConfig,
//! };
//!
//! let config: SearchConfig = serde_json::from_str(
//!     r#"{ "problem": { "grammar_path": "grammar.bnf", "traces_path": "traces" } }"#,
//! )?;
//!
//! let mut search = build_search(&config)?;
//! search.initialize()?;
//! while !search.is_terminated() {
//!     search.step();
//! }
//!
//! println!("Best fitness: {}", search.best_fitness());
//! for predicate in search.best_solutions() {
//!     println!("  {}", predicate);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::search::{PredicateSearch, StepOutcome, build_search};
pub use schema::{Problem, SearchConfig};
