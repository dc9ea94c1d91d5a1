//! Schema module - Grammar, trace, formula and configuration types for predicate search.

mod config;
mod evolution;
mod formula;
mod grammar;
mod mapping;
mod problem;
mod trace;

pub use config::*;
pub use evolution::*;
pub use formula::*;
pub use grammar::*;
pub use mapping::*;
pub use problem::*;
pub use trace::*;
