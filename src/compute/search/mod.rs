//! Step-driven predicate search.
//!
//! A search is created uninitialized, loads its problem in
//! [`PredicateSearch::initialize`] and then advances one unit of work per
//! [`PredicateSearch::step`]. The best-solution set is valid between any two
//! steps, so a caller may stop at any point.

mod brute_force;
mod grammar_evolution;

pub use brute_force::BruteForceSearch;
pub use grammar_evolution::{GrammarEvolutionSearch, GrammarLandscape};

use std::collections::BTreeSet;

use crate::schema::{ConfigError, Problem, ProblemConfig, ProblemError, SearchConfig, SearchStrategy};

use super::evaluator::TieredEvaluator;
use super::progression::ProgressionCompiler;

/// Result of a single [`PredicateSearch::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// One unit of work was done.
    Advanced,
    /// `step` was called before a successful `initialize`; nothing happened.
    NotInitialized,
    /// The search is exhausted; nothing happened.
    Terminated,
}

/// Driving surface shared by all strategies.
pub trait PredicateSearch {
    /// Load the problem and reset all progress.
    ///
    /// On error the search stays uninitialized.
    fn initialize(&mut self) -> Result<(), SearchError>;

    fn step(&mut self) -> StepOutcome;

    fn is_terminated(&self) -> bool;

    /// Predicates tied at [`best_fitness`](Self::best_fitness).
    fn best_solutions(&self) -> &BTreeSet<String>;

    /// `f32::NEG_INFINITY` until a candidate has been scored.
    fn best_fitness(&self) -> f32;

    /// Steps taken since initialization.
    fn steps(&self) -> usize;
}

/// Predicates sharing the highest fitness seen so far.
#[derive(Debug, Clone)]
pub struct BestSolutions {
    fitness: f32,
    solutions: BTreeSet<String>,
}

impl Default for BestSolutions {
    fn default() -> Self {
        Self {
            fitness: f32::NEG_INFINITY,
            solutions: BTreeSet::new(),
        }
    }
}

impl BestSolutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scored predicate. A strictly better fitness replaces the
    /// set, an exactly equal one joins it. Returns true on improvement.
    pub fn offer(&mut self, predicate: &str, fitness: f32) -> bool {
        if fitness.is_nan() || fitness == f32::NEG_INFINITY {
            return false;
        }
        if fitness > self.fitness {
            self.fitness = fitness;
            self.solutions.clear();
            self.solutions.insert(predicate.to_string());
            true
        } else {
            if fitness == self.fitness {
                self.solutions.insert(predicate.to_string());
            }
            false
        }
    }

    pub fn fitness(&self) -> f32 {
        self.fitness
    }

    pub fn solutions(&self) -> &BTreeSet<String> {
        &self.solutions
    }
}

/// Where a search gets its grammar and traces.
#[derive(Debug, Clone)]
pub enum ProblemSource {
    /// Read from disk on every `initialize`.
    Files(ProblemConfig),
    /// Already loaded.
    InMemory(Problem),
}

impl ProblemSource {
    pub fn load(&self) -> Result<Problem, ProblemError> {
        match self {
            Self::Files(config) => Problem::load(config),
            Self::InMemory(problem) => Ok(problem.clone()),
        }
    }
}

/// Search setup errors.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to load problem: {0}")]
    Problem(#[from] ProblemError),
}

/// Default evaluator: tiered fitness over progression-compiled automata.
pub type DefaultEvaluator = TieredEvaluator<ProgressionCompiler>;

/// Build the configured strategy. The returned search is uninitialized.
pub fn build_search(config: &SearchConfig) -> Result<Box<dyn PredicateSearch>, SearchError> {
    config.validate()?;
    let evaluator = TieredEvaluator::new(ProgressionCompiler::new(&config.compiler));
    let source = ProblemSource::Files(config.problem.clone());

    let search: Box<dyn PredicateSearch> = match &config.strategy {
        SearchStrategy::BruteForce(brute_force) => Box::new(BruteForceSearch::new(
            source,
            brute_force.max_depth,
            evaluator,
        )),
        SearchStrategy::GrammarEvolution(evolution) => Box::new(GrammarEvolutionSearch::new(
            source,
            evolution.clone(),
            evaluator,
        )),
    };
    Ok(search)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use crate::compute::automaton::CompileError;
    use crate::compute::evaluator::PredicateEvaluator;
    use crate::schema::TraceSet;

    /// Evaluator with fixed scores; unknown predicates fail to compile.
    pub struct StubEvaluator {
        pub scores: HashMap<String, f32>,
    }

    impl StubEvaluator {
        pub fn new(scores: &[(&str, f32)]) -> Self {
            Self {
                scores: scores.iter().map(|(p, f)| (p.to_string(), *f)).collect(),
            }
        }
    }

    impl PredicateEvaluator for StubEvaluator {
        fn evaluate(&self, predicate: &str, _traces: &TraceSet) -> Result<f32, CompileError> {
            self.scores
                .get(predicate)
                .copied()
                .ok_or(CompileError::TooManyStates { limit: 0 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SearchConfig;

    #[test]
    fn test_best_solutions() {
        let mut best = BestSolutions::new();
        assert!(best.offer("a", 1.0));
        assert!(!best.offer("b", 1.0));
        assert!(!best.offer("c", 0.5));
        assert_eq!(best.solutions().len(), 2);

        assert!(best.offer("d", 2.0));
        assert_eq!(best.fitness(), 2.0);
        assert_eq!(best.solutions().iter().collect::<Vec<_>>(), vec!["d"]);

        // Failed candidates are never recorded
        assert!(!best.offer("e", f32::NEG_INFINITY));
        assert!(!best.offer("f", f32::NAN));
        assert_eq!(best.solutions().len(), 1);
    }

    #[test]
    fn test_build_search_rejects_invalid_config() {
        let mut config = SearchConfig::default();
        config.compiler.max_states = 0;
        assert!(matches!(build_search(&config), Err(SearchError::Config(_))));
    }

    #[test]
    fn test_build_search_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SearchConfig::default();
        config.problem.grammar_path = dir.path().join("missing.bnf");
        config.problem.traces_path = dir.path().join("missing");

        let mut search = build_search(&config).unwrap();
        assert!(matches!(search.initialize(), Err(SearchError::Problem(_))));
        assert_eq!(search.step(), StepOutcome::NotInitialized);
        assert!(!search.is_terminated());
    }
}
