//! Exhaustive search over the depth-bounded grammar.

use std::collections::BTreeSet;

use log::{debug, info, warn};

use crate::compute::evaluator::PredicateEvaluator;
use crate::compute::tree::GrammarTree;
use crate::schema::TraceSet;

use super::{BestSolutions, PredicateSearch, ProblemSource, SearchError, StepOutcome};

/// State that exists only after a successful `initialize`.
struct Enumeration {
    traces: TraceSet,
    candidates: Vec<String>,
    next: usize,
}

/// Scores every terminal string of the production tree, one per step.
pub struct BruteForceSearch<E> {
    source: ProblemSource,
    max_depth: usize,
    evaluator: E,
    run: Option<Enumeration>,
    best: BestSolutions,
    steps: usize,
}

impl<E: PredicateEvaluator> BruteForceSearch<E> {
    pub fn new(source: ProblemSource, max_depth: usize, evaluator: E) -> Self {
        Self {
            source,
            max_depth,
            evaluator,
            run: None,
            best: BestSolutions::new(),
            steps: 0,
        }
    }

    /// Candidates in evaluation order; empty before initialization.
    pub fn candidates(&self) -> &[String] {
        self.run
            .as_ref()
            .map(|run| run.candidates.as_slice())
            .unwrap_or_default()
    }
}

impl<E: PredicateEvaluator> PredicateSearch for BruteForceSearch<E> {
    fn initialize(&mut self) -> Result<(), SearchError> {
        self.run = None;
        self.best = BestSolutions::new();
        self.steps = 0;
        let problem = self.source.load()?;

        let tree = GrammarTree::build(&problem.grammar, self.max_depth);
        let candidates = tree.enumerate();
        info!(
            "Brute force: {} tree nodes, {} candidates at depth {}",
            tree.len(),
            candidates.len(),
            self.max_depth
        );

        self.run = Some(Enumeration {
            traces: problem.traces,
            candidates,
            next: 0,
        });
        Ok(())
    }

    fn step(&mut self) -> StepOutcome {
        let Some(run) = self.run.as_mut() else {
            warn!("Brute force search stepped before initialization");
            return StepOutcome::NotInitialized;
        };
        let Some(candidate) = run.candidates.get(run.next) else {
            debug!("Brute force search already terminated");
            return StepOutcome::Terminated;
        };

        match self.evaluator.evaluate(candidate, &run.traces) {
            Ok(fitness) => {
                debug!("{} -> {}", candidate, fitness);
                if self.best.offer(candidate, fitness) {
                    info!("New best fitness {} for {}", fitness, candidate);
                }
            }
            Err(e) => debug!("Skipping {}: {}", candidate, e),
        }

        run.next += 1;
        self.steps += 1;
        StepOutcome::Advanced
    }

    fn is_terminated(&self) -> bool {
        self.run
            .as_ref()
            .is_some_and(|run| run.next >= run.candidates.len())
    }

    fn best_solutions(&self) -> &BTreeSet<String> {
        self.best.solutions()
    }

    fn best_fitness(&self) -> f32 {
        self.best.fitness()
    }

    fn steps(&self) -> usize {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::compute::evaluator::TieredEvaluator;
    use crate::compute::progression::ProgressionCompiler;
    use crate::compute::search::testing::StubEvaluator;
    use crate::schema::{
        AtomTable, CompilerConfig, Grammar, LiteralMode, Problem, ProblemConfig, Valuation,
    };

    fn problem(grammar: &str) -> Problem {
        let mut atoms = AtomTable::new();
        atoms.intern("a");
        atoms.intern("b");
        let traces = TraceSet {
            atoms,
            examples: vec![vec![Valuation::new().with(0, 1.0).with(1, -1.0)]],
            counter_examples: Vec::new(),
        };
        Problem::new(Grammar::parse(grammar).unwrap(), traces, LiteralMode::Plain).unwrap()
    }

    fn run_to_end<S: PredicateSearch>(search: &mut S) {
        while search.step() == StepOutcome::Advanced {}
    }

    #[test]
    fn test_depth_zero_enumeration() {
        let source = ProblemSource::InMemory(problem("<S> ::= \"a\" | \"b\""));
        let evaluator = StubEvaluator::new(&[("a", 0.5), ("b", 1.5)]);
        let mut search = BruteForceSearch::new(source, 0, evaluator);
        search.initialize().unwrap();

        assert_eq!(search.candidates(), ["a", "b"]);
        run_to_end(&mut search);
        assert!(search.is_terminated());
        assert_eq!(search.steps(), 2);
        assert_eq!(search.best_fitness(), 1.5);
        assert_eq!(search.best_solutions().iter().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_ties_are_kept() {
        let source = ProblemSource::InMemory(problem("<S> ::= \"a\" | \"b\""));
        let evaluator = StubEvaluator::new(&[("a", 1.0), ("b", 1.0)]);
        let mut search = BruteForceSearch::new(source, 0, evaluator);
        search.initialize().unwrap();
        run_to_end(&mut search);
        assert_eq!(search.best_solutions().len(), 2);
    }

    #[test]
    fn test_misuse_is_a_no_op() {
        let source = ProblemSource::InMemory(problem("<S> ::= \"a\""));
        let mut search = BruteForceSearch::new(source, 0, StubEvaluator::new(&[("a", 1.0)]));

        assert_eq!(search.step(), StepOutcome::NotInitialized);
        assert!(!search.is_terminated());
        assert_eq!(search.steps(), 0);

        search.initialize().unwrap();
        assert_eq!(search.step(), StepOutcome::Advanced);
        assert_eq!(search.step(), StepOutcome::Terminated);
        assert_eq!(search.step(), StepOutcome::Terminated);
        assert_eq!(search.steps(), 1);
        assert_eq!(search.best_fitness(), 1.0);
    }

    #[test]
    fn test_compile_failures_are_skipped() {
        let source = ProblemSource::InMemory(problem("<S> ::= \"a\" | \"b\""));
        let mut search = BruteForceSearch::new(source, 0, StubEvaluator::new(&[("b", 0.0)]));
        search.initialize().unwrap();
        run_to_end(&mut search);
        assert_eq!(search.best_solutions().iter().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_reinitialize_resets() {
        let source = ProblemSource::InMemory(problem("<S> ::= \"a\" | \"b\""));
        let mut search =
            BruteForceSearch::new(source, 0, StubEvaluator::new(&[("a", 1.0), ("b", 2.0)]));
        search.initialize().unwrap();
        run_to_end(&mut search);
        search.initialize().unwrap();
        assert_eq!(search.steps(), 0);
        assert!(search.best_solutions().is_empty());
        assert!(!search.is_terminated());
    }

    #[test]
    fn test_failed_reinitialize_clears_results() {
        let dir = tempfile::tempdir().unwrap();
        let grammar_path = dir.path().join("grammar.bnf");
        fs::write(&grammar_path, "<S> ::= \"a\" | \"b\"\n").unwrap();
        fs::create_dir_all(dir.path().join("examples")).unwrap();
        fs::write(dir.path().join("examples/run.csv"), "a,b\n1,-1\n").unwrap();

        let config = ProblemConfig {
            grammar_path: grammar_path.clone(),
            traces_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        let evaluator = StubEvaluator::new(&[("a", 1.0), ("b", 2.0)]);
        let mut search = BruteForceSearch::new(ProblemSource::Files(config), 0, evaluator);
        search.initialize().unwrap();
        run_to_end(&mut search);
        assert_eq!(search.best_fitness(), 2.0);

        fs::remove_file(&grammar_path).unwrap();
        assert!(search.initialize().is_err());
        assert!(search.best_solutions().is_empty());
        assert_eq!(search.best_fitness(), f32::NEG_INFINITY);
        assert_eq!(search.steps(), 0);
        assert_eq!(search.step(), StepOutcome::NotInitialized);
    }

    #[test]
    fn test_end_to_end_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let grammar_path = dir.path().join("grammar.bnf");
        fs::write(&grammar_path, "<predicate> ::= <literal>\n").unwrap();
        fs::create_dir_all(dir.path().join("examples")).unwrap();
        fs::create_dir_all(dir.path().join("counter-examples")).unwrap();
        fs::write(dir.path().join("examples/run.csv"), "a,b\n1,-1\n").unwrap();
        fs::write(dir.path().join("counter-examples/run.csv"), "a,b\n-1,1\n").unwrap();

        let config = ProblemConfig {
            grammar_path,
            traces_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        let evaluator = TieredEvaluator::new(ProgressionCompiler::new(&CompilerConfig::default()));
        let mut search = BruteForceSearch::new(ProblemSource::Files(config), 1, evaluator);
        search.initialize().unwrap();

        assert_eq!(search.candidates(), ["a", "b"]);
        run_to_end(&mut search);
        assert!(search.is_terminated());
        assert_eq!(search.best_solutions().iter().collect::<Vec<_>>(), vec!["a"]);
        assert!(search.best_fitness() > 2.0);
    }
}
