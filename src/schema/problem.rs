//! A search problem: the grammar and the traces it is scored against.

use log::info;

use super::{Grammar, GrammarError, LiteralMode, ProblemConfig, TraceError, TraceSet};

/// Grammar with its `<literal>` rule injected, plus the loaded traces.
#[derive(Debug, Clone)]
pub struct Problem {
    pub grammar: Grammar,
    pub traces: TraceSet,
}

impl Problem {
    /// Combine an already-parsed grammar with loaded traces.
    ///
    /// Injects the literal rule from the trace atoms, then validates.
    pub fn new(
        mut grammar: Grammar,
        traces: TraceSet,
        literals: LiteralMode,
    ) -> Result<Self, ProblemError> {
        if traces.examples.is_empty() {
            return Err(ProblemError::NoExamples);
        }
        if traces.atoms.is_empty() {
            return Err(ProblemError::NoAtoms);
        }
        grammar.inject_literals(&traces.atoms.sorted_names(), literals);
        grammar.validate()?;
        Ok(Self { grammar, traces })
    }

    /// Read traces first, then the grammar, as named by `config`.
    pub fn load(config: &ProblemConfig) -> Result<Self, ProblemError> {
        let traces = TraceSet::load(&config.traces_path, &config.mappings)?;
        let grammar = Grammar::from_file(&config.grammar_path)?;
        let problem = Self::new(grammar, traces, config.literals)?;
        info!(
            "Loaded grammar {} with {} rules",
            config.grammar_path.display(),
            problem.grammar.rules().len()
        );
        Ok(problem)
    }
}

/// Problem loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ProblemError {
    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),
    #[error("No example traces were loaded")]
    NoExamples,
    #[error("Traces define no atomic predicates")]
    NoAtoms,
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_load_problem() {
        let dir = tempfile::tempdir().unwrap();
        let grammar_path = dir.path().join("grammar.bnf");
        fs::write(&grammar_path, "<expr> ::= <literal> | \"F\" <literal>").unwrap();
        fs::create_dir_all(dir.path().join("examples")).unwrap();
        fs::write(dir.path().join("examples/run.csv"), "b,a\n1,-1\n").unwrap();

        let config = ProblemConfig {
            grammar_path,
            traces_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        let problem = Problem::load(&config).unwrap();
        let literal = problem.grammar.rule(crate::schema::LITERAL_RULE).unwrap();
        assert_eq!(literal.productions.len(), 2);
        assert_eq!(problem.traces.examples.len(), 1);
    }

    #[test]
    fn test_requires_examples() {
        let dir = tempfile::tempdir().unwrap();
        let grammar_path = dir.path().join("grammar.bnf");
        fs::write(&grammar_path, "<expr> ::= <literal>").unwrap();
        fs::create_dir_all(dir.path().join("counter-examples")).unwrap();
        fs::write(dir.path().join("counter-examples/run.csv"), "a\n1\n").unwrap();

        let config = ProblemConfig {
            grammar_path,
            traces_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(matches!(Problem::load(&config), Err(ProblemError::NoExamples)));
    }

    #[test]
    fn test_missing_grammar_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("examples")).unwrap();
        fs::write(dir.path().join("examples/run.csv"), "a\n1\n").unwrap();

        let config = ProblemConfig {
            grammar_path: dir.path().join("missing.bnf"),
            traces_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(matches!(
            Problem::load(&config),
            Err(ProblemError::Grammar(GrammarError::Io { .. }))
        ));
    }
}
