//! Configuration types for a predicate search run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{GrammarEvolutionConfig, LiteralMode, MappingError, StateMapping};

/// Top-level search configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Where the grammar and traces come from.
    pub problem: ProblemConfig,
    /// Search strategy to run.
    #[serde(default)]
    pub strategy: SearchStrategy,
    /// Limits for compiling candidate predicates.
    #[serde(default)]
    pub compiler: CompilerConfig,
}

/// Grammar and trace inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemConfig {
    /// BNF grammar file.
    pub grammar_path: PathBuf,
    /// Folder containing `examples/` and `counter-examples/`.
    pub traces_path: PathBuf,
    /// Shape of the synthesized `<literal>` rule.
    #[serde(default)]
    pub literals: LiteralMode,
    /// Optional state-variable mappings; empty means the CSV columns are
    /// already robustness values.
    #[serde(default)]
    pub mappings: Vec<StateMapping>,
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self {
            grammar_path: PathBuf::from("grammar.bnf"),
            traces_path: PathBuf::from("traces"),
            literals: LiteralMode::default(),
            mappings: Vec::new(),
        }
    }
}

/// Search strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SearchStrategy {
    /// Enumerate every string of the depth-bounded grammar.
    BruteForce(BruteForceConfig),
    /// Evolve codon genomes decoded through the grammar.
    GrammarEvolution(GrammarEvolutionConfig),
}

impl Default for SearchStrategy {
    fn default() -> Self {
        Self::BruteForce(BruteForceConfig::default())
    }
}

/// Brute-force enumeration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BruteForceConfig {
    /// Deepest tree level that is still expanded. Nodes at this depth get
    /// children at `max_depth + 1`, so `0` still expands the root once. This
    /// is one level more than a `depth < max_depth` bound would allow.
    #[serde(default = "default_brute_force_depth")]
    pub max_depth: usize,
}

impl Default for BruteForceConfig {
    fn default() -> Self {
        Self {
            max_depth: default_brute_force_depth(),
        }
    }
}

fn default_brute_force_depth() -> usize {
    3
}

/// Limits applied when compiling a predicate into an automaton.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Maximum number of automaton states.
    #[serde(default = "default_max_states")]
    pub max_states: usize,
    /// Maximum number of distinct atoms a single state may branch on.
    #[serde(default = "default_max_guard_atoms")]
    pub max_guard_atoms: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_states: default_max_states(),
            max_guard_atoms: default_max_guard_atoms(),
        }
    }
}

fn default_max_states() -> usize {
    256
}
fn default_max_guard_atoms() -> usize {
    12
}

impl SearchConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.problem.grammar_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath("grammar_path"));
        }
        if self.problem.traces_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingPath("traces_path"));
        }
        for mapping in &self.problem.mappings {
            mapping.validate()?;
        }
        if self.compiler.max_states == 0 {
            return Err(ConfigError::InvalidMaxStates);
        }
        if self.compiler.max_guard_atoms == 0 || self.compiler.max_guard_atoms > 20 {
            return Err(ConfigError::InvalidGuardAtoms(self.compiler.max_guard_atoms));
        }
        if let SearchStrategy::GrammarEvolution(evolution) = &self.strategy {
            evolution.validate()?;
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required path '{0}'")]
    MissingPath(&'static str),
    #[error("Compiler state limit must be non-zero")]
    InvalidMaxStates,
    #[error("Compiler guard atom limit must be within 1..=20, got {0}")]
    InvalidGuardAtoms(usize),
    #[error("Invalid state mapping: {0}")]
    Mapping(#[from] MappingError),
    #[error("Invalid evolution config: {0}")]
    Evolution(#[from] super::EvolutionConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = SearchConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "problem": {
                "grammar_path": "g.bnf",
                "traces_path": "traces",
                "literals": "Block",
                "mappings": [{"type": "Identity", "variable": "near"}]
            },
            "strategy": {"type": "GrammarEvolution", "max_depth": 6, "random_seed": 3},
            "compiler": {"max_states": 32}
        }"#;
        let config: SearchConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.problem.literals, LiteralMode::Block);
        assert_eq!(config.compiler.max_states, 32);
        assert_eq!(config.compiler.max_guard_atoms, 12);
        match config.strategy {
            SearchStrategy::GrammarEvolution(evolution) => {
                assert_eq!(evolution.max_depth, 6);
                assert_eq!(evolution.random_seed, Some(3));
            }
            other => panic!("unexpected strategy {:?}", other),
        }
    }

    #[test]
    fn test_invalid_config() {
        let mut config = SearchConfig::default();
        config.compiler.max_guard_atoms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidGuardAtoms(0))
        ));

        let mut config = SearchConfig::default();
        config.problem.mappings.push(StateMapping::LessThan {
            variable: "x".to_string(),
            threshold: 5.0,
            lower_bound: 0.0,
            upper_bound: 1.0,
        });
        assert!(matches!(config.validate(), Err(ConfigError::Mapping(_))));
    }
}
