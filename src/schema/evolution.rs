//! Evolution configuration types for grammar-guided predicate search.
//!
//! A genome is a fixed-length vector of integer codons; each codon picks a
//! production at one choice point of a grammar derivation.

use serde::{Deserialize, Serialize};

/// Top-level configuration for grammar evolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarEvolutionConfig {
    /// Deepest derivation level at which a non-terminal may still be
    /// expanded. Same bound as brute force: one level more than a
    /// `depth < max_depth` test.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// How many times decoding may wrap around to the start of the genome.
    #[serde(default = "default_max_wraps")]
    pub max_wraps: usize,
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Genome shape.
    #[serde(default)]
    pub genome: GenomeConfig,
    /// Genetic operators.
    #[serde(default)]
    pub algorithm: GeneticAlgorithmConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Evaluate each generation with rayon.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for GrammarEvolutionConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_wraps: default_max_wraps(),
            population: PopulationConfig::default(),
            genome: GenomeConfig::default(),
            algorithm: GeneticAlgorithmConfig::default(),
            random_seed: None,
            parallel: false,
        }
    }
}

fn default_max_depth() -> usize {
    8
}
fn default_max_wraps() -> usize {
    2
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of individuals in population.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Number of generations to run.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_max_generations() -> usize {
    100
}

/// Genome shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeConfig {
    /// Number of codons per genome.
    #[serde(default = "default_genome_length")]
    pub length: usize,
    /// Codons are drawn from `0..codon_max`.
    #[serde(default = "default_codon_max")]
    pub codon_max: u32,
}

impl Default for GenomeConfig {
    fn default() -> Self {
        Self {
            length: default_genome_length(),
            codon_max: default_codon_max(),
        }
    }
}

fn default_genome_length() -> usize {
    32
}
fn default_codon_max() -> u32 {
    256
}

/// Genetic Algorithm configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticAlgorithmConfig {
    /// Selection method.
    #[serde(default)]
    pub selection: SelectionMethod,
    /// Crossover probability (0.0-1.0).
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f32,
    /// Mutation probability per codon (0.0-1.0).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f32,
    /// Elitism: number of best individuals to preserve unchanged.
    #[serde(default = "default_elitism")]
    pub elitism: usize,
}

impl Default for GeneticAlgorithmConfig {
    fn default() -> Self {
        Self {
            selection: SelectionMethod::default(),
            crossover_rate: default_crossover_rate(),
            mutation_rate: default_mutation_rate(),
            elitism: default_elitism(),
        }
    }
}

fn default_crossover_rate() -> f32 {
    0.9
}
fn default_mutation_rate() -> f32 {
    0.05
}
fn default_elitism() -> usize {
    2
}

/// Selection method for genetic algorithm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    /// Tournament selection with configurable size.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
    /// Rank-based selection.
    RankBased,
    /// Roulette wheel (fitness-proportionate) selection.
    RouletteWheel,
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::Tournament {
            size: default_tournament_size(),
        }
    }
}

fn default_tournament_size() -> usize {
    2
}

/// Fitness history over generations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvolutionHistory {
    /// Best fitness per generation.
    pub best_fitness: Vec<f32>,
    /// Average fitness per generation (over finite fitness values).
    pub avg_fitness: Vec<f32>,
    /// Standard deviation per generation.
    pub fitness_std: Vec<f32>,
    /// Mean pairwise codon distance per generation.
    pub diversity: Vec<f32>,
}

// ============================================================================
// Validation
// ============================================================================

/// Evolution configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Genome length must be non-zero")]
    EmptyGenome,
    #[error("Codon range must contain at least one value")]
    InvalidCodonMax,
    #[error("Invalid rate: {0}")]
    InvalidRate(String),
    #[error("Elitism ({elitism}) must be smaller than the population ({size})")]
    ElitismTooLarge { elitism: usize, size: usize },
    #[error("Tournament size must be non-zero")]
    InvalidTournamentSize,
}

impl GrammarEvolutionConfig {
    /// Validate evolution configuration.
    pub fn validate(&self) -> Result<(), EvolutionConfigError> {
        if self.population.size < 2 {
            return Err(EvolutionConfigError::PopulationTooSmall);
        }
        if self.genome.length == 0 {
            return Err(EvolutionConfigError::EmptyGenome);
        }
        if self.genome.codon_max == 0 {
            return Err(EvolutionConfigError::InvalidCodonMax);
        }

        let check_rate = |rate: f32, name: &str| {
            if (0.0..=1.0).contains(&rate) {
                Ok(())
            } else {
                Err(EvolutionConfigError::InvalidRate(format!(
                    "{} ({}) must be within [0, 1]",
                    name, rate
                )))
            }
        };
        check_rate(self.algorithm.crossover_rate, "crossover_rate")?;
        check_rate(self.algorithm.mutation_rate, "mutation_rate")?;

        if self.algorithm.elitism >= self.population.size {
            return Err(EvolutionConfigError::ElitismTooLarge {
                elitism: self.algorithm.elitism,
                size: self.population.size,
            });
        }
        if self.algorithm.selection == (SelectionMethod::Tournament { size: 0 }) {
            return Err(EvolutionConfigError::InvalidTournamentSize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = GrammarEvolutionConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let mut config = GrammarEvolutionConfig::default();
        config.population.size = 1;
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::PopulationTooSmall)
        ));

        let mut config = GrammarEvolutionConfig::default();
        config.algorithm.mutation_rate = 1.5;
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::InvalidRate(_))
        ));

        let mut config = GrammarEvolutionConfig::default();
        config.algorithm.elitism = config.population.size;
        assert!(matches!(
            config.validate(),
            Err(EvolutionConfigError::ElitismTooLarge { .. })
        ));
    }

    #[test]
    fn test_serde_defaults() {
        let config: GrammarEvolutionConfig =
            serde_json::from_str(r#"{"random_seed": 7, "algorithm": {"selection": {"method": "RankBased"}}}"#)
                .unwrap();
        assert_eq!(config.random_seed, Some(7));
        assert_eq!(config.algorithm.selection, SelectionMethod::RankBased);
        assert_eq!(config.population.size, 50);
        assert!(!config.parallel);
    }
}
