//! Grammar evolution.
//!
//! - **Genome Operations** (`genome`): codon generation, crossover and mutation
//! - **Decoding** (`decoder`): codons to predicate strings through a grammar
//! - **Engine** (`engine`): the [`EvolutionEngine`] / [`FitnessLandscape`]
//!   seam and a genetic algorithm behind it

mod decoder;
mod engine;
mod genome;

pub use decoder::{Derivation, GrammarDecoder};
pub use engine::{EvolutionEngine, FitnessLandscape, GeneticAlgorithm, Individual};
pub use genome::{CodonRng, Codons, codon_distance};
