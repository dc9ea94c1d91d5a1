//! Codon genome utilities for grammar evolution.
//!
//! Provides random generation, crossover, and mutation operations.

use rand::prelude::*;

use crate::schema::GenomeConfig;

/// A genome: one codon per derivation choice.
pub type Codons = Vec<u32>;

/// Random number generator wrapper for genome operations.
pub struct CodonRng {
    rng: StdRng,
}

impl CodonRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate a uniformly random genome.
    pub fn random_genome(&mut self, config: &GenomeConfig) -> Codons {
        (0..config.length)
            .map(|_| self.rng.gen_range(0..config.codon_max))
            .collect()
    }

    /// Single-point crossover: a prefix of `parent1` followed by the rest of
    /// `parent2`.
    pub fn crossover(&mut self, parent1: &[u32], parent2: &[u32]) -> Codons {
        let len = parent1.len().min(parent2.len());
        if len < 2 {
            return parent1.to_vec();
        }
        let point = self.rng.gen_range(1..len);
        parent1[..point]
            .iter()
            .chain(&parent2[point..])
            .copied()
            .collect()
    }

    /// Replace each codon with a fresh random value with probability `rate`.
    pub fn mutate(&mut self, genome: &mut [u32], rate: f32, codon_max: u32) {
        for codon in genome.iter_mut() {
            if self.rng.r#gen::<f32>() < rate {
                *codon = self.rng.gen_range(0..codon_max);
            }
        }
    }

    /// Uniform value in [0, 1).
    pub fn unit(&mut self) -> f32 {
        self.rng.r#gen()
    }

    /// Uniform index below `bound`.
    pub fn index(&mut self, bound: usize) -> usize {
        self.rng.gen_range(0..bound)
    }
}

/// Fraction of codon positions at which two genomes differ.
pub fn codon_distance(g1: &[u32], g2: &[u32]) -> f32 {
    let len = g1.len().max(g2.len());
    if len == 0 {
        return 0.0;
    }
    let same = g1.iter().zip(g2).filter(|(a, b)| a == b).count();
    (len - same) as f32 / len as f32
}
