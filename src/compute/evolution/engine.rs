//! Genetic algorithm over codon genomes.

use rayon::prelude::*;

use crate::schema::{
    EvolutionHistory, GeneticAlgorithmConfig, GenomeConfig, GrammarEvolutionConfig,
    SelectionMethod,
};

use super::genome::{CodonRng, Codons, codon_distance};

/// A member of the population.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    pub genome: Codons,
    /// `f32::NEG_INFINITY` until evaluated, or when the genome is invalid.
    pub fitness: f32,
}

/// Scores genomes. Must be a pure function of the genome.
pub trait FitnessLandscape: Sync {
    fn fitness(&self, genome: &[u32]) -> f32;
}

/// Population-based optimizer driven one generation at a time.
pub trait EvolutionEngine {
    /// Create and evaluate the first generation.
    fn initialize(&mut self, landscape: &dyn FitnessLandscape);

    /// Breed and evaluate the next generation.
    fn step(&mut self, landscape: &dyn FitnessLandscape);

    /// Current, evaluated population.
    fn population(&self) -> &[Individual];

    /// Number of generations bred since initialization.
    fn generation(&self) -> usize;
}

/// Elitist genetic algorithm with configurable selection.
pub struct GeneticAlgorithm {
    population_size: usize,
    genome: GenomeConfig,
    algorithm: GeneticAlgorithmConfig,
    parallel: bool,
    rng: CodonRng,
    population: Vec<Individual>,
    history: EvolutionHistory,
    generation: usize,
    best_fitness: f32,
}

impl GeneticAlgorithm {
    pub fn new(config: &GrammarEvolutionConfig, seed: u64) -> Self {
        Self {
            population_size: config.population.size,
            genome: config.genome.clone(),
            algorithm: config.algorithm.clone(),
            parallel: config.parallel,
            rng: CodonRng::new(seed),
            population: Vec::new(),
            history: EvolutionHistory::default(),
            generation: 0,
            best_fitness: f32::NEG_INFINITY,
        }
    }

    pub fn history(&self) -> &EvolutionHistory {
        &self.history
    }

    /// Best fitness seen in any generation.
    pub fn best_fitness(&self) -> f32 {
        self.best_fitness
    }

    /// Evaluate individuals from `start` on.
    fn evaluate_from(&mut self, start: usize, landscape: &dyn FitnessLandscape) {
        let pending = &mut self.population[start..];
        if self.parallel {
            pending.par_iter_mut().for_each(|individual| {
                individual.fitness = landscape.fitness(&individual.genome);
            });
        } else {
            for individual in pending {
                individual.fitness = landscape.fitness(&individual.genome);
            }
        }
    }

    /// Sort by fitness (descending) and append to the history.
    fn record_generation(&mut self) {
        self.population
            .sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

        let gen_best = self
            .population
            .first()
            .map_or(f32::NEG_INFINITY, |c| c.fitness);
        if gen_best > self.best_fitness {
            self.best_fitness = gen_best;
        }

        // -inf marks genomes that did not decode
        let finite: Vec<f32> = self
            .population
            .iter()
            .map(|c| c.fitness)
            .filter(|f| f.is_finite())
            .collect();
        let (avg_fitness, std) = if finite.is_empty() {
            (f32::NEG_INFINITY, 0.0)
        } else {
            let avg = finite.iter().sum::<f32>() / finite.len() as f32;
            let variance =
                finite.iter().map(|f| (f - avg).powi(2)).sum::<f32>() / finite.len() as f32;
            (avg, variance.sqrt())
        };

        self.history.best_fitness.push(gen_best);
        self.history.avg_fitness.push(avg_fitness);
        self.history.fitness_std.push(std);
        let diversity = self.compute_diversity();
        self.history.diversity.push(diversity);

        log::debug!(
            "Generation {}: best {:.4}, mean {:.4}, diversity {:.3}",
            self.generation,
            gen_best,
            avg_fitness,
            diversity
        );
    }

    /// Select a parent index using the specified method.
    fn select_index(&mut self, method: &SelectionMethod) -> usize {
        let len = self.population.len();
        match method {
            SelectionMethod::Tournament { size } => {
                let mut best_idx = self.rng.index(len);
                for _ in 1..*size {
                    let idx = self.rng.index(len);
                    if self.population[idx].fitness > self.population[best_idx].fitness {
                        best_idx = idx;
                    }
                }
                best_idx
            }
            SelectionMethod::RankBased => {
                // Population is sorted, so index 0 has the highest rank
                let total_rank: usize = (1..=len).sum();
                let mut target = self.rng.index(total_rank);
                for i in 0..len {
                    let rank = len - i;
                    if target < rank {
                        return i;
                    }
                    target -= rank;
                }
                0
            }
            SelectionMethod::RouletteWheel => {
                let total_fitness: f32 = self.population.iter().map(|c| c.fitness.max(0.0)).sum();
                if total_fitness <= 0.0 {
                    return self.rng.index(len);
                }

                let target = self.rng.unit() * total_fitness;
                let mut cumulative = 0.0;
                for (i, candidate) in self.population.iter().enumerate() {
                    cumulative += candidate.fitness.max(0.0);
                    if cumulative >= target {
                        return i;
                    }
                }
                0
            }
        }
    }

    /// Mean pairwise codon distance.
    fn compute_diversity(&self) -> f32 {
        if self.population.len() < 2 {
            return 0.0;
        }

        let mut total_distance = 0.0f32;
        let mut count = 0;
        for i in 0..self.population.len() {
            for j in (i + 1)..self.population.len() {
                total_distance +=
                    codon_distance(&self.population[i].genome, &self.population[j].genome);
                count += 1;
            }
        }
        total_distance / count as f32
    }
}

impl EvolutionEngine for GeneticAlgorithm {
    fn initialize(&mut self, landscape: &dyn FitnessLandscape) {
        self.generation = 0;
        self.best_fitness = f32::NEG_INFINITY;
        self.history = EvolutionHistory::default();
        self.population = (0..self.population_size)
            .map(|_| Individual {
                genome: self.rng.random_genome(&self.genome),
                fitness: f32::NEG_INFINITY,
            })
            .collect();

        self.evaluate_from(0, landscape);
        self.record_generation();
    }

    fn step(&mut self, landscape: &dyn FitnessLandscape) {
        if self.population.is_empty() {
            log::warn!("Genetic algorithm stepped before initialization");
            return;
        }
        let ga_config = self.algorithm.clone();

        // Elitism: the population is sorted, keep the head unchanged
        let elites = ga_config.elitism.min(self.population.len());
        let mut next_gen: Vec<Individual> = self.population[..elites].to_vec();

        while next_gen.len() < self.population_size {
            let idx1 = self.select_index(&ga_config.selection);
            let idx2 = self.select_index(&ga_config.selection);

            let mut child = if self.rng.unit() < ga_config.crossover_rate {
                self.rng
                    .crossover(&self.population[idx1].genome, &self.population[idx2].genome)
            } else {
                self.population[idx1].genome.clone()
            };
            self.rng
                .mutate(&mut child, ga_config.mutation_rate, self.genome.codon_max);

            next_gen.push(Individual {
                genome: child,
                fitness: f32::NEG_INFINITY,
            });
        }

        self.population = next_gen;
        self.generation += 1;
        self.evaluate_from(elites, landscape);
        self.record_generation();
    }

    fn population(&self) -> &[Individual] {
        &self.population
    }

    fn generation(&self) -> usize {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PopulationConfig;

    /// Counts codons equal to 1.
    struct Ones;

    impl FitnessLandscape for Ones {
        fn fitness(&self, genome: &[u32]) -> f32 {
            genome.iter().filter(|&&c| c == 1).count() as f32
        }
    }

    fn config(selection: SelectionMethod) -> GrammarEvolutionConfig {
        GrammarEvolutionConfig {
            population: PopulationConfig {
                size: 20,
                max_generations: 30,
            },
            genome: GenomeConfig {
                length: 16,
                codon_max: 4,
            },
            algorithm: GeneticAlgorithmConfig {
                selection,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_initialize() {
        let mut ga = GeneticAlgorithm::new(&config(SelectionMethod::default()), 42);
        ga.initialize(&Ones);

        assert_eq!(ga.population().len(), 20);
        assert_eq!(ga.generation(), 0);
        assert!(ga.population().iter().all(|i| i.fitness.is_finite()));
        assert!(
            ga.population()
                .windows(2)
                .all(|w| w[0].fitness >= w[1].fitness)
        );
        assert_eq!(ga.history().best_fitness.len(), 1);
    }

    #[test]
    fn test_elitism_never_loses_best() {
        for selection in [
            SelectionMethod::Tournament { size: 3 },
            SelectionMethod::RankBased,
            SelectionMethod::RouletteWheel,
        ] {
            let mut ga = GeneticAlgorithm::new(&config(selection), 7);
            ga.initialize(&Ones);
            for _ in 0..30 {
                ga.step(&Ones);
            }

            let best = &ga.history().best_fitness;
            assert_eq!(best.len(), 31);
            assert!(best.windows(2).all(|w| w[1] >= w[0]));
            assert!(best[30] > best[0]);
            assert_eq!(ga.generation(), 30);
        }
    }

    #[test]
    fn test_seed_reproducible() {
        let run = |parallel: bool| {
            let mut cfg = config(SelectionMethod::default());
            cfg.parallel = parallel;
            let mut ga = GeneticAlgorithm::new(&cfg, 11);
            ga.initialize(&Ones);
            for _ in 0..5 {
                ga.step(&Ones);
            }
            ga.population().to_vec()
        };
        assert_eq!(run(false), run(false));
        // Fitness is pure, so parallel evaluation changes nothing
        assert_eq!(run(false), run(true));
    }

    #[test]
    fn test_step_before_initialize() {
        let mut ga = GeneticAlgorithm::new(&config(SelectionMethod::default()), 1);
        ga.step(&Ones);
        assert!(ga.population().is_empty());
        assert_eq!(ga.generation(), 0);
    }
}
