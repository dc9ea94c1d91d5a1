//! Grammar evolution: codon genomes decoded into predicates.

use std::collections::BTreeSet;

use log::{debug, info, warn};

use crate::compute::evaluator::PredicateEvaluator;
use crate::compute::evolution::{
    EvolutionEngine, FitnessLandscape, GeneticAlgorithm, GrammarDecoder,
};
use crate::schema::{GrammarEvolutionConfig, TraceSet};

use super::{BestSolutions, PredicateSearch, ProblemSource, SearchError, StepOutcome};

/// Fitness of a genome: decode, then score the phenotype.
///
/// Genomes that do not decode, and phenotypes that fail to compile, score
/// `f32::NEG_INFINITY`.
pub struct GrammarLandscape<'a, E> {
    pub decoder: &'a GrammarDecoder,
    pub traces: &'a TraceSet,
    pub evaluator: &'a E,
}

impl<E: PredicateEvaluator> FitnessLandscape for GrammarLandscape<'_, E> {
    fn fitness(&self, genome: &[u32]) -> f32 {
        let Some(derivation) = self.decoder.decode(genome) else {
            return f32::NEG_INFINITY;
        };
        match self.evaluator.evaluate(&derivation.phenotype, self.traces) {
            Ok(fitness) => fitness,
            Err(e) => {
                debug!("Skipping {}: {}", derivation.phenotype, e);
                f32::NEG_INFINITY
            }
        }
    }
}

struct Evolution {
    decoder: GrammarDecoder,
    traces: TraceSet,
}

/// Runs an [`EvolutionEngine`] for a fixed number of generations, one
/// generation per step.
pub struct GrammarEvolutionSearch<E, G = GeneticAlgorithm> {
    source: ProblemSource,
    config: GrammarEvolutionConfig,
    evaluator: E,
    engine: G,
    run: Option<Evolution>,
    best: BestSolutions,
    steps: usize,
}

impl<E: PredicateEvaluator> GrammarEvolutionSearch<E> {
    /// Search backed by the genetic algorithm. Without a configured seed a
    /// fresh one is drawn and logged.
    pub fn new(source: ProblemSource, config: GrammarEvolutionConfig, evaluator: E) -> Self {
        let seed = config.random_seed.unwrap_or_else(|| {
            let seed = rand::random();
            info!("Grammar evolution seed: {}", seed);
            seed
        });
        let engine = GeneticAlgorithm::new(&config, seed);
        Self::with_engine(source, config, evaluator, engine)
    }
}

impl<E: PredicateEvaluator, G: EvolutionEngine> GrammarEvolutionSearch<E, G> {
    pub fn with_engine(
        source: ProblemSource,
        config: GrammarEvolutionConfig,
        evaluator: E,
        engine: G,
    ) -> Self {
        Self {
            source,
            config,
            evaluator,
            engine,
            run: None,
            best: BestSolutions::new(),
            steps: 0,
        }
    }

    pub fn engine(&self) -> &G {
        &self.engine
    }

    /// Offer the fittest individuals of the current generation.
    fn record_generation(&mut self) {
        let Some(run) = self.run.as_ref() else {
            return;
        };
        let population = self.engine.population();
        let gen_best = population
            .iter()
            .map(|individual| individual.fitness)
            .fold(f32::NEG_INFINITY, f32::max);
        if gen_best == f32::NEG_INFINITY {
            debug!("Generation {}: no valid individual", self.engine.generation());
            return;
        }

        for individual in population.iter().filter(|i| i.fitness == gen_best) {
            let Some(derivation) = run.decoder.decode(&individual.genome) else {
                continue;
            };
            if self.best.offer(&derivation.phenotype, gen_best) {
                info!(
                    "Generation {}: new best fitness {} for {}",
                    self.engine.generation(),
                    gen_best,
                    derivation.phenotype
                );
            }
        }
    }
}

impl<E: PredicateEvaluator, G: EvolutionEngine> PredicateSearch for GrammarEvolutionSearch<E, G> {
    fn initialize(&mut self) -> Result<(), SearchError> {
        self.run = None;
        self.best = BestSolutions::new();
        self.steps = 0;
        let problem = self.source.load()?;
        let run = Evolution {
            decoder: GrammarDecoder::new(
                problem.grammar,
                self.config.max_depth,
                self.config.max_wraps,
            ),
            traces: problem.traces,
        };

        let landscape = GrammarLandscape {
            decoder: &run.decoder,
            traces: &run.traces,
            evaluator: &self.evaluator,
        };
        self.engine.initialize(&landscape);
        info!(
            "Grammar evolution: population {}, {} generations",
            self.engine.population().len(),
            self.config.population.max_generations
        );

        self.run = Some(run);
        self.record_generation();
        Ok(())
    }

    fn step(&mut self) -> StepOutcome {
        let Some(run) = self.run.as_ref() else {
            warn!("Grammar evolution stepped before initialization");
            return StepOutcome::NotInitialized;
        };
        if self.is_terminated() {
            debug!("Grammar evolution already terminated");
            return StepOutcome::Terminated;
        }

        let landscape = GrammarLandscape {
            decoder: &run.decoder,
            traces: &run.traces,
            evaluator: &self.evaluator,
        };
        self.engine.step(&landscape);
        self.steps += 1;
        self.record_generation();
        StepOutcome::Advanced
    }

    fn is_terminated(&self) -> bool {
        self.run.is_some() && self.engine.generation() >= self.config.population.max_generations
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
