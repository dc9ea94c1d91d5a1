//! Fitness of a predicate over a trace set.

use serde::{Deserialize, Serialize};

use crate::schema::TraceSet;

use super::automaton::{Automaton, AutomatonCompiler, CompileError};
use super::reward::TraceEvaluator;

/// Scores a predicate string against example and counter-example traces.
pub trait PredicateEvaluator: Send + Sync {
    fn evaluate(&self, predicate: &str, traces: &TraceSet) -> Result<f32, CompileError>;
}

/// Which tier a fitness value falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// Some examples are not yet fully accepted.
    ModelingExamples,
    /// Every example accepted, some counter-example still progresses.
    RejectingCounterExamples,
    /// Every example accepted, every counter-example rejected.
    Correct,
}

/// The parts a tiered fitness value is built from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessBreakdown {
    /// Mean end progress over examples.
    pub good_progress: f32,
    /// Mean end progress over counter-examples (0 when there are none).
    pub bad_progress: f32,
    /// Summed end reward over examples.
    pub reward: f32,
    pub tier: Tier,
    pub fitness: f32,
}

impl FitnessBreakdown {
    /// Combine the components into a tiered fitness.
    ///
    /// Each tier's values lie strictly above the previous tier's, so reward
    /// only orders candidates that are already correct.
    pub fn new(good_progress: f32, bad_progress: f32, reward: f32) -> Self {
        let (tier, fitness) = if good_progress < 1.0 {
            (Tier::ModelingExamples, good_progress)
        } else if bad_progress > 0.0 {
            (
                Tier::RejectingCounterExamples,
                good_progress + (1.0 - bad_progress),
            )
        } else {
            (
                Tier::Correct,
                good_progress + (1.0 - bad_progress) + reward_bonus(reward),
            )
        };
        Self {
            good_progress,
            bad_progress,
            reward,
            tier,
            fitness,
        }
    }
}

/// Strictly increasing and positive, so a negative reward cannot pull a
/// correct predicate below the lower tiers.
fn reward_bonus(reward: f32) -> f32 {
    if reward >= 0.0 {
        1.0 + reward
    } else {
        reward.exp()
    }
}

/// Compiles a predicate once per call and scores every trace against it.
#[derive(Debug, Clone)]
pub struct TieredEvaluator<C> {
    compiler: C,
}

impl<C: AutomatonCompiler> TieredEvaluator<C> {
    pub fn new(compiler: C) -> Self {
        Self { compiler }
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn evaluate_detailed(
        &self,
        predicate: &str,
        traces: &TraceSet,
    ) -> Result<FitnessBreakdown, CompileError> {
        let automaton = self.compiler.compile(predicate, &traces.atoms)?;
        Ok(score_automaton(&automaton, traces))
    }
}

impl<C: AutomatonCompiler> PredicateEvaluator for TieredEvaluator<C> {
    fn evaluate(&self, predicate: &str, traces: &TraceSet) -> Result<f32, CompileError> {
        self.evaluate_detailed(predicate, traces).map(|b| b.fitness)
    }
}

/// Tiered fitness of an already compiled automaton.
pub fn score_automaton(automaton: &Automaton, traces: &TraceSet) -> FitnessBreakdown {
    let evaluator = TraceEvaluator::new(automaton);

    let mut good = 0.0f32;
    let mut reward = 0.0f32;
    for trace in &traces.examples {
        let report = evaluator.evaluate(trace);
        good += report.end_progress;
        reward += report.end_reward;
    }
    let bad: f32 = traces
        .counter_examples
        .iter()
        .map(|trace| evaluator.evaluate(trace).end_progress)
        .sum();

    let mean = |total: f32, count: usize| {
        if count == 0 { 0.0 } else { total / count as f32 }
    };
    FitnessBreakdown::new(
        mean(good, traces.examples.len()),
        mean(bad, traces.counter_examples.len()),
        reward,
    )
}
