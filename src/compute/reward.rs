//! Progress and reward of a trace against an automaton.
//!
//! The walk starts at the initial state. At every step the current state is
//! scored by its distance to acceptance and by how robustly the valuation
//! satisfies the edges that would bring the run closer. The run then moves
//! along the most robust outgoing edge if that edge is satisfied.

use crate::schema::Valuation;

use super::automaton::{Automaton, StateId};
use super::robustness::robustness;

/// Outcome of walking one trace through an automaton.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationReport {
    /// Steps left unread when the walk stopped.
    pub steps_remaining: usize,
    /// How close the run came to acceptance, in [0, 1].
    pub end_progress: f32,
    /// Accumulated tie-breaking reward.
    pub end_reward: f32,
}

/// Shortest number of steps from each state to any acceptance state.
///
/// Self loops are ignored. States that cannot reach acceptance get
/// `automaton.size()`.
pub fn distances_to_acceptance(automaton: &Automaton) -> Vec<usize> {
    let n = automaton.size();
    let mut dist = vec![vec![n; n]; n];
    for (i, row) in dist.iter_mut().enumerate() {
        row[i] = 0;
        for edge in automaton.edges(i) {
            if edge.target != i {
                row[edge.target] = 1;
            }
        }
    }
    for k in 0..n {
        for i in 0..n {
            let dik = dist[i][k];
            if dik >= n {
                continue;
            }
            for j in 0..n {
                let through = dik + dist[k][j];
                if through < dist[i][j] {
                    dist[i][j] = through;
                }
            }
        }
    }

    (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| automaton.is_accepting(j))
                .map(|j| dist[i][j])
                .fold(n, usize::min)
        })
        .collect()
}

/// Walk `trace` through `automaton`.
pub fn evaluate_trace(automaton: &Automaton, trace: &[Valuation]) -> EvaluationReport {
    TraceEvaluator::new(automaton).evaluate(trace)
}

/// Trace walker with the automaton's distances precomputed, for scoring
/// many traces against the same automaton.
#[derive(Debug, Clone)]
pub struct TraceEvaluator<'a> {
    automaton: &'a Automaton,
    distances: Vec<usize>,
    max_distance: usize,
    has_acceptance_conditions: bool,
}

/// Best edges leaving a state under one valuation.
struct StateRobustness {
    best_outgoing: Option<StateId>,
    best_outgoing_robustness: f32,
}

impl<'a> TraceEvaluator<'a> {
    pub fn new(automaton: &'a Automaton) -> Self {
        let distances = distances_to_acceptance(automaton);
        let n = automaton.size();

        let unreachable = distances.iter().filter(|&&d| d == n).count();
        let max_distance = if unreachable == n {
            n
        } else {
            distances.iter().copied().filter(|&d| d < n).max().unwrap_or(0)
        };

        Self {
            automaton,
            distances,
            max_distance,
            has_acceptance_conditions: max_distance < n,
        }
    }

    pub fn distances(&self) -> &[usize] {
        &self.distances
    }

    /// Largest finite distance to acceptance.
    pub fn max_distance(&self) -> usize {
        self.max_distance
    }

    pub fn has_acceptance_conditions(&self) -> bool {
        self.has_acceptance_conditions
    }

    pub fn evaluate(&self, trace: &[Valuation]) -> EvaluationReport {
        let automaton = self.automaton;
        let n = automaton.size();
        let scale = self.max_distance.max(1) as f32;

        let mut state = automaton.initial_state();
        let mut end_progress = 0.0f32;
        let mut end_reward = 0.0f32;
        let mut t = 0;

        while t < trace.len() {
            let valuation = &trace[t];
            let info = self.max_robustness(state, valuation);
            let has_outgoing = info.best_outgoing.is_some();

            if self.has_acceptance_conditions {
                let current = self.distances[state];

                if current == n {
                    // Trap: acceptance is out of reach
                    end_progress = 0.0;
                    break;
                }
                if current == 0 && !has_outgoing {
                    end_progress = 1.0;
                    end_reward += 1.0;
                    break;
                }

                let base_progress = 1.0 - current as f32 / scale;
                let improving = self.best_improving_robustness(state, valuation);

                if current == 0 && improving < 0.0 {
                    // Only edges leaving acceptance are satisfied
                    end_reward -= info.best_outgoing_robustness;
                    end_progress = 1.0;
                } else {
                    let subtask_progress = (1.0 + improving.min(0.0)) / scale;
                    end_progress = (base_progress + subtask_progress).min(1.0);
                    end_reward += improving;
                }
            } else {
                if !has_outgoing {
                    end_progress = 0.0;
                    break;
                }
                end_progress = 1.0;
                let closest_trap = self.max_robustness_to_terminal(state, valuation);
                end_reward += -closest_trap.max(-1.0);
            }

            if info.best_outgoing_robustness > 0.0
                && let Some(next) = info.best_outgoing
            {
                state = next;
            }
            t += 1;
        }

        EvaluationReport {
            steps_remaining: trace.len() - t,
            end_progress,
            end_reward,
        }
    }

    /// Most robust edge to a different state. Ties keep the first edge.
    fn max_robustness(&self, state: StateId, valuation: &Valuation) -> StateRobustness {
        let mut best = StateRobustness {
            best_outgoing: None,
            best_outgoing_robustness: f32::NEG_INFINITY,
        };
        for edge in self.automaton.edges(state) {
            if edge.target == state {
                continue;
            }
            let r = robustness(&edge.guard, valuation);
            if r > best.best_outgoing_robustness {
                best.best_outgoing = Some(edge.target);
                best.best_outgoing_robustness = r;
            }
        }
        best
    }

    /// Most robust edge that gets strictly closer to acceptance, or that
    /// stays in acceptance. Negative infinity when there is none.
    fn best_improving_robustness(&self, state: StateId, valuation: &Valuation) -> f32 {
        let current = self.distances[state];
        self.automaton
            .edges(state)
            .iter()
            .filter(|edge| {
                let next = self.distances[edge.target];
                next < current || (next == 0 && current == 0)
            })
            .map(|edge| robustness(&edge.guard, valuation))
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Most robust edge into a state with no way out. Negative infinity when
    /// there is none.
    fn max_robustness_to_terminal(&self, state: StateId, valuation: &Valuation) -> f32 {
        self.automaton
            .edges(state)
            .iter()
            .filter(|edge| !self.automaton.has_outgoing_transition(edge.target))
            .map(|edge| robustness(&edge.guard, valuation))
            .fold(f32::NEG_INFINITY, f32::max)
    }
}
