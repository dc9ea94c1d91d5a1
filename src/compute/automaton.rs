//! Deterministic automata with formula-guarded edges.

use crate::schema::{AtomTable, Formula, FormulaError};

/// Index of an automaton state.
pub type StateId = usize;

/// A transition guarded by a propositional formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub guard: Formula,
    pub target: StateId,
}

/// Finite automaton over valuations.
///
/// States are `0..size()`. A state is an acceptance state when the run would
/// be accepted if it ended there.
#[derive(Debug, Clone, PartialEq)]
pub struct Automaton {
    initial: StateId,
    edges: Vec<Vec<Edge>>,
    accepting: Vec<bool>,
    labels: Vec<String>,
}

impl Automaton {
    /// Automaton with `size` states, no edges and no acceptance states.
    pub fn new(size: usize, initial: StateId) -> Self {
        Self {
            initial,
            edges: vec![Vec::new(); size],
            accepting: vec![false; size],
            labels: (0..size).map(|s| format!("q{}", s)).collect(),
        }
    }

    pub fn add_edge(&mut self, from: StateId, guard: Formula, target: StateId) {
        self.edges[from].push(Edge { guard, target });
    }

    pub fn set_accepting(&mut self, state: StateId, accepting: bool) {
        self.accepting[state] = accepting;
    }

    pub fn set_label(&mut self, state: StateId, label: String) {
        self.labels[state] = label;
    }

    pub fn size(&self) -> usize {
        self.edges.len()
    }

    pub fn initial_state(&self) -> StateId {
        self.initial
    }

    pub fn edges(&self, state: StateId) -> &[Edge] {
        &self.edges[state]
    }

    pub fn is_accepting(&self, state: StateId) -> bool {
        self.accepting[state]
    }

    pub fn label(&self, state: StateId) -> &str {
        &self.labels[state]
    }

    pub fn has_acceptance_states(&self) -> bool {
        self.accepting.iter().any(|&a| a)
    }

    /// Whether `state` has an edge to some other state.
    pub fn has_outgoing_transition(&self, state: StateId) -> bool {
        self.edges[state].iter().any(|e| e.target != state)
    }
}

/// Turns a predicate string into an automaton.
pub trait AutomatonCompiler: Send + Sync {
    fn compile(&self, predicate: &str, atoms: &AtomTable) -> Result<Automaton, CompileError>;
}

/// Predicate compilation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("Invalid predicate: {0}")]
    Formula(#[from] FormulaError),
    #[error("Automaton exceeds {limit} states")]
    TooManyStates { limit: usize },
    #[error("State branches on {atoms} atoms, limit is {limit}")]
    TooManyGuardAtoms { atoms: usize, limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outgoing_transitions() {
        let mut automaton = Automaton::new(2, 0);
        automaton.add_edge(0, Formula::atom(0), 1);
        automaton.add_edge(0, Formula::negated_atom(0), 0);
        automaton.add_edge(1, Formula::Const(true), 1);
        automaton.set_accepting(1, true);

        assert!(automaton.has_outgoing_transition(0));
        assert!(!automaton.has_outgoing_transition(1));
        assert!(automaton.has_acceptance_states());
        assert_eq!(automaton.edges(0).len(), 2);
        assert_eq!(automaton.label(1), "q1");
    }
}
