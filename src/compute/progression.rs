//! Automaton construction by formula progression.
//!
//! Each state is a canonical obligation: what is still required of the rest
//! of the run. Reading one step rewrites the obligation, so the reachable
//! obligations form a deterministic automaton. The edges leaving a state
//! are found by progressing every assignment of the atoms the obligation
//! mentions and grouping assignments by successor.

use std::collections::{BTreeMap, HashMap, VecDeque};

use log::debug;

use crate::schema::{AtomId, AtomTable, CompilerConfig, Formula};

use super::automaton::{Automaton, AutomatonCompiler, CompileError, StateId};

/// An [`AutomatonCompiler`] for the predicate language.
#[derive(Debug, Clone, Copy)]
pub struct ProgressionCompiler {
    max_states: usize,
    max_guard_atoms: usize,
}

impl ProgressionCompiler {
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            max_states: config.max_states,
            max_guard_atoms: config.max_guard_atoms,
        }
    }

    /// Build the automaton for an already-parsed formula.
    pub fn compile_formula(
        &self,
        formula: &Formula,
        atoms: &AtomTable,
    ) -> Result<Automaton, CompileError> {
        let initial = Obligation::from_formula(formula, false).simplify();

        let mut ids: HashMap<Obligation, StateId> = HashMap::new();
        let mut states: Vec<Obligation> = Vec::new();
        let mut transitions: Vec<Vec<(Formula, StateId)>> = Vec::new();
        let mut queue = VecDeque::new();

        ids.insert(initial.clone(), 0);
        states.push(initial);
        queue.push_back(0);

        while let Some(state) = queue.pop_front() {
            let obligation = states[state].clone();
            let guard_atoms = obligation.atoms();
            if guard_atoms.len() > self.max_guard_atoms {
                return Err(CompileError::TooManyGuardAtoms {
                    atoms: guard_atoms.len(),
                    limit: self.max_guard_atoms,
                });
            }

            // Assignment masks grouped by successor obligation
            let mut groups: BTreeMap<Obligation, Vec<u32>> = BTreeMap::new();
            for mask in 0..(1u32 << guard_atoms.len()) {
                let holds = |atom: AtomId| {
                    guard_atoms
                        .iter()
                        .position(|&a| a == atom)
                        .is_some_and(|bit| mask & (1 << bit) != 0)
                };
                groups
                    .entry(obligation.progress(&holds))
                    .or_default()
                    .push(mask);
            }

            let mut edges = Vec::with_capacity(groups.len());
            for (successor, masks) in groups {
                let target = match ids.get(&successor) {
                    Some(&id) => id,
                    None => {
                        let id = states.len();
                        if id >= self.max_states {
                            return Err(CompileError::TooManyStates {
                                limit: self.max_states,
                            });
                        }
                        ids.insert(successor.clone(), id);
                        states.push(successor);
                        queue.push_back(id);
                        id
                    }
                };
                edges.push((guard_for(&masks, &guard_atoms), target));
            }
            if transitions.len() <= state {
                transitions.resize_with(state + 1, Vec::new);
            }
            transitions[state] = edges;
        }

        let mut automaton = Automaton::new(states.len(), 0);
        for (state, edges) in transitions.into_iter().enumerate() {
            for (guard, target) in edges {
                automaton.add_edge(state, guard, target);
            }
        }
        for (state, obligation) in states.iter().enumerate() {
            automaton.set_accepting(state, obligation.accepts_empty());
            automaton.set_label(state, obligation.describe(atoms));
        }
        debug!(
            "Compiled automaton with {} states ({} accepting)",
            automaton.size(),
            states.iter().filter(|o| o.accepts_empty()).count()
        );
        Ok(automaton)
    }
}

impl AutomatonCompiler for ProgressionCompiler {
    fn compile(&self, predicate: &str, atoms: &AtomTable) -> Result<Automaton, CompileError> {
        let formula = Formula::parse(predicate, atoms)?;
        self.compile_formula(&formula, atoms)
    }
}

/// Negation normal form with n-ary connectives. `F` and `G` are expressed
/// through `U` and `R`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Obligation {
    Const(bool),
    Lit { atom: AtomId, positive: bool },
    And(Vec<Obligation>),
    Or(Vec<Obligation>),
    Next(Box<Obligation>),
    Until(Box<Obligation>, Box<Obligation>),
    Release(Box<Obligation>, Box<Obligation>),
}

impl Obligation {
    fn from_formula(formula: &Formula, negate: bool) -> Self {
        let pos = |f: &Formula| Self::from_formula(f, negate);
        match formula {
            Formula::Const(value) => Self::Const(*value != negate),
            Formula::Literal { atom, negated } => Self::Lit {
                atom: *atom,
                positive: *negated == negate,
            },
            Formula::Not(inner) => Self::from_formula(inner, !negate),
            Formula::And(a, b) if negate => Self::Or(vec![pos(a), pos(b)]),
            Formula::And(a, b) => Self::And(vec![pos(a), pos(b)]),
            Formula::Or(a, b) if negate => Self::And(vec![pos(a), pos(b)]),
            Formula::Or(a, b) => Self::Or(vec![pos(a), pos(b)]),
            Formula::Next(inner) => Self::Next(Box::new(pos(inner))),
            Formula::Finally(inner) if negate => {
                Self::Release(Box::new(Self::Const(false)), Box::new(pos(inner)))
            }
            Formula::Finally(inner) => {
                Self::Until(Box::new(Self::Const(true)), Box::new(pos(inner)))
            }
            Formula::Globally(inner) if negate => {
                Self::Until(Box::new(Self::Const(true)), Box::new(pos(inner)))
            }
            Formula::Globally(inner) => {
                Self::Release(Box::new(Self::Const(false)), Box::new(pos(inner)))
            }
            Formula::Until(a, b) if negate => Self::Release(Box::new(pos(a)), Box::new(pos(b))),
            Formula::Until(a, b) => Self::Until(Box::new(pos(a)), Box::new(pos(b))),
            Formula::Release(a, b) if negate => Self::Until(Box::new(pos(a)), Box::new(pos(b))),
            Formula::Release(a, b) => Self::Release(Box::new(pos(a)), Box::new(pos(b))),
        }
    }

    fn simplify(self) -> Self {
        match self {
            Self::Const(_) | Self::Lit { .. } => self,
            Self::Next(inner) => Self::Next(Box::new(inner.simplify())),
            Self::Until(left, right) => {
                let left = left.simplify();
                let right = right.simplify();
                match (&left, &right) {
                    (_, Self::Const(v)) => Self::Const(*v),
                    (Self::Const(false), _) => right,
                    _ if left == right => left,
                    _ => Self::Until(Box::new(left), Box::new(right)),
                }
            }
            Self::Release(left, right) => {
                let left = left.simplify();
                let right = right.simplify();
                match (&left, &right) {
                    (_, Self::Const(v)) => Self::Const(*v),
                    (Self::Const(true), _) => right,
                    _ if left == right => left,
                    _ => Self::Release(Box::new(left), Box::new(right)),
                }
            }
            Self::And(items) => Self::simplify_nary(items, true),
            Self::Or(items) => Self::simplify_nary(items, false),
        }
    }

    /// Flatten, drop units, detect absorbing constants and complementary
    /// literals, then sort and dedup.
    fn simplify_nary(items: Vec<Self>, conjunction: bool) -> Self {
        let absorbing = !conjunction;
        let mut flat = Vec::with_capacity(items.len());
        for item in items.into_iter().map(Self::simplify) {
            match item {
                Self::And(inner) if conjunction => flat.extend(inner),
                Self::Or(inner) if !conjunction => flat.extend(inner),
                Self::Const(v) if v == absorbing => return Self::Const(absorbing),
                Self::Const(_) => {}
                other => flat.push(other),
            }
        }
        flat.sort();
        flat.dedup();

        let complementary = flat.windows(2).any(|pair| {
            matches!(
                pair,
                [Self::Lit { atom: a, positive: false }, Self::Lit { atom: b, positive: true }]
                    if a == b
            )
        });
        if complementary {
            return Self::Const(absorbing);
        }
        match flat.len() {
            0 => Self::Const(!absorbing),
            1 => flat.remove(0),
            _ if conjunction => Self::And(flat),
            _ => Self::Or(flat),
        }
    }

    /// Obligation left after one step in which `holds` decides each atom.
    fn progress(&self, holds: &impl Fn(AtomId) -> bool) -> Self {
        let next = match self {
            Self::Const(_) => self.clone(),
            Self::Lit { atom, positive } => Self::Const(holds(*atom) == *positive),
            Self::And(items) => Self::And(items.iter().map(|i| i.progress(holds)).collect()),
            Self::Or(items) => Self::Or(items.iter().map(|i| i.progress(holds)).collect()),
            Self::Next(inner) => (**inner).clone(),
            Self::Until(left, right) => Self::Or(vec![
                right.progress(holds),
                Self::And(vec![left.progress(holds), self.clone()]),
            ]),
            Self::Release(left, right) => Self::And(vec![
                right.progress(holds),
                Self::Or(vec![left.progress(holds), self.clone()]),
            ]),
        };
        next.simplify()
    }

    /// Whether the run may end here with the obligation met.
    fn accepts_empty(&self) -> bool {
        match self {
            Self::Const(v) => *v,
            Self::Lit { .. } | Self::Next(_) | Self::Until(..) => false,
            Self::Release(..) => true,
            Self::And(items) => items.iter().all(Self::accepts_empty),
            Self::Or(items) => items.iter().any(Self::accepts_empty),
        }
    }

    fn atoms(&self) -> Vec<AtomId> {
        fn collect(o: &Obligation, out: &mut Vec<AtomId>) {
            match o {
                Obligation::Const(_) => {}
                Obligation::Lit { atom, .. } => out.push(*atom),
                Obligation::And(items) | Obligation::Or(items) => {
                    items.iter().for_each(|i| collect(i, out))
                }
                Obligation::Next(inner) => collect(inner, out),
                Obligation::Until(a, b) | Obligation::Release(a, b) => {
                    collect(a, out);
                    collect(b, out);
                }
            }
        }
        let mut out = Vec::new();
        collect(self, &mut out);
        out.sort_unstable();
        out.dedup();
        out
    }

    fn describe(&self, atoms: &AtomTable) -> String {
        let join = |items: &[Obligation], op: &str| {
            let parts: Vec<String> = items.iter().map(|i| i.describe(atoms)).collect();
            format!("({})", parts.join(op))
        };
        match self {
            Self::Const(v) => v.to_string(),
            Self::Lit { atom, positive } => {
                let name = atoms.name(*atom).unwrap_or("?");
                if *positive {
                    name.to_string()
                } else {
                    format!("!{}", name)
                }
            }
            Self::And(items) => join(items, " & "),
            Self::Or(items) => join(items, " | "),
            Self::Next(inner) => format!("X({})", inner.describe(atoms)),
            Self::Until(a, b) => format!("({} U {})", a.describe(atoms), b.describe(atoms)),
            Self::Release(a, b) => format!("({} R {})", a.describe(atoms), b.describe(atoms)),
        }
    }
}

/// A product term: bits in `care` are fixed to the matching bits of `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Cube {
    value: u32,
    care: u32,
}

impl Cube {
    fn covers(&self, mask: u32) -> bool {
        mask & self.care == self.value
    }
}

/// Guard formula satisfied exactly by the assignments in `masks`.
fn guard_for(masks: &[u32], guard_atoms: &[AtomId]) -> Formula {
    let full = (1u32 << guard_atoms.len()) - 1;
    if masks.len() == 1 << guard_atoms.len() {
        return Formula::Const(true);
    }

    let cubes = cover(masks, prime_cubes(masks, full));
    Formula::or_all(cubes.into_iter().map(|cube| {
        Formula::and_all(guard_atoms.iter().enumerate().filter_map(|(bit, &atom)| {
            let bit = 1 << bit;
            if cube.care & bit == 0 {
                None
            } else if cube.value & bit != 0 {
                Some(Formula::atom(atom))
            } else {
                Some(Formula::negated_atom(atom))
            }
        }))
    }))
}

/// Prime implicants by repeated merging of cubes that differ in one bit.
fn prime_cubes(masks: &[u32], full: u32) -> Vec<Cube> {
    let mut current: Vec<Cube> = masks
        .iter()
        .map(|&m| Cube {
            value: m,
            care: full,
        })
        .collect();
    let mut primes = Vec::new();

    while !current.is_empty() {
        let mut merged = vec![false; current.len()];
        let mut next = Vec::new();
        for i in 0..current.len() {
            for j in (i + 1)..current.len() {
                let (a, b) = (current[i], current[j]);
                let diff = a.value ^ b.value;
                if a.care == b.care && diff.count_ones() == 1 {
                    merged[i] = true;
                    merged[j] = true;
                    next.push(Cube {
                        value: a.value & !diff,
                        care: a.care & !diff,
                    });
                }
            }
        }
        for (cube, was_merged) in current.into_iter().zip(merged) {
            if !was_merged {
                primes.push(cube);
            }
        }
        next.sort_unstable();
        next.dedup();
        current = next;
    }
    primes.sort_unstable();
    primes.dedup();
    primes
}

/// Greedy cover of `masks` by prime cubes.
fn cover(masks: &[u32], primes: Vec<Cube>) -> Vec<Cube> {
    let mut uncovered: Vec<u32> = masks.to_vec();
    let mut chosen = Vec::new();
    while !uncovered.is_empty() {
        let Some(best) = primes
            .iter()
            .max_by_key(|cube| {
                (
                    uncovered.iter().filter(|&&m| cube.covers(m)).count(),
                    std::cmp::Reverse(cube.care.count_ones()),
                )
            })
            .copied()
        else {
            break;
        };
        uncovered.retain(|&m| !best.covers(m));
        chosen.push(best);
    }
    chosen
}
