//! 区域工具：事件索引、Parikh 向量、回路方程与纯区域基.
//!
//! 每个迁移系统构造一次，构造后只读，可在线程间共享 (`Arc<RegionUtility>`)。
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use indexmap::IndexSet;
use log::{debug, warn};
use num::bigint::BigInt;
use num::integer::Integer;
use num::rational::BigRational;
use num::traits::{One, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::synthesis::error::SynthesisError;
use crate::ts::{StateId, TransitionSystem};

/// Signed event counts along the spanning-tree path to a state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParikhVector(Vec<i64>);

impl ParikhVector {
    pub fn zero(events: usize) -> Self {
        Self(vec![0; events])
    }

    pub fn get(&self, event: usize) -> i64 {
        self.0.get(event).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    /// `‖p‖₁`
    pub fn norm(&self) -> u64 {
        self.0.iter().map(|c| c.unsigned_abs()).sum()
    }

    /// Copy of `self` with one more occurrence of `event`.
    pub fn with_event(&self, event: usize) -> Self {
        let mut next = self.clone();
        next.0[event] += 1;
        next
    }

    pub fn difference(&self, other: &Self) -> Self {
        Self(self.0.iter().zip(&other.0).map(|(a, b)| a - b).collect())
    }
}

impl From<Vec<i64>> for ParikhVector {
    fn from(counts: Vec<i64>) -> Self {
        Self(counts)
    }
}

impl fmt::Display for ParikhVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, count) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{count}")?;
        }
        write!(f, ")")
    }
}

#[derive(Debug)]
pub struct RegionUtility {
    events: IndexSet<String>,
    locations: Vec<Option<String>>,
    states: Vec<StateId>,
    initial: StateId,
    parikh: HashMap<StateId, ParikhVector>,
    arcs: Vec<(StateId, usize, StateId)>,
    enabled: HashSet<(StateId, usize)>,
    cycle_equations: Vec<Vec<i64>>,
    region_basis: Vec<Vec<i64>>,
    unreachable: Vec<StateId>,
}

impl RegionUtility {
    pub fn new(ts: &TransitionSystem) -> Result<Self, SynthesisError> {
        let initial = ts.initial().ok_or(SynthesisError::MissingInitialState)?;
        let events = ts.alphabet();
        let locations = events
            .iter()
            .map(|event| ts.location(event).map(str::to_string))
            .collect();

        // BFS spanning tree, successors in arc insertion order
        let mut parikh = HashMap::new();
        let mut tree_arcs = HashSet::new();
        let mut queue = VecDeque::from([initial]);
        parikh.insert(initial, ParikhVector::zero(events.len()));
        while let Some(state) = queue.pop_front() {
            let current = parikh[&state].clone();
            for (label, target) in ts.outgoing(state) {
                if parikh.contains_key(&target) {
                    continue;
                }
                let event = events.get_index_of(label).ok_or_else(|| {
                    SynthesisError::InvariantViolation(format!("label {label} missing from index"))
                })?;
                parikh.insert(target, current.with_event(event));
                tree_arcs.insert((state, event, target));
                queue.push_back(target);
            }
        }

        let states: Vec<StateId> = ts.states().filter(|s| parikh.contains_key(s)).collect();
        let unreachable: Vec<StateId> = ts.states().filter(|s| !parikh.contains_key(s)).collect();
        for state in &unreachable {
            warn!(
                "state {} is unreachable from the initial state and is ignored",
                ts.state_name(*state)
            );
        }

        let mut arcs = Vec::new();
        let mut enabled = HashSet::new();
        let mut cycle_equations: Vec<Vec<i64>> = Vec::new();
        let mut seen_tree_arcs = HashSet::new();
        for (source, label, target) in ts.arcs() {
            if !parikh.contains_key(&source) {
                continue;
            }
            let event = events.get_index_of(label).ok_or_else(|| {
                SynthesisError::InvariantViolation(format!("label {label} missing from index"))
            })?;
            arcs.push((source, event, target));
            enabled.insert((source, event));

            // parallel arcs with equal labels share one tree arc
            if tree_arcs.contains(&(source, event, target))
                && seen_tree_arcs.insert((source, event, target))
            {
                continue;
            }
            let row: Vec<i64> = parikh[&source]
                .with_event(event)
                .difference(&parikh[&target])
                .as_slice()
                .to_vec();
            if row.iter().any(|c| *c != 0) && !cycle_equations.contains(&row) {
                cycle_equations.push(row);
            }
        }

        let region_basis = kernel_basis(&cycle_equations, events.len())?;
        debug!(
            "region utility: {} events, {} reachable states, {} cycle equations, basis of size {}",
            events.len(),
            states.len(),
            cycle_equations.len(),
            region_basis.len()
        );

        Ok(Self {
            events,
            locations,
            states,
            initial,
            parikh,
            arcs,
            enabled,
            cycle_equations,
            region_basis,
            unreachable,
        })
    }

    pub fn event_list(&self) -> Vec<String> {
        self.events.iter().cloned().collect()
    }

    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(String::as_str)
    }

    pub fn number_of_events(&self) -> usize {
        self.events.len()
    }

    pub fn event_index(&self, label: &str) -> Option<usize> {
        self.events.get_index_of(label)
    }

    pub fn event_label(&self, index: usize) -> Option<&str> {
        self.events.get_index(index).map(String::as_str)
    }

    /// Reachable states in transition system order.
    pub fn states(&self) -> &[StateId] {
        &self.states
    }

    pub fn initial_state(&self) -> StateId {
        self.initial
    }

    pub fn parikh_vector(&self, state: StateId) -> Option<&ParikhVector> {
        self.parikh.get(&state)
    }

    /// Reachable arcs as `(source, event, target)`.
    pub fn arcs(&self) -> &[(StateId, usize, StateId)] {
        &self.arcs
    }

    pub fn is_enabled(&self, state: StateId, event: usize) -> bool {
        self.enabled.contains(&(state, event))
    }

    /// Rows `P(s) + e - P(t)` of all arcs outside the spanning tree.
    pub fn cycle_equations(&self) -> &[Vec<i64>] {
        &self.cycle_equations
    }

    /// Integer basis of the effect vectors allowed by the cycle equations.
    pub fn region_basis(&self) -> &[Vec<i64>] {
        &self.region_basis
    }

    pub fn event_location(&self, event: usize) -> Option<&str> {
        self.locations.get(event).and_then(|l| l.as_deref())
    }

    /// Distinct locations in event order.
    pub fn locations(&self) -> Vec<&str> {
        let mut seen: IndexSet<&str> = IndexSet::new();
        for location in self.locations.iter().flatten() {
            seen.insert(location);
        }
        seen.into_iter().collect()
    }

    pub fn max_parikh_length(&self) -> u64 {
        self.parikh.values().map(ParikhVector::norm).max().unwrap_or(0)
    }

    pub fn unreachable_states(&self) -> &[StateId] {
        &self.unreachable
    }

    pub(crate) fn require_parikh(&self, state: StateId) -> Result<&ParikhVector, SynthesisError> {
        self.parikh
            .get(&state)
            .ok_or_else(|| SynthesisError::UnreachableState(format!("{state:?}")))
    }
}

/// Integer kernel basis of `rows` via exact RREF, each vector divided by its gcd.
fn kernel_basis(rows: &[Vec<i64>], cols: usize) -> Result<Vec<Vec<i64>>, SynthesisError> {
    let mut matrix: Vec<Vec<BigRational>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|v| BigRational::from_integer(BigInt::from(*v)))
                .collect()
        })
        .collect();

    let mut pivots: Vec<usize> = Vec::new();
    let mut rank = 0usize;
    for col in 0..cols {
        let Some(found) = (rank..matrix.len()).find(|&r| !matrix[r][col].is_zero()) else {
            continue;
        };
        matrix.swap(found, rank);
        let pivot = matrix[rank][col].clone();
        for value in matrix[rank].iter_mut() {
            *value /= pivot.clone();
        }
        let pivot_row = matrix[rank].clone();
        for (idx, row) in matrix.iter_mut().enumerate() {
            if idx == rank || row[col].is_zero() {
                continue;
            }
            let factor = row[col].clone();
            for (value, p) in row.iter_mut().zip(&pivot_row).skip(col) {
                *value -= p * &factor;
            }
        }
        pivots.push(col);
        rank += 1;
        if rank == matrix.len() {
            break;
        }
    }

    let mut basis = Vec::new();
    for free in (0..cols).filter(|c| !pivots.contains(c)) {
        let mut vector = vec![BigRational::zero(); cols];
        vector[free] = BigRational::one();
        for (row, &pivot_col) in pivots.iter().enumerate() {
            vector[pivot_col] = -matrix[row][free].clone();
        }
        basis.push(integer_vector(&vector)?);
    }
    Ok(basis)
}

fn integer_vector(vector: &[BigRational]) -> Result<Vec<i64>, SynthesisError> {
    let lcm = vector
        .iter()
        .fold(BigInt::one(), |acc, v| acc.lcm(v.denom()));
    let scaled: Vec<BigInt> = vector
        .iter()
        .map(|v| v.numer() * (&lcm / v.denom()))
        .collect();
    let gcd = scaled
        .iter()
        .fold(BigInt::zero(), |acc, v| acc.gcd(v));
    scaled
        .into_iter()
        .map(|v| {
            let v = if gcd.is_zero() { v } else { v / &gcd };
            v.to_i64().ok_or(SynthesisError::Overflow)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `s0 -a-> s1 -b-> s2 -a-> s0` plus an unreachable `x`.
    fn cycle() -> TransitionSystem {
        let mut ts = TransitionSystem::new();
        let s0 = ts.add_state("s0").unwrap();
        let s1 = ts.add_state("s1").unwrap();
        let s2 = ts.add_state("s2").unwrap();
        let x = ts.add_state("x").unwrap();
        ts.set_initial(s0);
        ts.add_arc(s0, s1, "a");
        ts.add_arc(s1, s2, "b");
        ts.add_arc(s2, s0, "a");
        ts.add_arc(x, s0, "c");
        ts
    }

    #[test]
    fn requires_initial_state() {
        let mut ts = TransitionSystem::new();
        ts.add_state("s").unwrap();
        assert_eq!(
            RegionUtility::new(&ts).unwrap_err(),
            SynthesisError::MissingInitialState
        );
    }

    #[test]
    fn parikh_vectors_follow_spanning_tree() {
        let ts = cycle();
        let utility = RegionUtility::new(&ts).unwrap();
        assert_eq!(utility.event_list(), vec!["a", "b", "c"]);
        assert_eq!(utility.event_index("b"), Some(1));
        assert_eq!(utility.event_label(2), Some("c"));

        assert_eq!(Some(utility.initial_state()), ts.state_by_name("s0"));
        let s2 = ts.state_by_name("s2").unwrap();
        assert_eq!(
            utility.parikh_vector(s2),
            Some(&ParikhVector::from(vec![1, 1, 0]))
        );
        assert_eq!(utility.max_parikh_length(), 2);

        let x = ts.state_by_name("x").unwrap();
        assert_eq!(utility.parikh_vector(x), None);
        assert_eq!(utility.unreachable_states(), &[x]);
        assert_eq!(utility.states().len(), 3);
        assert_eq!(utility.arcs().len(), 3);
        assert!(utility.is_enabled(s2, 0));
        assert!(!utility.is_enabled(s2, 1));
    }

    #[test]
    fn cycle_equations_and_basis() {
        let utility = RegionUtility::new(&cycle()).unwrap();
        // back edge s2 -a-> s0: (1,1,0) + (1,0,0) - 0
        assert_eq!(utility.cycle_equations(), &[vec![2, 1, 0]]);

        let basis = utility.region_basis();
        assert_eq!(basis.len(), 2);
        for vector in basis {
            let dot: i64 = vector.iter().zip([2, 1, 0]).map(|(v, r)| v * r).sum();
            assert_eq!(dot, 0);
        }
        assert!(basis.contains(&vec![-1, 2, 0]) || basis.contains(&vec![1, -2, 0]));
        assert!(basis.contains(&vec![0, 0, 1]));
    }

    #[test]
    fn acyclic_systems_have_full_basis() {
        let mut ts = TransitionSystem::new();
        let s = ts.add_state("s").unwrap();
        let t = ts.add_state("t").unwrap();
        ts.set_initial(s);
        ts.add_arc(s, t, "a");
        ts.add_arc(s, t, "b");
        let utility = RegionUtility::new(&ts).unwrap();
        // s -b-> t is not a tree arc: a - b = 0
        assert_eq!(utility.cycle_equations(), &[vec![-1, 1]]);
        assert_eq!(utility.region_basis(), &[vec![1, 1]]);
    }

    #[test]
    fn locations_are_collected() {
        let mut ts = cycle();
        ts.set_location("a", "left");
        ts.set_location("b", "right");
        let utility = RegionUtility::new(&ts).unwrap();
        assert_eq!(utility.event_location(0), Some("left"));
        assert_eq!(utility.event_location(2), None);
        assert_eq!(utility.locations(), vec!["left", "right"]);
    }
}
