use itertools::Itertools;

use crate::synthesis::utility::RegionUtility;
use crate::ts::StateId;

/// A single separation requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeparationProblem {
    /// Two distinct reachable states need different markings.
    State { first: StateId, second: StateId },
    /// `event` is not enabled at `state` and must stay disabled.
    Event { event: usize, state: StateId },
}

impl SeparationProblem {
    pub fn is_state_separation(&self) -> bool {
        matches!(self, SeparationProblem::State { .. })
    }
}

/// All problems in a fixed order: state pairs `(i, j)` with `i < j` in
/// state order, then for each state the disabled events in index order.
pub fn enumerate_problems(utility: &RegionUtility) -> Vec<SeparationProblem> {
    let states = utility.states();
    let mut problems: Vec<_> = states
        .iter()
        .tuple_combinations()
        .map(|(&first, &second)| SeparationProblem::State { first, second })
        .collect();
    for &state in states {
        for event in 0..utility.number_of_events() {
            if !utility.is_enabled(state, event) {
                problems.push(SeparationProblem::Event { event, state });
            }
        }
    }
    problems
}
