//! 分离问题到整数线性系统的翻译.
//!
//! 变量布局 (n 为事件数):
//!
//! | 下标        | 含义                    |
//! |-------------|-------------------------|
//! | `e`         | 后向权重 `b_e`          |
//! | `n + e`     | 前向权重 `f_e`          |
//! | `2n`        | 初始标识 `m₀`           |
//! | `2n + 1`    | `m₀ = k·z` 的 `z` (可选) |
//!
//! 纯网模式下 `f_e − b_e` 只作为效应使用，解再规范化为 `w⁻ = max(0, −w)`,
//! `w⁺ = max(0, w)`。
use std::sync::Arc;

use crate::solver::LinearSystem;
use crate::synthesis::error::SynthesisError;
use crate::synthesis::problems::SeparationProblem;
use crate::synthesis::properties::PNProperties;
use crate::synthesis::region::Region;
use crate::synthesis::utility::{ParikhVector, RegionUtility};

fn to_i64(value: u64) -> Result<i64, SynthesisError> {
    i64::try_from(value).map_err(|_| SynthesisError::Overflow)
}

/// Which events may consume tokens from the region's place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Consumers<'a> {
    Any,
    None,
    At(&'a str),
}

pub struct RegionSystem<'a> {
    utility: &'a Arc<RegionUtility>,
    properties: &'a PNProperties,
    events: usize,
    base: LinearSystem,
}

impl<'a> RegionSystem<'a> {
    pub fn new(
        utility: &'a Arc<RegionUtility>,
        properties: &'a PNProperties,
    ) -> Result<Self, SynthesisError> {
        let events = utility.number_of_events();
        let vars = 2 * events + 1 + usize::from(properties.k_marking_divisor().is_some());
        let mut system = RegionSystem {
            utility,
            properties,
            events,
            base: LinearSystem::new(vars),
        };
        system.base = system.build_base(vars)?;
        Ok(system)
    }

    fn backward_var(&self, event: usize) -> usize {
        event
    }

    fn forward_var(&self, event: usize) -> usize {
        self.events + event
    }

    fn initial_var(&self) -> usize {
        2 * self.events
    }

    fn vars(&self) -> usize {
        self.base.vars()
    }

    /// Coefficients of `Σ p(e)·(f_e − b_e)`.
    fn effect_row(&self, parikh: &ParikhVector) -> Vec<i64> {
        let mut row = vec![0; self.vars()];
        for event in 0..self.events {
            let count = parikh.get(event);
            row[self.forward_var(event)] += count;
            row[self.backward_var(event)] -= count;
        }
        row
    }

    /// Coefficients of `m(s)`.
    fn marking_row(&self, parikh: &ParikhVector) -> Vec<i64> {
        let mut row = self.effect_row(parikh);
        row[self.initial_var()] = 1;
        row
    }

    fn build_base(&self, vars: usize) -> Result<LinearSystem, SynthesisError> {
        let utility = self.utility;
        let mut system = LinearSystem::new(vars);

        for equation in utility.cycle_equations() {
            system.equal(self.effect_row(&ParikhVector::from(equation.clone())), 0);
        }

        for &state in utility.states() {
            let row = self.marking_row(utility.require_parikh(state)?);
            if let Some(k) = self.properties.k_bounded_bound() {
                system.le(row.clone(), to_i64(k)?);
            }
            system.ge(row, 0);
        }

        if !self.properties.is_pure() {
            let mut seen = std::collections::HashSet::new();
            for &(source, event, _) in utility.arcs() {
                if !seen.insert((source, event)) {
                    continue;
                }
                let mut row = self.marking_row(utility.require_parikh(source)?);
                row[self.backward_var(event)] -= 1;
                system.ge(row, 0);
            }
        }

        if let Some(k) = self.properties.k_marking_divisor() {
            let mut row = vec![0; vars];
            row[self.initial_var()] = 1;
            row[vars - 1] = -to_i64(k)?;
            system.equal(row, 0);
        }

        if let Some(bound) = self.properties.weight_bound() {
            let bound = to_i64(bound)?;
            for event in 0..self.events {
                system.set_upper(self.backward_var(event), bound);
                system.set_upper(self.forward_var(event), bound);
            }
            // least initial marking is at most bound·(1 + max |P(s)|)
            let longest = to_i64(utility.max_parikh_length())?;
            let extra = to_i64(self.properties.k_marking_divisor().unwrap_or(1))?;
            let initial_bound = bound
                .checked_mul(longest + 1)
                .and_then(|v| v.checked_add(extra))
                .ok_or(SynthesisError::Overflow)?;
            system.set_upper(self.initial_var(), initial_bound);
            if self.properties.k_marking_divisor().is_some() {
                system.set_upper(vars - 1, initial_bound);
            }
        }

        Ok(system)
    }

    fn restricted(&self, consumers: Consumers<'_>) -> LinearSystem {
        let mut system = self.base.clone();
        match consumers {
            Consumers::Any => {}
            Consumers::None => {
                for event in 0..self.events {
                    system.set_upper(self.backward_var(event), 0);
                }
            }
            Consumers::At(location) => {
                for event in 0..self.events {
                    if self.utility.event_location(event) != Some(location) {
                        system.set_upper(self.backward_var(event), 0);
                    }
                }
            }
        }
        system
    }

    /// Alternative systems for `problem`; any solution of any of them
    /// yields a separating region.
    pub fn systems_for(
        &self,
        problem: &SeparationProblem,
    ) -> Result<Vec<LinearSystem>, SynthesisError> {
        let utility = self.utility;
        match *problem {
            SeparationProblem::State { first, second } => {
                let difference = utility
                    .require_parikh(first)?
                    .difference(utility.require_parikh(second)?);
                if difference.as_slice().iter().all(|c| *c == 0) {
                    return Ok(Vec::new());
                }
                let row = self.effect_row(&difference);
                let negated: Vec<i64> = row.iter().map(|c| -c).collect();

                let variants: Vec<Consumers<'_>> = if self.properties.is_distributed() {
                    let mut variants: Vec<_> =
                        utility.locations().into_iter().map(Consumers::At).collect();
                    variants.push(Consumers::None);
                    variants
                } else {
                    vec![Consumers::Any]
                };

                let mut systems = Vec::with_capacity(2 * variants.len());
                for consumers in variants {
                    for direction in [&row, &negated] {
                        let mut system = self.restricted(consumers);
                        system.ge(direction.clone(), 1);
                        systems.push(system);
                    }
                }
                Ok(systems)
            }
            SeparationProblem::Event { event, state } => {
                let consumers = if self.properties.is_distributed() {
                    match utility.event_location(event) {
                        Some(location) => Consumers::At(location),
                        None => {
                            return Err(SynthesisError::MissingLocation {
                                event: utility.event_label(event).unwrap_or_default().to_string(),
                            });
                        }
                    }
                } else {
                    Consumers::Any
                };
                let mut system = self.restricted(consumers);
                let mut row: Vec<i64> = self
                    .marking_row(utility.require_parikh(state)?)
                    .into_iter()
                    .map(|c| -c)
                    .collect();
                row[self.backward_var(event)] += 1;
                if self.properties.is_pure() {
                    row[self.forward_var(event)] -= 1;
                }
                system.ge(row, 1);
                Ok(vec![system])
            }
        }
    }

    pub fn region_from_solution(&self, solution: &[i64]) -> Result<Region, SynthesisError> {
        if solution.len() != self.vars() {
            return Err(SynthesisError::InvariantViolation(format!(
                "solution has {} values, expected {}",
                solution.len(),
                self.vars()
            )));
        }
        let value = |var: usize| {
            u64::try_from(solution[var]).map_err(|_| {
                SynthesisError::InvariantViolation(format!("negative value for variable {var}"))
            })
        };
        let initial = value(self.initial_var())?;
        let mut backward = Vec::with_capacity(self.events);
        let mut forward = Vec::with_capacity(self.events);
        for event in 0..self.events {
            let b = value(self.backward_var(event))?;
            let f = value(self.forward_var(event))?;
            if self.properties.is_pure() {
                backward.push(b.saturating_sub(f));
                forward.push(f.saturating_sub(b));
            } else {
                backward.push(b);
                forward.push(f);
            }
        }
        Region::new(self.utility, backward, forward, initial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{CancelToken, solve_integer};
    use crate::synthesis::region::RegionLike;
    use crate::ts::TransitionSystem;

    /// `s -a-> t -a-> u` with `b` looping at `u`
    fn utility() -> (TransitionSystem, Arc<RegionUtility>) {
        let mut ts = TransitionSystem::new();
        let s = ts.add_state("s").unwrap();
        let t = ts.add_state("t").unwrap();
        let u = ts.add_state("u").unwrap();
        ts.set_initial(s);
        ts.add_arc(s, t, "a");
        ts.add_arc(t, u, "a");
        ts.add_arc(u, u, "b");
        let utility = Arc::new(RegionUtility::new(&ts).unwrap());
        (ts, utility)
    }

    fn solve_first(system: &RegionSystem<'_>, problem: &SeparationProblem) -> Option<Region> {
        for candidate in system.systems_for(problem).unwrap() {
            if let Some(solution) = solve_integer(&candidate, &CancelToken::new()).unwrap() {
                return Some(system.region_from_solution(&solution).unwrap());
            }
        }
        None
    }

    #[test]
    fn state_separation_finds_region() {
        let (ts, utility) = utility();
        let properties = PNProperties::new();
        let system = RegionSystem::new(&utility, &properties).unwrap();
        let problem = SeparationProblem::State {
            first: ts.state_by_name("s").unwrap(),
            second: ts.state_by_name("u").unwrap(),
        };
        let region = solve_first(&system, &problem).expect("separable");
        assert!(region.solves(&problem));
    }

    #[test]
    fn event_separation_under_pure_and_plain() {
        let (ts, utility) = utility();
        let properties = PNProperties::new().pure().plain();
        let system = RegionSystem::new(&utility, &properties).unwrap();
        // a is disabled at u
        let problem = SeparationProblem::Event {
            event: 0,
            state: ts.state_by_name("u").unwrap(),
        };
        let region = solve_first(&system, &problem).expect("separable");
        assert!(region.solves(&problem));
        assert!(region.satisfies(&properties));
    }

    #[test]
    fn pure_regions_cannot_disable_self_loops() {
        let (ts, utility) = utility();
        // b loops at u and is disabled at s
        let problem = SeparationProblem::Event {
            event: 1,
            state: ts.state_by_name("s").unwrap(),
        };

        let pure = PNProperties::new().pure();
        let system = RegionSystem::new(&utility, &pure).unwrap();
        assert!(solve_first(&system, &problem).is_none());

        let plain = PNProperties::new().plain();
        let system = RegionSystem::new(&utility, &plain).unwrap();
        let region = solve_first(&system, &problem).expect("separable");
        assert!(region.solves(&problem));
        assert!(region.satisfies(&plain));
    }

    #[test]
    fn safe_regions_cannot_stop_a_repeated_event() {
        let (ts, utility) = utility();
        let properties = PNProperties::new().safe();
        let system = RegionSystem::new(&utility, &properties).unwrap();
        // a fires twice in a row, so a safe place cannot disable it at u
        let problem = SeparationProblem::Event {
            event: 0,
            state: ts.state_by_name("u").unwrap(),
        };
        assert!(solve_first(&system, &problem).is_none());
    }

    #[test]
    fn k_marking_adds_a_divisor_variable() {
        let (ts, utility) = utility();
        let properties = PNProperties::new().k_marking(3);
        let system = RegionSystem::new(&utility, &properties).unwrap();
        assert_eq!(system.vars(), 2 * 2 + 2);
        let problem = SeparationProblem::Event {
            event: 0,
            state: ts.state_by_name("u").unwrap(),
        };
        let region = solve_first(&system, &problem).expect("separable");
        assert_eq!(region.initial_marking() % 3, 0);
        assert!(region.solves(&problem));
    }

    #[test]
    fn equal_parikh_vectors_give_no_systems() {
        let mut ts = TransitionSystem::new();
        let s = ts.add_state("s").unwrap();
        let t = ts.add_state("t").unwrap();
        let u = ts.add_state("u").unwrap();
        ts.set_initial(s);
        ts.add_arc(s, t, "a");
        ts.add_arc(s, u, "a");
        let utility = Arc::new(RegionUtility::new(&ts).unwrap());
        let properties = PNProperties::new();
        let system = RegionSystem::new(&utility, &properties).unwrap();
        let problem = SeparationProblem::State { first: t, second: u };
        assert!(system.systems_for(&problem).unwrap().is_empty());
    }
}
