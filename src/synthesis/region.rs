//! # 区域 (Region)
//!
//! 区域由后向权重 `w⁻`、前向权重 `w⁺` 与初始标识 `m₀` 组成。
//! 可达状态 `s` 上的标识为 `m(s) = m₀ + Σ P(s)[e]·(w⁺(e) − w⁻(e))`。
//! 区域公理：对每条可达弧 `s –e→ t` 有 `m(s) ≥ w⁻(e)` 且 `m(t) = m(s) + w(e)`。
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use thiserror::Error;

use crate::synthesis::error::SynthesisError;
use crate::synthesis::problems::SeparationProblem;
use crate::synthesis::properties::PNProperties;
use crate::synthesis::utility::{ParikhVector, RegionUtility};
use crate::ts::StateId;

/// The evaluation contract shared by [`Region`] and test doubles.
pub trait RegionLike {
    fn utility(&self) -> &RegionUtility;

    fn initial_marking(&self) -> u64;

    fn backward_weight(&self, event: usize) -> u64;

    fn forward_weight(&self, event: usize) -> u64;

    fn weight(&self, event: usize) -> i64 {
        self.forward_weight(event) as i64 - self.backward_weight(event) as i64
    }

    fn backward_weight_of(&self, label: &str) -> Option<u64> {
        self.utility()
            .event_index(label)
            .map(|event| self.backward_weight(event))
    }

    fn forward_weight_of(&self, label: &str) -> Option<u64> {
        self.utility()
            .event_index(label)
            .map(|event| self.forward_weight(event))
    }

    fn marking_for(&self, parikh: &ParikhVector) -> i64 {
        let effect: i64 = (0..parikh.len())
            .map(|event| parikh.get(event) * self.weight(event))
            .sum();
        self.initial_marking() as i64 + effect
    }

    fn marking_at(&self, state: StateId) -> Result<i64, SynthesisError> {
        let parikh = self.utility().require_parikh(state)?;
        Ok(self.marking_for(parikh))
    }

    fn satisfies(&self, properties: &PNProperties) -> bool {
        let utility = self.utility();
        let events = 0..utility.number_of_events();
        if properties.is_pure()
            && events
                .clone()
                .any(|e| self.backward_weight(e) > 0 && self.forward_weight(e) > 0)
        {
            return false;
        }
        if properties.is_plain()
            && events
                .clone()
                .any(|e| self.backward_weight(e) > 1 || self.forward_weight(e) > 1)
        {
            return false;
        }
        if let Some(k) = properties.k_marking_divisor() {
            if k == 0 || self.initial_marking() % k != 0 {
                return false;
            }
        }
        if let Some(k) = properties.k_bounded_bound() {
            let bounded = utility.states().iter().all(|&s| {
                utility
                    .parikh_vector(s)
                    .is_some_and(|p| i64::try_from(k).map_or(true, |k| self.marking_for(p) <= k))
            });
            if !bounded {
                return false;
            }
        }
        if properties.is_distributed() {
            let mut consumers = events
                .filter(|&e| self.backward_weight(e) > 0)
                .map(|e| utility.event_location(e));
            if let Some(first) = consumers.next() {
                if first.is_none() || consumers.any(|l| l != first) {
                    return false;
                }
            }
        }
        true
    }
}

impl<R: RegionLike + ?Sized> RegionLike for &R {
    fn utility(&self) -> &RegionUtility {
        (**self).utility()
    }

    fn initial_marking(&self) -> u64 {
        (**self).initial_marking()
    }

    fn backward_weight(&self, event: usize) -> u64 {
        (**self).backward_weight(event)
    }

    fn forward_weight(&self, event: usize) -> u64 {
        (**self).forward_weight(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotCombinable {
    #[error("no regions to combine")]
    Empty,
    #[error("regions belong to different transition systems")]
    ForeignUtility,
    #[error("combination violates the required properties")]
    PropertyViolation,
}

#[derive(Debug, Clone)]
pub struct Region {
    utility: Arc<RegionUtility>,
    backward: Vec<u64>,
    forward: Vec<u64>,
    initial: u64,
}

impl Region {
    /// Builds a region and checks the region axiom on every reachable arc.
    pub fn new(
        utility: &Arc<RegionUtility>,
        backward: Vec<u64>,
        forward: Vec<u64>,
        initial: u64,
    ) -> Result<Self, SynthesisError> {
        let events = utility.number_of_events();
        if backward.len() != events || forward.len() != events {
            return Err(SynthesisError::InvariantViolation(format!(
                "region has {}/{} weights for {} events",
                backward.len(),
                forward.len(),
                events
            )));
        }
        let region = Self {
            utility: Arc::clone(utility),
            backward,
            forward,
            initial,
        };
        region.check_axiom()?;
        Ok(region)
    }

    /// Pure region with effect `effect` and the least initial marking.
    pub fn from_effect(
        utility: &Arc<RegionUtility>,
        effect: &[i64],
    ) -> Result<Self, SynthesisError> {
        let backward: Vec<u64> = effect.iter().map(|w| (-w).max(0) as u64).collect();
        let forward: Vec<u64> = effect.iter().map(|w| (*w).max(0) as u64).collect();
        let delta = |parikh: &ParikhVector| -> i64 {
            effect
                .iter()
                .enumerate()
                .map(|(e, w)| parikh.get(e) * w)
                .sum()
        };

        let mut initial = 0i64;
        for &state in utility.states() {
            let parikh = utility.require_parikh(state)?;
            initial = initial.max(-delta(parikh));
        }
        for &(source, event, _) in utility.arcs() {
            let parikh = utility.require_parikh(source)?;
            initial = initial.max(backward.get(event).copied().unwrap_or(0) as i64 - delta(parikh));
        }
        Self::new(utility, backward, forward, initial as u64)
    }

    fn check_axiom(&self) -> Result<(), SynthesisError> {
        for &state in self.utility.states() {
            if self.marking_at(state)? < 0 {
                return Err(SynthesisError::InvariantViolation(format!(
                    "negative marking at {state:?}"
                )));
            }
        }
        for &(source, event, target) in self.utility.arcs() {
            let before = self.marking_at(source)?;
            let after = self.marking_at(target)?;
            if before < self.backward[event] as i64 || after != before + self.weight(event) {
                return Err(SynthesisError::InvariantViolation(format!(
                    "region {self} is inconsistent on arc {source:?} -{event}-> {target:?}"
                )));
            }
        }
        Ok(())
    }

    pub fn backward(&self) -> &[u64] {
        &self.backward
    }

    pub fn forward(&self) -> &[u64] {
        &self.forward
    }

    pub fn add(&self, other: &Region) -> Region {
        debug_assert!(Arc::ptr_eq(&self.utility, &other.utility));
        Region {
            utility: Arc::clone(&self.utility),
            backward: self.backward.iter().zip(&other.backward).map(|(a, b)| a + b).collect(),
            forward: self.forward.iter().zip(&other.forward).map(|(a, b)| a + b).collect(),
            initial: self.initial + other.initial,
        }
    }

    pub fn scale(&self, factor: u64) -> Region {
        Region {
            utility: Arc::clone(&self.utility),
            backward: self.backward.iter().map(|w| w * factor).collect(),
            forward: self.forward.iter().map(|w| w * factor).collect(),
            initial: self.initial * factor,
        }
    }

    /// Non-negative integer combination `Σ cᵢ·rᵢ` that has to satisfy
    /// `properties`.
    pub fn combine(
        terms: &[(u64, &Region)],
        properties: &PNProperties,
    ) -> Result<Region, NotCombinable> {
        let ((first_factor, first), rest) = terms.split_first().ok_or(NotCombinable::Empty)?;
        let mut result = first.scale(*first_factor);
        for (factor, region) in rest {
            if !Arc::ptr_eq(&first.utility, &region.utility) {
                return Err(NotCombinable::ForeignUtility);
            }
            result = result.add(&region.scale(*factor));
        }
        if result.satisfies(properties) {
            Ok(result)
        } else {
            Err(NotCombinable::PropertyViolation)
        }
    }

    pub fn solves(&self, problem: &SeparationProblem) -> bool {
        match *problem {
            SeparationProblem::State { first, second } => {
                match (self.marking_at(first), self.marking_at(second)) {
                    (Ok(a), Ok(b)) => a != b,
                    _ => false,
                }
            }
            SeparationProblem::Event { event, state } => self
                .marking_at(state)
                .is_ok_and(|m| m < self.backward_weight(event) as i64),
        }
    }
}

impl RegionLike for Region {
    fn utility(&self) -> &RegionUtility {
        &self.utility
    }

    fn initial_marking(&self) -> u64 {
        self.initial
    }

    fn backward_weight(&self, event: usize) -> u64 {
        self.backward.get(event).copied().unwrap_or(0)
    }

    fn forward_weight(&self, event: usize) -> u64 {
        self.forward.get(event).copied().unwrap_or(0)
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.backward == other.backward
            && self.forward == other.forward
            && self.initial == other.initial
    }
}

impl Eq for Region {}

impl Hash for Region {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.backward.hash(state);
        self.forward.hash(state);
        self.initial.hash(state);
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{init={}", self.initial)?;
        for (event, label) in self.utility.events().enumerate() {
            let (b, w) = (self.backward[event], self.forward[event]);
            if b != 0 || w != 0 {
                write!(f, ", {b}:{label}:{w}")?;
            }
        }
        write!(f, "}}")
    }
}
