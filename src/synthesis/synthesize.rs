use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexSet;
use log::info;

use crate::net::Net;
use crate::solver::{CancelToken, ExactSolver, IntegerSolver};
use crate::synthesis::construct::construct_net;
use crate::synthesis::error::SynthesisError;
use crate::synthesis::problems::enumerate_problems;
use crate::synthesis::properties::PNProperties;
use crate::synthesis::region::Region;
use crate::synthesis::separation::SeparationEngine;
use crate::synthesis::utility::RegionUtility;
use crate::ts::{StateId, TransitionSystem, Word, WordSystem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Sequential,
    /// `threads == 0` lets rayon pick the thread count.
    Parallel { threads: usize },
}

#[derive(Debug, Clone, Default)]
pub struct SynthesisOptions {
    pub mode: ExecutionMode,
    pub cancel: CancelToken,
}

/// Result of synthesizing a Petri net from a transition system.
#[derive(Debug)]
pub struct SynthesizePN {
    utility: Arc<RegionUtility>,
    properties: PNProperties,
    regions: IndexSet<Region>,
    failed_state_separation: Vec<BTreeSet<StateId>>,
    failed_event_separation: Vec<(String, StateId)>,
}

impl SynthesizePN {
    pub fn new(ts: &TransitionSystem, properties: PNProperties) -> Result<Self, SynthesisError> {
        Self::with_options(ts, properties, SynthesisOptions::default())
    }

    pub fn with_options(
        ts: &TransitionSystem,
        properties: PNProperties,
        options: SynthesisOptions,
    ) -> Result<Self, SynthesisError> {
        let utility = Arc::new(RegionUtility::new(ts)?);
        Self::from_utility(utility, properties, options)
    }

    pub fn from_word(word: &Word, properties: PNProperties) -> Result<Self, SynthesisError> {
        Self::new(WordSystem::new(word).ts(), properties)
    }

    pub fn from_utility(
        utility: Arc<RegionUtility>,
        properties: PNProperties,
        options: SynthesisOptions,
    ) -> Result<Self, SynthesisError> {
        Self::run(utility, properties, options, &ExactSolver)
    }

    pub(crate) fn run(
        utility: Arc<RegionUtility>,
        properties: PNProperties,
        options: SynthesisOptions,
        solver: &dyn IntegerSolver,
    ) -> Result<Self, SynthesisError> {
        properties.validate(&utility)?;
        info!(
            "synthesizing with properties [{}] using the {} solver",
            properties,
            solver.name()
        );

        let problems = enumerate_problems(&utility);
        let engine = SeparationEngine::new(&utility, &properties, solver, &options.cancel)?;
        let result = match options.mode {
            ExecutionMode::Sequential => engine.run_sequential(&problems)?,
            ExecutionMode::Parallel { threads } => engine.run_parallel(&problems, threads)?,
        };

        let failed_event_separation = result
            .failed_event_separation
            .into_iter()
            .map(|(event, state)| {
                let label = utility.event_label(event).ok_or_else(|| {
                    SynthesisError::InvariantViolation(format!("unknown event index {event}"))
                })?;
                Ok((label.to_string(), state))
            })
            .collect::<Result<Vec<_>, SynthesisError>>()?;

        Ok(Self {
            utility,
            properties,
            regions: result.regions,
            failed_state_separation: result.failed_state_separation,
            failed_event_separation,
        })
    }

    pub fn was_successfully_separated(&self) -> bool {
        self.failed_state_separation.is_empty() && self.failed_event_separation.is_empty()
    }

    /// Accepted regions in the order they were found.
    pub fn separating_regions(&self) -> &IndexSet<Region> {
        &self.regions
    }

    pub fn failed_state_separation_problems(&self) -> &[BTreeSet<StateId>] {
        &self.failed_state_separation
    }

    pub fn failed_event_state_separation_problems(&self) -> &[(String, StateId)] {
        &self.failed_event_separation
    }

    /// The net of the accepted regions. Only isomorphic to the input when
    /// [`Self::was_successfully_separated`] holds.
    pub fn petri_net(&self) -> Net {
        let regions: Vec<&Region> = self.regions.iter().collect();
        construct_net(&self.utility.event_list(), &regions)
    }

    pub fn utility(&self) -> &Arc<RegionUtility> {
        &self.utility
    }

    pub fn properties(&self) -> &PNProperties {
        &self.properties
    }
}
