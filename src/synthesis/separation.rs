//! # 分离引擎
//!
//! 按固定顺序处理所有 SSP/ESSP 问题。对每个问题:
//!
//! 1. 已接受的区域基中若有区域解决该问题, 直接跳过;
//! 2. 依次尝试核空间方向提升得到的纯区域 (需满足性质);
//! 3. 最后求解精确整数线性系统;
//! 4. 找不到区域时记录为失败, 继续下一个问题。
//!
//! 并行模式下按批处理: 工作线程只返回搜索结果, 由调用线程按问题顺序提交。
//! 搜索是精确的且与区域基无关, 因此成功/失败的划分与顺序模式一致。
use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexSet;
use log::{debug, info, trace, warn};
use rayon::prelude::*;

use crate::solver::{CancelToken, IntegerSolver, SolverError};
use crate::synthesis::equations::RegionSystem;
use crate::synthesis::error::SynthesisError;
use crate::synthesis::problems::SeparationProblem;
use crate::synthesis::properties::PNProperties;
use crate::synthesis::region::Region;
use crate::synthesis::utility::RegionUtility;
use crate::ts::StateId;

/// Problems handed to the worker pool per thread and batch.
const BATCH_PER_THREAD: usize = 8;

impl From<SolverError> for SynthesisError {
    fn from(err: SolverError) -> Self {
        match err {
            SolverError::Cancelled(_) => SynthesisError::Cancelled,
            SolverError::Overflow => SynthesisError::Overflow,
        }
    }
}

/// Accepted regions and failures of one run.
#[derive(Debug, Clone, Default)]
pub struct SeparationResult {
    pub regions: IndexSet<Region>,
    pub failed_state_separation: Vec<BTreeSet<StateId>>,
    pub failed_event_separation: Vec<(usize, StateId)>,
}

impl SeparationResult {
    fn solved_by_basis(&self, problem: &SeparationProblem) -> bool {
        self.regions.iter().any(|region| region.solves(problem))
    }

    fn commit(&mut self, problem: &SeparationProblem, found: Option<Region>) {
        if self.solved_by_basis(problem) {
            return;
        }
        match (found, *problem) {
            (Some(region), _) => {
                debug!("{problem:?} solved by {region}");
                self.regions.insert(region);
            }
            (None, SeparationProblem::State { first, second }) => {
                warn!("failed to separate states {first:?} and {second:?}");
                self.failed_state_separation
                    .push(BTreeSet::from([first, second]));
            }
            (None, SeparationProblem::Event { event, state }) => {
                warn!("failed to keep event {event} disabled at {state:?}");
                self.failed_event_separation.push((event, state));
            }
        }
    }
}

pub struct SeparationEngine<'a> {
    properties: &'a PNProperties,
    system: RegionSystem<'a>,
    candidates: Vec<Region>,
    solver: &'a dyn IntegerSolver,
    cancel: &'a CancelToken,
}

impl<'a> SeparationEngine<'a> {
    pub fn new(
        utility: &'a Arc<RegionUtility>,
        properties: &'a PNProperties,
        solver: &'a dyn IntegerSolver,
        cancel: &'a CancelToken,
    ) -> Result<Self, SynthesisError> {
        let mut candidates: Vec<Region> = Vec::new();
        for direction in utility.region_basis() {
            let negated: Vec<i64> = direction.iter().map(|w| -w).collect();
            for effect in [direction.as_slice(), negated.as_slice()] {
                let lifted = Region::from_effect(utility, effect)?;
                if let Ok(region) = Region::combine(&[(1, &lifted)], properties) {
                    if !candidates.contains(&region) {
                        candidates.push(region);
                    }
                }
            }
        }
        trace!("{} lifted candidate regions", candidates.len());

        Ok(Self {
            properties,
            system: RegionSystem::new(utility, properties)?,
            candidates,
            solver,
            cancel,
        })
    }

    pub fn properties(&self) -> &PNProperties {
        self.properties
    }

    /// Finds some region solving `problem`, independent of any basis.
    pub fn search(&self, problem: &SeparationProblem) -> Result<Option<Region>, SynthesisError> {
        self.cancel.check().map_err(|_| SynthesisError::Cancelled)?;
        if let Some(region) = self.candidates.iter().find(|r| r.solves(problem)) {
            return Ok(Some(region.clone()));
        }
        for system in self.system.systems_for(problem)? {
            if let Some(solution) = self.solver.solve(&system, self.cancel)? {
                let region = self.system.region_from_solution(&solution)?;
                if !region.solves(problem) {
                    return Err(SynthesisError::InvariantViolation(format!(
                        "solver region {region} does not solve {problem:?}"
                    )));
                }
                return Ok(Some(region));
            }
        }
        Ok(None)
    }

    pub fn run_sequential(
        &self,
        problems: &[SeparationProblem],
    ) -> Result<SeparationResult, SynthesisError> {
        let mut result = SeparationResult::default();
        for problem in problems {
            if result.solved_by_basis(problem) {
                continue;
            }
            let found = self.search(problem)?;
            result.commit(problem, found);
        }
        self.summarize(&result, problems.len());
        Ok(result)
    }

    pub fn run_parallel(
        &self,
        problems: &[SeparationProblem],
        threads: usize,
    ) -> Result<SeparationResult, SynthesisError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|err| SynthesisError::WorkerPool(err.to_string()))?;
        let batch_size = pool.current_num_threads().max(1) * BATCH_PER_THREAD;

        let mut result = SeparationResult::default();
        for batch in problems.chunks(batch_size) {
            self.cancel.check().map_err(|_| SynthesisError::Cancelled)?;
            let pending: Vec<&SeparationProblem> = batch
                .iter()
                .filter(|problem| !result.solved_by_basis(problem))
                .collect();
            let outcomes: Vec<Result<Option<Region>, SynthesisError>> =
                pool.install(|| pending.par_iter().map(|p| self.search(p)).collect());
            for (problem, outcome) in pending.into_iter().zip(outcomes) {
                result.commit(problem, outcome?);
            }
        }
        self.summarize(&result, problems.len());
        Ok(result)
    }

    fn summarize(&self, result: &SeparationResult, problems: usize) {
        info!(
            "{} problems, {} regions, {} failed state separations, {} failed event separations",
            problems,
            result.regions.len(),
            result.failed_state_separation.len(),
            result.failed_event_separation.len()
        );
    }
}
