//! # 精确整数线性可行性求解
//!
//! 区域综合把每个分离问题化为 "存在非负整数向量 x 满足 A·x (≥|≤|=) b" 的判定问题。
//! 本模块提供:
//!
//! * [`LinearSystem`] 约束系统及变量上下界;
//! * [`simplex::feasible_point`] 基于 `BigRational` 的 Phase 1 单纯形;
//! * [`ilp::solve_integer`] 放大或分支定界得到整数解;
//! * [`CancelToken`] 协作式取消。
//!
//! 所有求解都是精确的：返回 `None` 即表示系统确实没有整数解。

pub mod cancel;
pub mod ilp;
pub mod simplex;

use thiserror::Error;

pub use cancel::{CancelToken, Cancelled};
pub use ilp::solve_integer;
pub use simplex::{Constraint, LinearSystem, Relation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    #[error("solution does not fit into 64-bit integers")]
    Overflow,
}

/// Decides integer feasibility of a [`LinearSystem`].
pub trait IntegerSolver: Send + Sync {
    fn solve(
        &self,
        system: &LinearSystem,
        cancel: &CancelToken,
    ) -> Result<Option<Vec<i64>>, SolverError>;

    fn name(&self) -> &'static str {
        "integer-solver"
    }
}

/// Rational simplex with branch and bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactSolver;

impl IntegerSolver for ExactSolver {
    fn solve(
        &self,
        system: &LinearSystem,
        cancel: &CancelToken,
    ) -> Result<Option<Vec<i64>>, SolverError> {
        solve_integer(system, cancel)
    }

    fn name(&self) -> &'static str {
        "exact"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockSolver {
        answer: Option<Vec<i64>>,
    }

    impl IntegerSolver for MockSolver {
        fn solve(
            &self,
            _system: &LinearSystem,
            _cancel: &CancelToken,
        ) -> Result<Option<Vec<i64>>, SolverError> {
            Ok(self.answer.clone())
        }
    }

    #[test]
    fn default_name_is_generic() {
        let mock = MockSolver { answer: None };
        assert_eq!(mock.name(), "integer-solver");
        assert_eq!(ExactSolver.name(), "exact");
    }

    #[test]
    fn solvers_are_object_safe() {
        let mut system = LinearSystem::new(1);
        system.ge(vec![1], 1);
        let solvers: Vec<Box<dyn IntegerSolver>> = vec![
            Box::new(ExactSolver),
            Box::new(MockSolver {
                answer: Some(vec![7]),
            }),
        ];
        for solver in solvers {
            let point = solver
                .solve(&system, &CancelToken::new())
                .unwrap()
                .expect("feasible");
            assert!(system.is_satisfied_by(&point));
        }
    }

    #[test]
    fn cancellation_converts_into_solver_error() {
        let err: SolverError = Cancelled.into();
        assert_eq!(err, SolverError::Cancelled(Cancelled));
    }
}
