//! 整数可行性：齐次系统直接对有理解按分母最小公倍数放大，
//! 否则在有界变量上做深度优先分支定界。
use log::trace;
use num::bigint::BigInt;
use num::integer::Integer;
use num::rational::BigRational;
use num::traits::{One, ToPrimitive};

use crate::solver::cancel::CancelToken;
use crate::solver::simplex::{LinearSystem, feasible_point};
use crate::solver::SolverError;

/// Returns an integer point of `system`, or `None` if there is none.
///
/// Non-scalable systems must bound every variable from above so the search
/// terminates.
pub fn solve_integer(
    system: &LinearSystem,
    cancel: &CancelToken,
) -> Result<Option<Vec<i64>>, SolverError> {
    if system.is_scalable() {
        return match feasible_point(system, cancel)? {
            Some(point) => scale_to_integers(&point).map(Some),
            None => Ok(None),
        };
    }
    debug_assert!(
        (0..system.vars()).all(|v| system.upper(v).is_some()),
        "branch and bound needs bounded variables"
    );
    branch_and_bound(system, cancel)
}

fn scale_to_integers(point: &[BigRational]) -> Result<Vec<i64>, SolverError> {
    let lcm = point
        .iter()
        .fold(BigInt::one(), |acc, value| acc.lcm(value.denom()));
    point
        .iter()
        .map(|value| {
            (value.numer() * (&lcm / value.denom()))
                .to_i64()
                .ok_or(SolverError::Overflow)
        })
        .collect()
}

fn branch_and_bound(
    system: &LinearSystem,
    cancel: &CancelToken,
) -> Result<Option<Vec<i64>>, SolverError> {
    let mut stack = vec![system.clone()];
    let mut nodes = 0usize;
    while let Some(node) = stack.pop() {
        cancel.check()?;
        nodes += 1;
        let Some(point) = feasible_point(&node, cancel)? else {
            continue;
        };
        let fractional = point
            .iter()
            .enumerate()
            .find(|(_, value)| !value.is_integer());
        let Some((var, value)) = fractional else {
            trace!("integer point found after {nodes} nodes");
            return point
                .iter()
                .map(|v| v.to_integer().to_i64().ok_or(SolverError::Overflow))
                .collect::<Result<Vec<_>, _>>()
                .map(Some);
        };
        let floor = value.floor().to_integer().to_i64().ok_or(SolverError::Overflow)?;

        let mut up = node.clone();
        up.set_lower(var, floor + 1);
        let mut down = node;
        down.set_upper(var, floor);
        // down branch is explored first
        stack.push(up);
        stack.push(down);
    }
    trace!("no integer point, {nodes} nodes explored");
    Ok(None)
}
