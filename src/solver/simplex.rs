//! 精确有理数单纯形法 (Phase 1)：判定线性约束系统是否存在非负有理解.
//!
//! 采用 Bland 规则避免退化循环；所有运算基于 `BigRational`，不存在舍入误差。
use num::bigint::BigInt;
use num::rational::BigRational;
use num::traits::{One, Signed, Zero};

use crate::solver::cancel::{CancelToken, Cancelled};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Ge,
    Le,
    Eq,
}

impl Relation {
    fn flipped(self) -> Self {
        match self {
            Relation::Ge => Relation::Le,
            Relation::Le => Relation::Ge,
            Relation::Eq => Relation::Eq,
        }
    }
}

/// `coeffs · x (relation) rhs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub coeffs: Vec<i64>,
    pub relation: Relation,
    pub rhs: i64,
}

/// Linear constraints over variables `x_i ∈ [lower_i, upper_i]`, `lower_i ≥ 0`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearSystem {
    vars: usize,
    constraints: Vec<Constraint>,
    lower: Vec<i64>,
    upper: Vec<Option<i64>>,
}

impl LinearSystem {
    pub fn new(vars: usize) -> Self {
        Self {
            vars,
            constraints: Vec::new(),
            lower: vec![0; vars],
            upper: vec![None; vars],
        }
    }

    pub fn vars(&self) -> usize {
        self.vars
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn add(&mut self, coeffs: Vec<i64>, relation: Relation, rhs: i64) {
        debug_assert_eq!(coeffs.len(), self.vars);
        if coeffs.iter().all(|c| *c == 0) && rhs == 0 {
            return;
        }
        self.constraints.push(Constraint {
            coeffs,
            relation,
            rhs,
        });
    }

    pub fn ge(&mut self, coeffs: Vec<i64>, rhs: i64) {
        self.add(coeffs, Relation::Ge, rhs);
    }

    pub fn le(&mut self, coeffs: Vec<i64>, rhs: i64) {
        self.add(coeffs, Relation::Le, rhs);
    }

    pub fn equal(&mut self, coeffs: Vec<i64>, rhs: i64) {
        self.add(coeffs, Relation::Eq, rhs);
    }

    pub fn lower(&self, var: usize) -> i64 {
        self.lower[var]
    }

    pub fn upper(&self, var: usize) -> Option<i64> {
        self.upper[var]
    }

    /// Tightens the lower bound of `var`.
    pub fn set_lower(&mut self, var: usize, value: i64) {
        self.lower[var] = self.lower[var].max(value);
    }

    /// Tightens the upper bound of `var`.
    pub fn set_upper(&mut self, var: usize, value: i64) {
        self.upper[var] = Some(self.upper[var].map_or(value, |u| u.min(value)));
    }

    /// True if every rational solution can be scaled by a positive integer
    /// into an integer solution: no bounds except `0`, and every constraint is
    /// homogeneous or of the form `a·x ≥ b` with `b > 0`.
    pub fn is_scalable(&self) -> bool {
        self.lower.iter().all(|l| *l == 0)
            && self.upper.iter().all(|u| matches!(u, None | Some(0)))
            && self.constraints.iter().all(|c| {
                c.rhs == 0
                    || (c.relation == Relation::Ge && c.rhs > 0)
                    || (c.relation == Relation::Le && c.rhs < 0)
            })
    }

    /// Checks an integer assignment against all constraints and bounds.
    pub fn is_satisfied_by(&self, values: &[i64]) -> bool {
        if values.len() != self.vars {
            return false;
        }
        let bounds_ok = values.iter().enumerate().all(|(i, v)| {
            *v >= self.lower[i] && self.upper[i].is_none_or(|u| *v <= u)
        });
        bounds_ok
            && self.constraints.iter().all(|c| {
                let lhs: i128 = c
                    .coeffs
                    .iter()
                    .zip(values)
                    .map(|(a, x)| *a as i128 * *x as i128)
                    .sum();
                let rhs = c.rhs as i128;
                match c.relation {
                    Relation::Ge => lhs >= rhs,
                    Relation::Le => lhs <= rhs,
                    Relation::Eq => lhs == rhs,
                }
            })
    }
}

fn rational(value: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(value))
}

struct Tableau {
    rows: Vec<Vec<BigRational>>,
    objective: Vec<BigRational>,
    basis: Vec<usize>,
    width: usize,
}

impl Tableau {
    fn rhs(&self) -> usize {
        self.width
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let pivot = self.rows[row][col].clone();
        for value in self.rows[row].iter_mut() {
            *value /= pivot.clone();
        }
        let pivot_row = self.rows[row].clone();
        let eliminate = |target: &mut Vec<BigRational>| {
            let factor = target[col].clone();
            if factor.is_zero() {
                return;
            }
            for (value, p) in target.iter_mut().zip(pivot_row.iter()) {
                if !p.is_zero() {
                    *value -= p * &factor;
                }
            }
        };
        for (idx, other) in self.rows.iter_mut().enumerate() {
            if idx != row {
                eliminate(other);
            }
        }
        eliminate(&mut self.objective);
        self.basis[row] = col;
    }

    /// Bland's rule: lowest index with negative reduced cost.
    fn entering(&self) -> Option<usize> {
        (0..self.width).find(|&col| self.objective[col].is_negative())
    }

    fn leaving(&self, col: usize) -> Option<usize> {
        let rhs = self.rhs();
        let mut best: Option<(BigRational, usize, usize)> = None;
        for (idx, row) in self.rows.iter().enumerate() {
            if !row[col].is_positive() {
                continue;
            }
            let ratio = &row[rhs] / &row[col];
            let better = match &best {
                None => true,
                Some((current, _, basic)) => {
                    ratio < *current || (ratio == *current && self.basis[idx] < *basic)
                }
            };
            if better {
                best = Some((ratio, idx, self.basis[idx]));
            }
        }
        best.map(|(_, idx, _)| idx)
    }
}

/// Returns a rational point satisfying `system`, or `None` if it is infeasible.
pub fn feasible_point(
    system: &LinearSystem,
    cancel: &CancelToken,
) -> Result<Option<Vec<BigRational>>, Cancelled> {
    let n = system.vars;
    if (0..n).any(|i| system.upper[i].is_some_and(|u| u < system.lower[i])) {
        return Ok(None);
    }

    // shift x = lower + y, upper bounds become rows
    let mut rows: Vec<(Vec<BigRational>, Relation, BigRational)> = Vec::new();
    for constraint in &system.constraints {
        let shift: i128 = constraint
            .coeffs
            .iter()
            .zip(&system.lower)
            .map(|(a, l)| *a as i128 * *l as i128)
            .sum();
        let rhs = BigRational::from_integer(BigInt::from(constraint.rhs as i128 - shift));
        rows.push((
            constraint.coeffs.iter().map(|a| rational(*a)).collect(),
            constraint.relation,
            rhs,
        ));
    }
    for var in 0..n {
        if let Some(upper) = system.upper[var] {
            let mut coeffs = vec![BigRational::zero(); n];
            coeffs[var] = BigRational::one();
            rows.push((coeffs, Relation::Le, rational(upper - system.lower[var])));
        }
    }
    for (coeffs, relation, rhs) in rows.iter_mut() {
        if rhs.is_negative() {
            for value in coeffs.iter_mut() {
                *value = -value.clone();
            }
            *rhs = -rhs.clone();
            *relation = relation.flipped();
        }
    }

    let slack_count = rows
        .iter()
        .filter(|(_, rel, _)| *rel != Relation::Eq)
        .count();
    let artificial_count = rows
        .iter()
        .filter(|(_, rel, _)| *rel != Relation::Le)
        .count();
    let width = n + slack_count + artificial_count;
    let first_artificial = n + slack_count;

    let mut tableau = Tableau {
        rows: Vec::with_capacity(rows.len()),
        objective: vec![BigRational::zero(); width + 1],
        basis: Vec::with_capacity(rows.len()),
        width,
    };
    let mut next_slack = n;
    let mut next_artificial = first_artificial;
    for (coeffs, relation, rhs) in rows {
        let mut row = vec![BigRational::zero(); width + 1];
        for (idx, value) in coeffs.into_iter().enumerate() {
            row[idx] = value;
        }
        row[width] = rhs;
        let basic = match relation {
            Relation::Le => {
                row[next_slack] = BigRational::one();
                next_slack += 1;
                next_slack - 1
            }
            Relation::Ge => {
                row[next_slack] = -BigRational::one();
                next_slack += 1;
                row[next_artificial] = BigRational::one();
                next_artificial += 1;
                next_artificial - 1
            }
            Relation::Eq => {
                row[next_artificial] = BigRational::one();
                next_artificial += 1;
                next_artificial - 1
            }
        };
        if basic >= first_artificial {
            for col in 0..first_artificial {
                tableau.objective[col] -= &row[col];
            }
            tableau.objective[width] -= &row[width];
        }
        tableau.rows.push(row);
        tableau.basis.push(basic);
    }

    while let Some(col) = tableau.entering() {
        cancel.check()?;
        match tableau.leaving(col) {
            Some(row) => tableau.pivot(row, col),
            // phase 1 is bounded below by zero
            None => break,
        }
    }

    if !tableau.objective[width].is_zero() {
        return Ok(None);
    }

    let mut point: Vec<BigRational> = system.lower.iter().map(|l| rational(*l)).collect();
    for (row, basic) in tableau.rows.iter().zip(&tableau.basis) {
        if *basic < n {
            point[*basic] += &row[width];
        }
    }
    Ok(Some(point))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(point: &[BigRational], idx: usize) -> BigRational {
        point[idx].clone()
    }

    #[test]
    fn finds_point_of_simple_system() {
        // x + y >= 3, x - y = 1, y <= 5
        let mut system = LinearSystem::new(2);
        system.ge(vec![1, 1], 3);
        system.equal(vec![1, -1], 1);
        system.set_upper(1, 5);

        let point = feasible_point(&system, &CancelToken::new())
            .unwrap()
            .expect("feasible");
        let (x, y) = (value(&point, 0), value(&point, 1));
        assert_eq!(&x - &y, BigRational::one());
        assert!(&x + &y >= rational(3));
        assert!(y <= rational(5));
    }

    #[test]
    fn detects_infeasibility() {
        // x >= 2, x <= 1
        let mut system = LinearSystem::new(1);
        system.ge(vec![1], 2);
        system.le(vec![1], 1);
        assert_eq!(feasible_point(&system, &CancelToken::new()).unwrap(), None);

        let mut bounds = LinearSystem::new(1);
        bounds.set_lower(0, 3);
        bounds.set_upper(0, 2);
        assert_eq!(feasible_point(&bounds, &CancelToken::new()).unwrap(), None);
    }

    #[test]
    fn respects_lower_bounds() {
        let mut system = LinearSystem::new(2);
        system.set_lower(0, 4);
        system.le(vec![1, 1], 4);
        let point = feasible_point(&system, &CancelToken::new())
            .unwrap()
            .expect("feasible");
        assert_eq!(value(&point, 0), rational(4));
        assert_eq!(value(&point, 1), rational(0));
    }

    #[test]
    fn fractional_solutions_are_exact() {
        // 3x = 1
        let mut system = LinearSystem::new(1);
        system.equal(vec![3], 1);
        let point = feasible_point(&system, &CancelToken::new())
            .unwrap()
            .expect("feasible");
        assert_eq!(
            value(&point, 0),
            BigRational::new(BigInt::from(1), BigInt::from(3))
        );
    }

    #[test]
    fn cancelled_token_stops_pivoting() {
        let mut system = LinearSystem::new(1);
        system.ge(vec![1], 1);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(feasible_point(&system, &cancel), Err(Cancelled));
    }

    #[test]
    fn scalability() {
        let mut system = LinearSystem::new(2);
        system.ge(vec![1, -1], 1);
        system.equal(vec![1, 1], 0);
        system.set_upper(1, 0);
        assert!(system.is_scalable());
        system.set_upper(0, 1);
        assert!(!system.is_scalable());

        let mut checked = LinearSystem::new(2);
        checked.ge(vec![1, -1], 1);
        assert!(checked.is_satisfied_by(&[2, 1]));
        assert!(!checked.is_satisfied_by(&[1, 1]));
    }
}
