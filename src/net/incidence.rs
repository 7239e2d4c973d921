//! 输入/输出弧权重矩阵 (`Pre`, `Post`)，按库所分行存储.
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::net::index_vec::{Idx, IndexVec, PlaceId, TransitionId};
use crate::net::structure::Weight;

type SmallRow<T> = SmallVec<[T; 4]>;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Incidence {
    rows: IndexVec<PlaceId, SmallRow<Weight>>,
    cols: usize,
}

impl Incidence {
    pub fn new(places: usize, transitions: usize) -> Self {
        Self {
            rows: (0..places)
                .map(|_| SmallRow::from_elem(0, transitions))
                .collect(),
            cols: transitions,
        }
    }

    pub fn places(&self) -> usize {
        self.rows.len()
    }

    pub fn transitions(&self) -> usize {
        self.cols
    }

    pub fn push_place(&mut self) -> PlaceId {
        self.rows.push(SmallRow::from_elem(0, self.cols))
    }

    pub fn push_transition(&mut self) -> TransitionId {
        let next = self.cols;
        for row in self.rows.iter_mut() {
            row.push(0);
        }
        self.cols += 1;
        TransitionId::from_usize(next)
    }

    pub fn set(&mut self, place: PlaceId, transition: TransitionId, value: Weight) {
        self.rows[place][transition.index()] = value;
    }

    pub fn get(&self, place: PlaceId, transition: TransitionId) -> Weight {
        self.rows[place][transition.index()]
    }

    pub fn rows(&self) -> &IndexVec<PlaceId, SmallRow<Weight>> {
        &self.rows
    }

    /// Non-zero entries of one transition column.
    pub fn column(&self, transition: TransitionId) -> impl Iterator<Item = (PlaceId, Weight)> + '_ {
        self.rows
            .iter_enumerated()
            .map(move |(place, row)| (place, row[transition.index()]))
            .filter(|(_, weight)| *weight > 0)
    }

    /// `self - other`, e.g. `C = Post - Pre`.
    pub fn difference(&self, other: &Self) -> IndexVec<PlaceId, Vec<i64>> {
        assert_eq!(self.places(), other.places());
        assert_eq!(self.transitions(), other.transitions());
        self.rows
            .iter()
            .zip(other.rows.iter())
            .map(|(left, right)| {
                left.iter()
                    .zip(right.iter())
                    .map(|(l, r)| *l as i64 - *r as i64)
                    .collect()
            })
            .collect()
    }
}

impl fmt::Debug for Incidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Incidence")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growing_keeps_rows_rectangular() {
        let mut matrix = Incidence::new(1, 1);
        let t = matrix.push_transition();
        let p = matrix.push_place();
        matrix.set(p, t, 3);

        assert_eq!(matrix.places(), 2);
        assert_eq!(matrix.transitions(), 2);
        assert!(matrix.rows().iter().all(|row| row.len() == 2));
        assert_eq!(matrix.column(t).collect::<Vec<_>>(), vec![(p, 3)]);
    }

    #[test]
    fn difference_is_signed() {
        let mut post = Incidence::new(1, 1);
        let pre = {
            let mut pre = Incidence::new(1, 1);
            pre.set(PlaceId::new(0), TransitionId::new(0), 2);
            pre
        };
        post.set(PlaceId::new(0), TransitionId::new(0), 1);
        assert_eq!(post.difference(&pre)[PlaceId::new(0)], vec![-1]);
    }
}
