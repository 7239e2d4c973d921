//! 运行时: 可发生集与发生语义, 以及 DOT 导出.
use std::fmt::{self, Write as FmtWrite};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::incidence::Incidence;
use crate::net::index_vec::{Idx, IndexVec, PlaceId, TransitionId};
use crate::net::structure::{Marking, Place, Transition, Weight};

#[derive(Debug, Error)]
pub enum FireError {
    #[error("transition {0:?} is out of bounds")]
    OutOfBounds(TransitionId),
    #[error("transition {0:?} is not enabled under the supplied marking")]
    NotEnabled(TransitionId),
    #[error("token count of place {0:?} overflows")]
    TokenOverflow(PlaceId),
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Net {
    pub places: IndexVec<PlaceId, Place>,
    pub transitions: IndexVec<TransitionId, Transition>,
    pub pre: Incidence,
    pub post: Incidence,
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("places", &self.places)
            .field("transitions", &self.transitions)
            .field("pre", &self.pre)
            .field("post", &self.post)
            .finish()
    }
}

impl Net {
    pub fn empty() -> Self {
        Self {
            places: IndexVec::new(),
            transitions: IndexVec::new(),
            pre: Incidence::new(0, 0),
            post: Incidence::new(0, 0),
        }
    }

    pub fn add_place(&mut self, place: Place) -> PlaceId {
        let place_id = self.places.push(place);
        self.pre.push_place();
        self.post.push_place();
        place_id
    }

    pub fn add_transition(&mut self, transition: Transition) -> TransitionId {
        let transition_id = self.transitions.push(transition);
        self.pre.push_transition();
        self.post.push_transition();
        transition_id
    }

    /// 输入弧: place -> transition
    pub fn add_input_arc(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        if weight == 0 {
            return;
        }
        let current = self.pre.get(place, transition);
        self.pre.set(place, transition, current + weight);
    }

    /// 输出弧: transition -> place
    pub fn add_output_arc(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        if weight == 0 {
            return;
        }
        let current = self.post.get(place, transition);
        self.post.set(place, transition, current + weight);
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    /// Number of non-zero entries in `Pre` and `Post`.
    pub fn arcs_len(&self) -> usize {
        let count = |matrix: &Incidence| {
            matrix
                .rows()
                .iter()
                .map(|row| row.iter().filter(|w| **w > 0).count())
                .sum::<usize>()
        };
        count(&self.pre) + count(&self.post)
    }

    pub fn transition_by_name(&self, name: &str) -> Option<TransitionId> {
        self.transitions
            .iter_enumerated()
            .find(|(_, transition)| transition.name == name)
            .map(|(id, _)| id)
    }

    pub fn initial_marking(&self) -> Marking {
        Marking(self.places.iter().map(|p| p.tokens).collect())
    }

    pub fn c_matrix(&self) -> IndexVec<PlaceId, Vec<i64>> {
        self.post.difference(&self.pre)
    }

    pub fn enabled_transitions(&self, marking: &Marking) -> Vec<TransitionId> {
        self.transitions
            .indices()
            .filter(|&transition| self.is_transition_enabled(transition, marking))
            .collect()
    }

    pub fn fire_transition(
        &self,
        marking: &Marking,
        transition: TransitionId,
    ) -> Result<Marking, FireError> {
        if transition.index() >= self.transitions_len() {
            return Err(FireError::OutOfBounds(transition));
        }
        if !self.is_transition_enabled(transition, marking) {
            return Err(FireError::NotEnabled(transition));
        }

        let mut next = marking.clone();
        for (place, weight) in self.pre.column(transition) {
            // enabledness guarantees enough tokens
            *next.tokens_mut(place) -= weight;
        }
        for (place, weight) in self.post.column(transition) {
            let tokens = next.tokens_mut(place);
            *tokens = tokens
                .checked_add(weight)
                .ok_or(FireError::TokenOverflow(place))?;
        }
        Ok(next)
    }

    fn is_transition_enabled(&self, transition: TransitionId, marking: &Marking) -> bool {
        if transition.index() >= self.transitions_len() {
            return false;
        }
        self.pre
            .column(transition)
            .all(|(place, weight)| marking.tokens(place) >= weight)
    }

    /// Graphviz rendering: places as circles with their initial tokens,
    /// transitions as boxes named by their event, weights above one as labels.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph net {\n    rankdir=LR;\n");
        for (place_id, place) in self.places.iter_enumerated() {
            let _ = writeln!(
                dot,
                "    p{} [shape=circle, label={:?}];",
                place_id.index(),
                format!("{}\n{}", place.name, place.tokens)
            );
        }
        for (transition_id, transition) in self.transitions.iter_enumerated() {
            let _ = writeln!(
                dot,
                "    t{} [shape=box, label={:?}];",
                transition_id.index(),
                transition.name
            );
        }
        for (place_id, row) in self.pre.rows().iter_enumerated() {
            for (transition, &weight) in row.iter().enumerate().filter(|(_, w)| **w > 0) {
                let _ = writeln!(dot, "    p{} -> t{transition}{};", place_id.index(), weight_label(weight));
            }
        }
        for (place_id, row) in self.post.rows().iter_enumerated() {
            for (transition, &weight) in row.iter().enumerate().filter(|(_, w)| **w > 0) {
                let _ = writeln!(dot, "    t{transition} -> p{}{};", place_id.index(), weight_label(weight));
            }
        }
        dot.push_str("}\n");
        dot
    }
}

impl Default for Net {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "places: {}, transitions: {}, arcs: {}",
            self.places_len(),
            self.transitions_len(),
            self.arcs_len()
        )?;
        for (place_id, place) in self.places.iter_enumerated() {
            let preset: Vec<String> = self
                .transitions
                .iter_enumerated()
                .filter_map(|(t, tr)| match self.post.get(place_id, t) {
                    0 => None,
                    1 => Some(tr.name.clone()),
                    w => Some(format!("{}*{}", w, tr.name)),
                })
                .collect();
            let postset: Vec<String> = self
                .transitions
                .iter_enumerated()
                .filter_map(|(t, tr)| match self.pre.get(place_id, t) {
                    0 => None,
                    1 => Some(tr.name.clone()),
                    w => Some(format!("{}*{}", w, tr.name)),
                })
                .collect();
            writeln!(
                f,
                "  {} [{}]: {{{}}} -> {{{}}}",
                place.name,
                place.tokens,
                preset.join(", "),
                postset.join(", ")
            )?;
        }
        Ok(())
    }
}

fn weight_label(weight: Weight) -> String {
    if weight == 1 {
        String::new()
    } else {
        format!(" [label=\"{weight}\"]")
    }
}
