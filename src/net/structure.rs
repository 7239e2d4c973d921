//! P/T 网静态结构元素：库所、迁移与标识。
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::index_vec::{IndexVec, PlaceId};

pub type Weight = u64;

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Debug)]
pub struct Place {
    pub name: String,
    pub tokens: Weight,
}

impl Place {
    pub fn new(name: impl Into<String>, tokens: Weight) -> Self {
        Self {
            name: name.into(),
            tokens,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Transition {
    pub name: String,
}

impl Transition {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transition").field(&self.name).finish()
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Marking(pub IndexVec<PlaceId, Weight>);

impl Marking {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, &Weight)> {
        self.0.iter_enumerated()
    }

    pub fn tokens(&self, place: PlaceId) -> Weight {
        self.0[place]
    }

    pub fn tokens_mut(&mut self, place: PlaceId) -> &mut Weight {
        &mut self.0[place]
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (place, tokens) in self.iter() {
            map.entry(&place, tokens);
        }
        map.finish()
    }
}

impl fmt::Display for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (idx, (_, tokens)) in self.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{tokens}")?;
        }
        write!(f, "]")
    }
}
