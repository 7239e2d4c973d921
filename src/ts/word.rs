//! Words (finite label sequences) and their linear transition systems.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ts::system::{StateId, TransitionSystem};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Word(Vec<String>);

impl Word {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(labels.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Labels are separated by whitespace and/or commas.
impl FromStr for Word {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(
            s.split(|c: char| c.is_whitespace() || c == ',')
                .filter(|label| !label.is_empty()),
        ))
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

/// The linear transition system of a word.
///
/// State `s<i>` is reached after the first `i` letters; the position of each
/// state is kept here rather than on the state itself.
#[derive(Debug, Clone)]
pub struct WordSystem {
    word: Word,
    ts: TransitionSystem,
    states: Vec<StateId>,
    positions: HashMap<StateId, usize>,
}

impl WordSystem {
    pub fn new(word: &Word) -> Self {
        let mut ts = TransitionSystem::new();
        let mut state = ts.create_state();
        ts.set_initial(state);

        let mut states = vec![state];
        let mut positions = HashMap::from([(state, 0)]);
        for (index, label) in word.iter().enumerate() {
            let next = ts.create_state();
            ts.add_arc(state, next, label);
            positions.insert(next, index + 1);
            states.push(next);
            state = next;
        }

        Self {
            word: word.clone(),
            ts,
            states,
            positions,
        }
    }

    pub fn word(&self) -> &Word {
        &self.word
    }

    pub fn ts(&self) -> &TransitionSystem {
        &self.ts
    }

    pub fn position(&self, state: StateId) -> Option<usize> {
        self.positions.get(&state).copied()
    }

    pub fn state_at(&self, position: usize) -> Option<StateId> {
        self.states.get(position).copied()
    }
}
