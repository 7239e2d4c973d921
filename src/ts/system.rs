//! 带标签迁移系统 (LTS)：状态、初始状态与带事件标签的有向弧。
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::io::IoError;

pub type StateId = NodeIndex;

#[derive(Debug, Error)]
pub enum TsError {
    #[error("state `{0}` is declared twice")]
    DuplicateState(String),
    #[error("unknown state `{0}`")]
    UnknownState(String),
    #[error("label `{0}` is used by an arc but was not declared")]
    UnknownLabel(String),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error(transparent)]
    Io(#[from] IoError),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct TransitionSystem {
    name: Option<String>,
    graph: DiGraph<State, String>,
    initial: Option<StateId>,
    names: IndexMap<String, StateId>,
    locations: IndexMap<String, String>,
}

impl TransitionSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn add_state(&mut self, name: impl Into<String>) -> Result<StateId, TsError> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(TsError::DuplicateState(name));
        }
        let id = self.graph.add_node(State { name: name.clone() });
        self.names.insert(name, id);
        Ok(id)
    }

    /// Adds a state with a fresh `s<n>` name.
    pub fn create_state(&mut self) -> StateId {
        let mut n = self.graph.node_count();
        loop {
            let name = format!("s{n}");
            if !self.names.contains_key(&name) {
                let id = self.graph.add_node(State { name: name.clone() });
                self.names.insert(name, id);
                return id;
            }
            n += 1;
        }
    }

    pub fn set_initial(&mut self, state: StateId) {
        debug_assert!(self.graph.node_weight(state).is_some());
        self.initial = Some(state);
    }

    pub fn initial(&self) -> Option<StateId> {
        self.initial
    }

    pub fn add_arc(&mut self, from: StateId, to: StateId, label: impl Into<String>) -> EdgeIndex {
        self.graph.add_edge(from, to, label.into())
    }

    pub fn state_name(&self, id: StateId) -> &str {
        &self.graph[id].name
    }

    pub fn state_by_name(&self, name: &str) -> Option<StateId> {
        self.names.get(name).copied()
    }

    /// All states in insertion order.
    pub fn states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.graph.node_indices()
    }

    pub fn state_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn arc_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All arcs in insertion order as `(source, label, target)`.
    pub fn arcs(&self) -> impl Iterator<Item = (StateId, &str, StateId)> + '_ {
        self.graph
            .edge_references()
            .map(|edge| (edge.source(), edge.weight().as_str(), edge.target()))
    }

    /// Outgoing arcs of `state` in insertion order as `(label, target)`.
    pub fn outgoing(&self, state: StateId) -> Vec<(&str, StateId)> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(state, Direction::Outgoing)
            .collect();
        edges.sort_by_key(|edge| edge.id());
        edges
            .into_iter()
            .map(|edge| (edge.weight().as_str(), edge.target()))
            .collect()
    }

    /// Labels in order of first occurrence.
    pub fn alphabet(&self) -> IndexSet<String> {
        self.arcs().map(|(_, label, _)| label.to_string()).collect()
    }

    pub fn set_location(&mut self, event: impl Into<String>, location: impl Into<String>) {
        self.locations.insert(event.into(), location.into());
    }

    pub fn location(&self, event: &str) -> Option<&str> {
        self.locations.get(event).map(String::as_str)
    }

    pub fn to_spec(&self) -> TsSpec {
        TsSpec {
            name: self.name.clone(),
            states: self.graph.node_weights().map(|s| s.name.clone()).collect(),
            initial: self.initial.map(|s| self.state_name(s).to_string()),
            arcs: self
                .arcs()
                .map(|(from, label, to)| ArcSpec {
                    from: self.state_name(from).to_string(),
                    label: label.to_string(),
                    to: self.state_name(to).to_string(),
                })
                .collect(),
            locations: self.locations.clone(),
        }
    }
}

/// Serializable description of a transition system (JSON / RON input).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub states: Vec<String>,
    #[serde(default)]
    pub initial: Option<String>,
    #[serde(default)]
    pub arcs: Vec<ArcSpec>,
    #[serde(default)]
    pub locations: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcSpec {
    pub from: String,
    pub label: String,
    pub to: String,
}

impl TryFrom<TsSpec> for TransitionSystem {
    type Error = TsError;

    fn try_from(spec: TsSpec) -> Result<Self, Self::Error> {
        let mut ts = TransitionSystem {
            name: spec.name,
            ..TransitionSystem::default()
        };
        for state in spec.states {
            ts.add_state(state)?;
        }
        let lookup = |ts: &TransitionSystem, name: &str| {
            ts.state_by_name(name)
                .ok_or_else(|| TsError::UnknownState(name.to_string()))
        };
        if let Some(initial) = spec.initial {
            let id = lookup(&ts, &initial)?;
            ts.set_initial(id);
        }
        for arc in spec.arcs {
            let from = lookup(&ts, &arc.from)?;
            let to = lookup(&ts, &arc.to)?;
            ts.add_arc(from, to, arc.label);
        }
        ts.locations = spec.locations;
        Ok(ts)
    }
}

impl fmt::Display for TransitionSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            writeln!(f, ".name \"{}\"", name)?;
        }
        writeln!(f, ".type LTS")?;
        writeln!(f)?;
        writeln!(f, ".states")?;
        for state in self.states() {
            if Some(state) == self.initial {
                writeln!(f, "{}[initial]", self.state_name(state))?;
            } else {
                writeln!(f, "{}", self.state_name(state))?;
            }
        }
        writeln!(f)?;
        writeln!(f, ".labels")?;
        for label in self.alphabet() {
            writeln!(f, "{}", label)?;
        }
        writeln!(f)?;
        writeln!(f, ".arcs")?;
        for (from, label, to) in self.arcs() {
            writeln!(f, "{} {} {}", self.state_name(from), label, self.state_name(to))?;
        }
        if !self.locations.is_empty() {
            writeln!(f)?;
            writeln!(f, ".locations")?;
            for (event, location) in &self.locations {
                writeln!(f, "{} {}", event, location)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_and_arcs_keep_insertion_order() {
        let mut ts = TransitionSystem::new();
        let s = ts.add_state("s").unwrap();
        let t = ts.add_state("t").unwrap();
        ts.set_initial(s);
        ts.add_arc(s, t, "b");
        ts.add_arc(s, s, "a");
        ts.add_arc(t, s, "b");

        assert_eq!(ts.states().collect::<Vec<_>>(), vec![s, t]);
        assert_eq!(ts.outgoing(s), vec![("b", t), ("a", s)]);
        assert_eq!(
            ts.alphabet().into_iter().collect::<Vec<_>>(),
            vec!["b".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn duplicate_state_names_are_rejected() {
        let mut ts = TransitionSystem::new();
        ts.add_state("s0").unwrap();
        assert!(matches!(ts.add_state("s0"), Err(TsError::DuplicateState(_))));
        // fresh names skip taken ones
        let fresh = ts.create_state();
        assert_eq!(ts.state_name(fresh), "s1");
    }

    #[test]
    fn spec_conversion_resolves_names() {
        let spec = TsSpec {
            name: None,
            states: vec!["s".into(), "t".into()],
            initial: Some("s".into()),
            arcs: vec![ArcSpec {
                from: "s".into(),
                label: "a".into(),
                to: "t".into(),
            }],
            locations: IndexMap::new(),
        };
        let ts = TransitionSystem::try_from(spec.clone()).unwrap();
        assert_eq!(ts.initial(), ts.state_by_name("s"));
        assert_eq!(ts.arc_count(), 1);
        assert_eq!(ts.to_spec(), spec);

        let mut located = spec.clone();
        located.locations.insert("a".into(), "l1".into());
        let json = crate::net::io::to_json_string(&located).unwrap();
        assert_eq!(crate::net::io::from_json_str::<TsSpec>(&json).unwrap(), located);

        let broken = TsSpec {
            initial: Some("x".into()),
            ..spec
        };
        assert!(matches!(
            TransitionSystem::try_from(broken),
            Err(TsError::UnknownState(name)) if name == "x"
        ));
    }
}
