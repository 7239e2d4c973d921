//! 可达图构建：从初始标识出发广度优先探索，并可转换为带标签迁移系统。
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

use log::{debug, warn};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use crate::net::structure::Marking;
use crate::net::Net;
use crate::ts::TransitionSystem;

#[derive(Debug, Clone)]
pub struct StateNode {
    pub index: usize,
    pub marking: Marking,
}

#[derive(Debug, Clone, Default)]
pub struct StateGraphConfig {
    /// 最多探索的状态数量. None 表示不设上限.
    pub state_limit: Option<usize>,
}

#[derive(Debug)]
pub struct StateGraph {
    /// Edges carry the label of the fired transition.
    pub graph: StableGraph<StateNode, String>,
    pub initial: NodeIndex,
    pub truncated: bool,
}

impl StateGraph {
    pub fn from_net(net: &Net) -> Self {
        Self::with_config(net, StateGraphConfig::default())
    }

    pub fn with_config(net: &Net, config: StateGraphConfig) -> Self {
        let mut graph = StableGraph::new();
        let mut markings: HashMap<Marking, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::new();
        let mut truncated = false;

        let initial_marking = net.initial_marking();
        let initial = graph.add_node(StateNode {
            index: 0,
            marking: initial_marking.clone(),
        });
        markings.insert(initial_marking, initial);
        queue.push_back(initial);

        while let Some(state) = queue.pop_front() {
            let current = graph[state].marking.clone();
            for transition in net.enabled_transitions(&current) {
                let next = match net.fire_transition(&current, transition) {
                    Ok(next) => next,
                    Err(err) => {
                        warn!("skipping {transition:?} at {current}: {err}");
                        continue;
                    }
                };
                let target = match markings.entry(next) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        if config.state_limit.is_some_and(|limit| graph.node_count() >= limit) {
                            truncated = true;
                            continue;
                        }
                        let index = graph.add_node(StateNode {
                            index: graph.node_count(),
                            marking: entry.key().clone(),
                        });
                        entry.insert(index);
                        queue.push_back(index);
                        index
                    }
                };
                graph.add_edge(state, target, net.transitions[transition].name.clone());
            }
        }

        debug!(
            "reachability graph: {} states, {} edges, truncated: {}",
            graph.node_count(),
            graph.edge_count(),
            truncated
        );

        Self {
            graph,
            initial,
            truncated,
        }
    }

    /// States `s<index>` labeled by transition names; `s0` is initial.
    pub fn to_transition_system(&self) -> TransitionSystem {
        let mut ts = TransitionSystem::new();
        let mut nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        nodes.sort_by_key(|node| self.graph[*node].index);

        let mut states = HashMap::new();
        for node in nodes {
            let state = ts.create_state();
            states.insert(node, state);
        }
        ts.set_initial(states[&self.initial]);
        for edge in self.graph.edge_references() {
            ts.add_arc(
                states[&edge.source()],
                states[&edge.target()],
                edge.weight().clone(),
            );
        }
        ts
    }
}

/// Reachability graph of `net` as a transition system, plus whether the
/// exploration stopped at `limit` states.
pub fn reachability_lts(net: &Net, limit: Option<usize>) -> (TransitionSystem, bool) {
    let graph = StateGraph::with_config(net, StateGraphConfig { state_limit: limit });
    (graph.to_transition_system(), graph.truncated)
}
