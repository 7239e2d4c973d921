//! 迁移系统同构判定：只比较从初始状态可达的部分，初始状态必须互相对应。
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use petgraph::algo::is_isomorphic_matching;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::ts::{StateId, TransitionSystem};

/// Reachable part of `ts` with parallel arcs folded into one edge carrying
/// the sorted label set. Node weight marks the initial state.
fn reachable_graph(ts: &TransitionSystem) -> DiGraph<bool, Vec<String>> {
    let mut graph = DiGraph::new();
    let Some(initial) = ts.initial() else {
        return graph;
    };

    let mut nodes: HashMap<StateId, NodeIndex> = HashMap::new();
    let mut labels: BTreeMap<(NodeIndex, NodeIndex), BTreeSet<String>> = BTreeMap::new();
    let mut queue = VecDeque::from([initial]);
    nodes.insert(initial, graph.add_node(true));

    while let Some(state) = queue.pop_front() {
        let from = nodes[&state];
        for (label, target) in ts.outgoing(state) {
            let to = *nodes.entry(target).or_insert_with(|| {
                queue.push_back(target);
                graph.add_node(false)
            });
            labels
                .entry((from, to))
                .or_default()
                .insert(label.to_string());
        }
    }

    for ((from, to), set) in labels {
        graph.add_edge(from, to, set.into_iter().collect());
    }
    graph
}

/// Whether the reachable parts of `left` and `right` are isomorphic as
/// labeled transition systems.
pub fn is_isomorphic(left: &TransitionSystem, right: &TransitionSystem) -> bool {
    let left = reachable_graph(left);
    let right = reachable_graph(right);
    if left.node_count() != right.node_count() || left.edge_count() != right.edge_count() {
        return false;
    }
    is_isomorphic_matching(&left, &right, |a, b| a == b, |a, b| a == b)
}
