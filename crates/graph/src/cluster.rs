use crate::{ChangeGraph, Edge};
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

/// An induced subgraph over one connected component of active nodes.
///
/// Created once by the [`Clusterer`], consumed by exactly one traversal
/// engine run, never mutated afterward. The cluster owns its own copy of
/// every edge between its members.
pub struct Cluster {
    graph: ChangeGraph,
}

impl Cluster {
    fn induced(source: &ChangeGraph, members: &[NodeIndex]) -> Self {
        let mut graph = ChangeGraph::new();
        let mut mapping: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        for &idx in members {
            mapping.insert(idx, graph.add_node(source.node(idx).clone()));
        }
        for &a in members {
            for &b in members {
                if a == b {
                    continue;
                }
                if let (Some(&ca), Some(&cb)) = (mapping.get(&a), mapping.get(&b)) {
                    let edges: Vec<Edge> = source.edges_between(a, b).copied().collect();
                    for edge in edges.into_iter().rev() {
                        graph.add_edge(ca, cb, edge);
                    }
                }
            }
        }
        Self { graph }
    }

    #[must_use]
    pub fn graph(&self) -> &ChangeGraph {
        &self.graph
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}

/// Partitions the active nodes of a built graph into connected components
/// under "any edge exists, either direction, any type" adjacency.
///
/// Inactive nodes are excluded entirely and never placed in a cluster.
pub struct Clusterer {
    clusters: Vec<Cluster>,
}

impl Clusterer {
    #[must_use]
    pub fn new(graph: &ChangeGraph) -> Self {
        let active = graph.active_nodes();

        let mut assignment: HashMap<NodeIndex, usize> = HashMap::new();
        let mut members: HashMap<usize, Vec<NodeIndex>> = HashMap::new();
        let mut next_id = 0usize;

        for &source in &active {
            for &target in &active {
                if source == target || !graph.has_edge_between(source, target) {
                    continue;
                }

                // fresh cluster for the pair, absorbing whatever clusters
                // the endpoints already belonged to
                let merged_id = next_id;
                next_id += 1;

                let mut merged = vec![source, target];
                for endpoint in [source, target] {
                    if let Some(old) = assignment.get(&endpoint).copied() {
                        if let Some(old_members) = members.remove(&old) {
                            merged.extend(old_members);
                        }
                    }
                }
                merged.sort_unstable();
                merged.dedup();

                for &node in &merged {
                    assignment.insert(node, merged_id);
                }
                members.insert(merged_id, merged);
            }
        }

        // every remaining active node is its own singleton cluster
        for &node in &active {
            if !assignment.contains_key(&node) {
                assignment.insert(node, next_id);
                members.insert(next_id, vec![node]);
                next_id += 1;
            }
        }

        let mut ids: Vec<usize> = members.keys().copied().collect();
        ids.sort_unstable();
        let clusters: Vec<Cluster> = ids
            .into_iter()
            .map(|id| Cluster::induced(graph, &members[&id]))
            .collect();

        log::debug!(
            "clustered {} active nodes into {} clusters",
            active.len(),
            clusters.len()
        );
        Self { clusters }
    }

    #[must_use]
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    #[must_use]
    pub fn into_clusters(self) -> Vec<Cluster> {
        self.clusters
    }
}
