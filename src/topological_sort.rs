//! Topological ordering of a bidirected sequence graph.
//!
//! A bidirected adaptation of Kahn's algorithm that tolerates cycles and
//! reversing edges by breaking into them at seed handles. Ordered maps drive
//! every arbitrary choice so the result is stable across runs.

use std::collections::{BTreeMap, HashSet};

use handlegraph::handle::{Edge, Handle};

use crate::graph_source::GraphSource;

/// All nodes with no edges on their left side, locally forward, in id order.
pub fn head_nodes<G: GraphSource>(graph: &G) -> Vec<Handle> {
    let mut heads = Vec::new();
    graph.for_each_handle(|found| {
        let mut no_left_edges = true;
        graph.follow_edges(found, true, |_| {
            no_left_edges = false;
            false
        });
        if no_left_edges {
            heads.push(found);
        }
        true
    });
    heads.sort_by_key(|h| u64::from(h.id()));
    heads
}

/// All nodes with no edges on their right side, locally forward, in id order.
pub fn tail_nodes<G: GraphSource>(graph: &G) -> Vec<Handle> {
    let mut tails = Vec::new();
    graph.for_each_handle(|found| {
        let mut no_right_edges = true;
        graph.follow_edges(found, false, |_| {
            no_right_edges = false;
            false
        });
        if no_right_edges {
            tails.push(found);
        }
        true
    });
    tails.sort_by_key(|h| u64::from(h.id()));
    tails
}

/// Order and orient every node of the graph. On a DAG this is a topological
/// sort seeded at the head nodes; on cyclic or reversing graphs, edges into
/// already-placed cycle entry points are masked and the walk restarts from
/// remembered seed orientations (or, failing that, the smallest unvisited
/// id, locally forward).
pub fn topological_order<G: GraphSource>(graph: &G) -> Vec<Handle> {
    let mut sorted = Vec::with_capacity(graph.node_count());

    // edges are masked rather than removed; keyed by canonical edge
    let mut masked_edges: HashSet<Edge> = HashSet::new();

    // the set of oriented nodes ready to be emitted
    let mut ready: BTreeMap<u64, Handle> = BTreeMap::new();
    for head in head_nodes(graph) {
        ready.insert(graph.get_id(head), head);
    }

    // first orientation suggested for each node, used to enter cycles
    let mut seeds: BTreeMap<u64, Handle> = BTreeMap::new();

    let mut unvisited: BTreeMap<u64, Handle> = BTreeMap::new();
    graph.for_each_handle(|found| {
        let id = graph.get_id(found);
        if !ready.contains_key(&id) {
            unvisited.insert(id, found);
        }
        true
    });

    while !unvisited.is_empty() || !ready.is_empty() {
        // refill from seeds first; an unused seed is discarded either way
        while ready.is_empty() && !seeds.is_empty() {
            let (seed_id, seed) = seeds.pop_first().expect("seeds non-empty");
            if unvisited.remove(&seed_id).is_some() {
                ready.insert(seed_id, seed);
            }
        }

        if ready.is_empty() {
            // no seed available: take the smallest unvisited node, locally
            // forward
            if let Some((id, handle)) = unvisited.pop_first() {
                ready.insert(id, handle);
            }
        }

        while let Some((_, handle)) = ready.pop_first() {
            sorted.push(handle);

            // a left-side edge to a node that is no longer unvisited points
            // at a cycle entry; mask it so it cannot be walked again
            graph.follow_edges(handle, true, |prev| {
                if !unvisited.contains_key(&graph.get_id(prev)) {
                    masked_edges.insert(graph.edge_handle(prev, handle));
                }
                true
            });

            graph.follow_edges(handle, false, |next| {
                let edge = graph.edge_handle(handle, next);
                if masked_edges.contains(&edge) {
                    return true;
                }
                masked_edges.insert(edge);

                let next_id = graph.get_id(next);
                if unvisited.contains_key(&next_id) {
                    let mut unmasked_incoming = false;
                    graph.follow_edges(next, true, |prev| {
                        if !masked_edges.contains(&graph.edge_handle(prev, next)) {
                            unmasked_incoming = true;
                            return false;
                        }
                        true
                    });

                    if !unmasked_incoming {
                        // the last incoming edge was just masked; the node
                        // is placeable in this orientation
                        ready.insert(next_id, next);
                        unvisited.remove(&next_id);
                    } else {
                        seeds.entry(next_id).or_insert(next);
                    }
                }
                true
            });
        }
    }

    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use handlegraph::handle::NodeId;
    use handlegraph::hashgraph::HashGraph;
    use handlegraph::mutablehandlegraph::*;

    fn build(nodes: &[(u64, &[u8])], edges: &[(u64, bool, u64, bool)]) -> HashGraph {
        let mut graph = HashGraph::new();
        for &(id, seq) in nodes {
            graph.create_handle(seq, NodeId::from(id));
        }
        for &(from, from_rev, to, to_rev) in edges {
            graph.create_edge(Edge(
                Handle::pack(from, from_rev),
                Handle::pack(to, to_rev),
            ));
        }
        graph
    }

    #[test]
    fn test_heads_and_tails_of_a_chain() {
        let graph = build(
            &[(1, b"A"), (2, b"C"), (3, b"G")],
            &[(1, false, 2, false), (2, false, 3, false)],
        );
        assert_eq!(head_nodes(&graph), vec![Handle::pack(1u64, false)]);
        assert_eq!(tail_nodes(&graph), vec![Handle::pack(3u64, false)]);
    }

    #[test]
    fn test_chain_sorts_in_order() {
        let graph = build(
            &[(1, b"A"), (2, b"C"), (3, b"G")],
            &[(1, false, 2, false), (2, false, 3, false)],
        );
        let order = topological_order(&graph);
        assert_eq!(
            order,
            vec![
                Handle::pack(1u64, false),
                Handle::pack(2u64, false),
                Handle::pack(3u64, false),
            ]
        );
    }

    #[test]
    fn test_diamond_emits_every_node_once() {
        let graph = build(
            &[(1, b"A"), (2, b"C"), (3, b"G"), (4, b"T")],
            &[
                (1, false, 2, false),
                (1, false, 3, false),
                (2, false, 4, false),
                (3, false, 4, false),
            ],
        );
        let order = topological_order(&graph);
        assert_eq!(order.len(), 4);
        let ids: Vec<u64> = order.iter().map(|h| u64::from(h.id())).collect();
        assert_eq!(ids[0], 1);
        assert_eq!(ids[3], 4);
        let mut sorted_ids = ids.clone();
        sorted_ids.sort_unstable();
        assert_eq!(sorted_ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_cycle_still_covers_all_nodes() {
        let graph = build(
            &[(1, b"A"), (2, b"C"), (3, b"G")],
            &[
                (1, false, 2, false),
                (2, false, 3, false),
                (3, false, 1, false),
            ],
        );
        let order = topological_order(&graph);
        assert_eq!(order.len(), 3);
        let mut ids: Vec<u64> = order.iter().map(|h| u64::from(h.id())).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_order_is_deterministic() {
        let graph = build(
            &[(1, b"A"), (2, b"C"), (3, b"G"), (4, b"T"), (5, b"TT")],
            &[
                (1, false, 2, false),
                (1, false, 3, true),
                (3, true, 4, false),
                (2, false, 4, false),
                (4, false, 5, false),
                (5, false, 2, false),
            ],
        );
        let first = topological_order(&graph);
        let second = topological_order(&graph);
        assert_eq!(first, second);
    }
}
