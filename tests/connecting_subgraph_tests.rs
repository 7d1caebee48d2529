use std::collections::HashMap;
use std::fs;
use std::io::Write;

use tempfile::NamedTempFile;

use graphslice::{extract_connecting_graph, Pos, Subgraph};
use handlegraph::handle::{Edge, Handle, NodeId};
use handlegraph::hashgraph::HashGraph;
use handlegraph::mutablehandlegraph::*;

fn build_graph(nodes: &[(u64, &[u8])], edges: &[(u64, bool, u64, bool)]) -> HashGraph {
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

#[allow(clippy::too_many_arguments)]
fn extract(
    graph: &HashGraph,
    max_len: i64,
    pos_1: Pos,
    pos_2: Pos,
    include_terminals: bool,
    detect_cycles: bool,
    no_additional_tips: bool,
    only_paths: bool,
    strict_max_len: bool,
) -> (Subgraph, HashMap<u64, u64>) {
    let mut out = Subgraph::new();
    let id_trans = extract_connecting_graph(
        graph,
        &mut out,
        max_len,
        pos_1,
        pos_2,
        include_terminals,
        detect_cycles,
        no_additional_tips,
        only_paths,
        strict_max_len,
    );
    (out, id_trans)
}

fn identity(ids: &[u64]) -> HashMap<u64, u64> {
    ids.iter().map(|&id| (id, id)).collect()
}

#[test]
fn test_linear_chain_between_positions() {
    let graph = build_graph(
        &[(1, b"ACGT"), (2, b"GGGG"), (3, b"TTTT")],
        &[(1, false, 2, false), (2, false, 3, false)],
    );
    let (out, id_trans) = extract(
        &graph,
        20,
        Pos::new(1, false, 1),
        Pos::new(3, false, 2),
        false,
        false,
        false,
        false,
        false,
    );

    assert_eq!(out.node_count(), 3);
    assert_eq!(out.node(1).unwrap().sequence, b"GT");
    assert_eq!(out.node(2).unwrap().sequence, b"GGGG");
    assert_eq!(out.node(3).unwrap().sequence, b"TT");

    assert_eq!(out.edge_count(), 2);
    assert!(out.has_edge(1, 2, false, false));
    assert!(out.has_edge(2, 3, false, false));

    assert_eq!(id_trans, identity(&[1, 2, 3]));
}

#[test]
fn test_distance_bound_excludes_target() {
    let graph = build_graph(
        &[(1, b"ACGT"), (2, b"GGGG"), (3, b"TTTT")],
        &[(1, false, 2, false), (2, false, 3, false)],
    );
    let (out, id_trans) = extract(
        &graph,
        3,
        Pos::new(1, false, 1),
        Pos::new(3, false, 2),
        false,
        false,
        false,
        false,
        false,
    );

    assert!(out.is_empty());
    assert!(id_trans.is_empty());
}

#[test]
fn test_shared_node_between_offsets() {
    let graph = build_graph(&[(1, b"ACGTACGT")], &[]);
    let (out, id_trans) = extract(
        &graph,
        10,
        Pos::new(1, false, 1),
        Pos::new(1, false, 5),
        true,
        false,
        false,
        false,
        false,
    );

    assert_eq!(out.node_count(), 1);
    assert_eq!(out.node(1).unwrap().sequence, b"CGTACG");
    assert_eq!(out.edge_count(), 0);
    assert_eq!(id_trans, identity(&[1]));
}

#[test]
fn test_adjacent_offsets_leave_an_empty_node() {
    // the two positions denote the same boundary between bases, so nothing
    // lies strictly between them
    let graph = build_graph(&[(1, b"ACGT")], &[]);
    let (out, id_trans) = extract(
        &graph,
        10,
        Pos::new(1, false, 1),
        Pos::new(1, false, 2),
        false,
        false,
        false,
        false,
        false,
    );

    assert_eq!(out.node_count(), 1);
    assert_eq!(out.node(1).unwrap().sequence, b"");
    assert_eq!(out.edge_count(), 0);
    assert_eq!(id_trans, identity(&[1]));
}

#[test]
fn test_diamond_recovers_all_walks() {
    let graph = build_graph(
        &[(1, b"A"), (2, b"C"), (3, b"G"), (4, b"T")],
        &[
            (1, false, 2, false),
            (1, false, 3, false),
            (2, false, 4, false),
            (3, false, 4, false),
        ],
    );
    let (out, id_trans) = extract(
        &graph,
        100,
        Pos::new(1, false, 0),
        Pos::new(4, false, 0),
        true,
        false,
        false,
        false,
        false,
    );

    assert_eq!(out.node_count(), 4);
    assert_eq!(out.edge_count(), 4);
    for id in [1, 2, 3, 4] {
        assert!(out.node(id).is_some());
    }
    assert!(out.has_edge(1, 2, false, false));
    assert!(out.has_edge(1, 3, false, false));
    assert!(out.has_edge(2, 4, false, false));
    assert!(out.has_edge(3, 4, false, false));
    assert_eq!(id_trans, identity(&[1, 2, 3, 4]));
}

#[test]
fn test_reverse_strand_endpoints() {
    let graph = build_graph(
        &[(1, b"AAAA"), (2, b"CCCC"), (3, b"GGGG")],
        &[(1, false, 2, false), (2, false, 3, false)],
    );
    // walk the chain against its local orientation
    let (out, id_trans) = extract(
        &graph,
        20,
        Pos::new(3, true, 1),
        Pos::new(1, true, 2),
        false,
        false,
        false,
        false,
        false,
    );

    assert_eq!(out.node_count(), 3);
    assert_eq!(out.node(3).unwrap().sequence, b"GG");
    assert_eq!(out.node(2).unwrap().sequence, b"CCCC");
    assert_eq!(out.node(1).unwrap().sequence, b"AA");
    assert_eq!(out.edge_count(), 2);
    assert!(out.has_edge(1, 2, false, false));
    assert!(out.has_edge(2, 3, false, false));
    assert_eq!(id_trans, identity(&[1, 2, 3]));
}

#[test]
fn test_reversing_edges_emit_each_edge_once() {
    let graph = build_graph(
        &[(1, b"AA"), (2, b"CC"), (3, b"GG")],
        &[
            (1, false, 2, false),
            (1, false, 3, true),
            (3, true, 2, false),
        ],
    );
    let (out, id_trans) = extract(
        &graph,
        100,
        Pos::new(1, false, 0),
        Pos::new(2, false, 1),
        true,
        false,
        false,
        false,
        false,
    );

    assert_eq!(out.node_count(), 3);
    assert_eq!(out.node(1).unwrap().sequence, b"AA");
    assert_eq!(out.node(2).unwrap().sequence, b"CC");
    assert_eq!(out.node(3).unwrap().sequence, b"GG");

    // each bidirected edge appears exactly once, sides encoded explicitly
    assert_eq!(out.edge_count(), 3);
    assert!(out.has_edge(1, 2, false, false));
    assert!(out.has_edge(1, 3, false, true));
    assert!(out.has_edge(2, 3, true, false));

    assert_eq!(id_trans, identity(&[1, 2, 3]));
}

#[test]
fn test_strict_max_len_rejects_too_long_walks() {
    let graph = build_graph(
        &[(1, b"A"), (2, b"C"), (3, b"G"), (4, b"T")],
        &[
            (1, false, 2, false),
            (2, false, 3, false),
            (3, false, 4, false),
        ],
    );
    // the only walk has length 4, over the bound of 3
    let (out, id_trans) = extract(
        &graph,
        3,
        Pos::new(1, false, 0),
        Pos::new(4, false, 0),
        true,
        false,
        false,
        false,
        true,
    );

    assert!(out.is_empty());
    assert!(id_trans.is_empty());
}

#[test]
fn test_strict_max_len_keeps_exact_walks() {
    let graph = build_graph(
        &[(1, b"A"), (2, b"C"), (3, b"G"), (4, b"T")],
        &[
            (1, false, 2, false),
            (2, false, 3, false),
            (3, false, 4, false),
        ],
    );
    let (out, id_trans) = extract(
        &graph,
        4,
        Pos::new(1, false, 0),
        Pos::new(4, false, 0),
        true,
        false,
        false,
        false,
        true,
    );

    assert_eq!(out.node_count(), 4);
    assert_eq!(out.edge_count(), 3);
    assert_eq!(out.node(1).unwrap().sequence, b"A");
    assert_eq!(out.node(4).unwrap().sequence, b"T");
    assert_eq!(id_trans, identity(&[1, 2, 3, 4]));
}

#[test]
fn test_only_paths_prunes_side_branches() {
    let graph = build_graph(
        &[(1, b"A"), (2, b"C"), (3, b"G"), (5, b"T")],
        &[
            (1, false, 2, false),
            (2, false, 3, false),
            (2, false, 5, false),
        ],
    );

    // without pruning, the search keeps the dead-end branch it explored
    let (out, _) = extract(
        &graph,
        100,
        Pos::new(1, false, 0),
        Pos::new(3, false, 0),
        true,
        false,
        false,
        false,
        false,
    );
    assert!(out.node(5).is_some());
    assert!(out.has_edge(2, 5, false, false));

    let (out, id_trans) = extract(
        &graph,
        100,
        Pos::new(1, false, 0),
        Pos::new(3, false, 0),
        true,
        false,
        false,
        true,
        false,
    );
    assert_eq!(out.node_count(), 3);
    assert!(out.node(5).is_none());
    assert_eq!(out.edge_count(), 2);
    assert_eq!(id_trans, identity(&[1, 2, 3]));
}

#[test]
fn test_no_additional_tips_prunes_dead_ends() {
    let graph = build_graph(
        &[(1, b"A"), (2, b"C"), (3, b"G"), (5, b"T")],
        &[
            (1, false, 2, false),
            (2, false, 3, false),
            (2, false, 5, false),
        ],
    );
    let (out, id_trans) = extract(
        &graph,
        100,
        Pos::new(1, false, 0),
        Pos::new(3, false, 0),
        true,
        false,
        true,
        false,
        false,
    );

    assert_eq!(out.node_count(), 3);
    assert!(out.node(5).is_none());
    assert_eq!(out.edge_count(), 2);
    assert!(out.has_edge(1, 2, false, false));
    assert!(out.has_edge(2, 3, false, false));
    assert_eq!(id_trans, identity(&[1, 2, 3]));
}

#[test]
fn test_extraction_is_deterministic() {
    let graph = build_graph(
        &[(1, b"AC"), (2, b"GT"), (3, b"CA"), (4, b"TG"), (5, b"AA")],
        &[
            (1, false, 2, false),
            (1, false, 3, false),
            (2, false, 4, false),
            (3, false, 4, false),
            (2, false, 5, false),
            (5, false, 4, false),
        ],
    );

    let (first_out, first_trans) = extract(
        &graph,
        50,
        Pos::new(1, false, 0),
        Pos::new(4, false, 1),
        true,
        false,
        false,
        false,
        false,
    );
    let (second_out, second_trans) = extract(
        &graph,
        50,
        Pos::new(1, false, 0),
        Pos::new(4, false, 1),
        true,
        false,
        false,
        false,
        false,
    );

    assert_eq!(first_out.nodes, second_out.nodes);
    assert_eq!(first_out.edges, second_out.edges);
    assert_eq!(first_trans, second_trans);
}

#[test]
fn test_gfa_round_trip_through_file() {
    let graph = build_graph(
        &[(1, b"ACGT"), (2, b"GGGG"), (3, b"TTTT")],
        &[(1, false, 2, false), (2, false, 3, false)],
    );
    let (out, _) = extract(
        &graph,
        20,
        Pos::new(1, false, 1),
        Pos::new(3, false, 2),
        false,
        false,
        false,
        false,
        false,
    );

    let mut file = NamedTempFile::new().unwrap();
    out.write_gfa(&mut file).unwrap();
    file.flush().unwrap();

    let text = fs::read_to_string(file.path()).unwrap();
    let segments = text.lines().filter(|l| l.starts_with('S')).count();
    let links = text.lines().filter(|l| l.starts_with('L')).count();
    assert_eq!(segments, out.node_count());
    assert_eq!(links, out.edge_count());
    assert!(text.contains("S\t2\tGGGG"));
    assert!(text.contains("L\t1\t+\t2\t+\t0M"));
}

#[test]
#[should_panic(expected = "empty graph")]
fn test_extracting_into_used_graph_panics() {
    let graph = build_graph(&[(1, b"ACGT")], &[]);
    let mut out = Subgraph::new();
    out.add_node(99, b"A".to_vec());
    extract_connecting_graph(
        &graph,
        &mut out,
        10,
        Pos::new(1, false, 0),
        Pos::new(1, false, 2),
        false,
        false,
        false,
        false,
        false,
    );
}
