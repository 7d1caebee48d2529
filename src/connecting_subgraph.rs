//! Extraction of the subgraph connecting two oriented positions.
//!
//! The extractor walks the source graph outward from the first position,
//! keeps every node and edge that can lie on a sufficiently short walk to the
//! second position, then reshapes the endpoint nodes so both positions become
//! tips of the result. Cycles through the endpoint nodes can optionally be
//! preserved by duplicating those nodes before the cut, and three pruning
//! modes trim material that is not on any qualifying walk.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};

use handlegraph::handle::{Edge, Handle};

use crate::filtered_queue::FilteredPriorityQueue;
use crate::graph_source::{handle_key, GraphSource};
use crate::local_graph::{trimmed_seq_left, trimmed_seq_right, LocalGraph, LocalNode};
use crate::pos::Pos;
use crate::subgraph::Subgraph;

/// Structural relationship of the two endpoint positions when they share a
/// node. The cases are disjoint and drive the duplication and cutting phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Colocation {
    SeparateNodes,
    SharedNodeReachable,
    SharedNodeUnreachable,
    SharedNodeReverse,
}

fn classify_colocation(pos_1: Pos, pos_2: Pos, include_terminal_positions: bool) -> Colocation {
    if pos_1.id() != pos_2.id() {
        Colocation::SeparateNodes
    } else if pos_1.is_rev() != pos_2.is_rev() {
        Colocation::SharedNodeReverse
    } else if pos_1.offset() < pos_2.offset() + include_terminal_positions as usize {
        Colocation::SharedNodeReachable
    } else {
        Colocation::SharedNodeUnreachable
    }
}

/// A source-graph handle queued with the distance from the start position to
/// the far end of the node it traverses. Ordered so a `BinaryHeap` pops the
/// smallest distance; ties break on the handle to keep runs deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Traversal {
    dist: i64,
    handle: Handle,
}

impl Traversal {
    fn new(handle: Handle, dist: i64) -> Self {
        Traversal { dist, handle }
    }
}

impl Ord for Traversal {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.dist, handle_key(other.handle)).cmp(&(self.dist, handle_key(self.handle)))
    }
}

impl PartialOrd for Traversal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Same as `Traversal`, over the working graph once handles are no longer
/// needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LocalTraversal {
    dist: i64,
    id: u64,
    rev: bool,
}

impl LocalTraversal {
    fn new(id: u64, rev: bool, dist: i64) -> Self {
        LocalTraversal { dist, id, rev }
    }
}

impl Ord for LocalTraversal {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.dist, other.id, other.rev).cmp(&(self.dist, self.id, self.rev))
    }
}

impl PartialOrd for LocalTraversal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Extract the subgraph of `source` connecting `pos_1` to `pos_2` into
/// `out`, returning a translator from output node ids back to source node
/// ids.
///
/// Every walk from `pos_1` to `pos_2` of sequence length at most `max_len`
/// is preserved, and the two positions become tips of the output. With
/// `include_terminal_positions` the bases under the positions themselves are
/// kept. `detect_terminal_cycles` duplicates the endpoint nodes as needed so
/// cycles through them survive the tip cut. At most one pruning mode applies:
/// `strict_max_len` keeps only material on walks within `max_len`,
/// `only_paths` keeps only material on some endpoint-to-endpoint walk, and
/// `no_additional_tips` iteratively removes tips other than the endpoints.
/// When several are set the strongest (`strict_max_len` first, then
/// `only_paths`) wins.
///
/// If no walk within `max_len` exists the output graph is left empty and the
/// translator is empty.
///
/// # Panics
///
/// Panics if `out` is not empty; extraction into a used graph is a
/// programming error.
#[allow(clippy::too_many_arguments)]
pub fn extract_connecting_graph<G: GraphSource>(
    source: &G,
    out: &mut Subgraph,
    max_len: i64,
    pos_1: Pos,
    pos_2: Pos,
    include_terminal_positions: bool,
    detect_terminal_cycles: bool,
    no_additional_tips: bool,
    only_paths: bool,
    strict_max_len: bool,
) -> HashMap<u64, u64> {
    assert!(
        out.is_empty(),
        "extract_connecting_graph: must extract into an empty graph"
    );

    let colocation = classify_colocation(pos_1, pos_2, include_terminal_positions);

    let mut extraction = Extraction {
        source,
        max_len,
        pos_1,
        pos_2,
        include_terminal_positions,
        detect_terminal_cycles,
        colocation,
        graph: LocalGraph::new(),
        observed_edges: HashSet::new(),
        id_trans: HashMap::new(),
        max_id: pos_1.id().max(pos_2.id()),
        next_id: 0,
        duplicate_node_1: None,
        duplicate_node_2: None,
    };

    // seed the working graph with the endpoint nodes, forward-oriented
    extraction.graph.insert(
        pos_1.id(),
        LocalNode::new(source.get_sequence(source.get_handle(pos_1.id(), false))),
    );
    if pos_2.id() != pos_1.id() {
        extraction.graph.insert(
            pos_2.id(),
            LocalNode::new(source.get_sequence(source.get_handle(pos_2.id(), false))),
        );
    }

    if !extraction.forward_search() {
        // no path between the positions under the maximum distance
        return HashMap::new();
    }

    extraction.backward_search();
    extraction.next_id = extraction.max_id + 1;

    if detect_terminal_cycles {
        extraction.duplicate_terminal_cycles();
    }

    extraction.cut_nodes();

    if strict_max_len {
        extraction.prune_strict_max_len();
    } else if only_paths {
        extraction.prune_only_paths();
    } else if no_additional_tips {
        extraction.prune_extra_tips();
    }

    extraction.emit(out);
    extraction.id_trans
}

struct Extraction<'a, G: GraphSource> {
    source: &'a G,
    max_len: i64,
    pos_1: Pos,
    pos_2: Pos,
    include_terminal_positions: bool,
    detect_terminal_cycles: bool,
    colocation: Colocation,
    graph: LocalGraph,
    observed_edges: HashSet<Edge>,
    id_trans: HashMap<u64, u64>,
    max_id: u64,
    next_id: u64,
    duplicate_node_1: Option<u64>,
    duplicate_node_2: Option<u64>,
}

impl<'a, G: GraphSource> Extraction<'a, G> {
    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Distance from `pos_1` to the far end of its node, before any
    /// trimming.
    fn first_traversal_length(&self) -> i64 {
        self.graph.sequence_len(self.pos_1.id()) - self.pos_1.offset() as i64
    }

    /// Dijkstra sweep of the source graph from `start`, recording every
    /// discovered node and canonical edge into the working graph. Handles in
    /// `skip` are never queued, so the walk does not continue through them.
    /// Returns whether the oriented handle of `pos_2` was reached.
    fn search(
        &mut self,
        start: Handle,
        start_dist: i64,
        budget: i64,
        skip: &HashSet<Handle>,
        watch_for_target: bool,
    ) -> bool {
        let source = self.source;
        let target = (self.pos_2.id(), self.pos_2.is_rev());
        let mut found_target = false;

        let mut queue = FilteredPriorityQueue::new(|trav: &Traversal| trav.handle);
        if start_dist <= budget {
            queue.push(Traversal::new(start, start_dist));
        }

        while let Some(trav) = queue.pop() {
            let trav_id = source.get_id(trav.handle);
            let trav_rev = source.get_is_reverse(trav.handle);
            source.follow_edges(trav.handle, false, |next| {
                let next_id = source.get_id(next);
                let next_rev = source.get_is_reverse(next);

                if watch_for_target && (next_id, next_rev) == target {
                    found_target = true;
                }
                self.max_id = self.max_id.max(next_id);

                if !self.graph.contains(next_id) {
                    let forward_seq = source.get_sequence(source.forward(next));
                    self.graph.insert(next_id, LocalNode::new(forward_seq));
                }

                // distance to the far end of the neighbor
                let dist_thru = trav.dist + self.graph.sequence_len(next_id);
                if !skip.contains(&next) && dist_thru <= budget {
                    queue.push(Traversal::new(next, dist_thru));
                }

                let canonical = source.edge_handle(trav.handle, next);
                if self.observed_edges.insert(canonical) {
                    self.graph.record_edge(trav_id, trav_rev, next_id, next_rev);
                }
                true
            });
        }
        found_target
    }

    /// Phase 1: search outward from `pos_1` within the forward budget.
    fn forward_search(&mut self) -> bool {
        if self.colocation == Colocation::SharedNodeReachable {
            // both positions sit on the same strand of one node; reachability
            // is a matter of arithmetic, not search
            return self.pos_2.offset() as i64 - self.pos_1.offset() as i64 <= self.max_len;
        }

        let forward_max_len = self.max_len - self.pos_2.offset() as i64;
        let mut skip = HashSet::new();
        skip.insert(
            self.source
                .get_handle(self.pos_1.id(), self.pos_1.is_rev()),
        );
        // the target is also a dead end for the walk, unless exploring
        // through it is the only way to find its own cycles
        if !(self.colocation == Colocation::SharedNodeReverse && self.detect_terminal_cycles) {
            skip.insert(
                self.source
                    .get_handle(self.pos_2.id(), self.pos_2.is_rev()),
            );
        }

        let start = self
            .source
            .get_handle(self.pos_1.id(), self.pos_1.is_rev());
        let start_dist = self.first_traversal_length();
        self.search(start, start_dist, forward_max_len, &skip, true)
    }

    /// Phase 2: search backward from `pos_2` to pick up cycles touching the
    /// terminal node. Skipped when the backward walk could only retread the
    /// forward one or when every path is already cyclical.
    fn backward_search(&mut self) {
        if !(self.detect_terminal_cycles
            && matches!(
                self.colocation,
                Colocation::SeparateNodes | Colocation::SharedNodeReachable
            ))
        {
            return;
        }

        let backward_max_len = self.max_len - self.first_traversal_length();
        let start = self
            .source
            .get_handle(self.pos_2.id(), !self.pos_2.is_rev());
        let mut skip = HashSet::new();
        skip.insert(start);
        skip.insert(
            self.source
                .get_handle(self.pos_1.id(), !self.pos_1.is_rev()),
        );

        let start_dist = self.pos_2.offset() as i64;
        self.search(start, start_dist, backward_max_len, &skip, false);
    }

    /// Phase 3: duplicate endpoint nodes so cycles through them survive the
    /// cutting phase. An endpoint is in a cycle iff edges were traversed off
    /// both of its sides.
    fn duplicate_terminal_cycles(&mut self) {
        let in_cycle = |graph: &LocalGraph, id: u64| {
            let node = graph.node(id);
            !(node.edges_left.is_empty() || node.edges_right.is_empty())
        };
        let in_cycle_1 = in_cycle(&self.graph, self.pos_1.id());
        let in_cycle_2 = in_cycle(&self.graph, self.pos_2.id());

        match self.colocation {
            Colocation::SeparateNodes => {
                let (rev_1, rev_2) = (self.pos_1.is_rev(), self.pos_2.is_rev());
                if in_cycle_1 {
                    self.duplicate_separate_node(self.pos_1.id(), !rev_1, rev_1);
                }
                if in_cycle_2 {
                    self.duplicate_separate_node(self.pos_2.id(), rev_2, !rev_2);
                }
            }
            Colocation::SharedNodeReachable => {
                if in_cycle_1 {
                    self.duplicate_shared_reachable();
                }
            }
            // always duplicated: cycles passing all the way through the node
            // must be representable for the distance filter to judge them
            Colocation::SharedNodeUnreachable => self.duplicate_shared_unreachable(),
            Colocation::SharedNodeReverse => {
                if in_cycle_1 {
                    self.duplicate_shared_reverse();
                }
            }
        }
    }

    /// Clone one endpoint node of the `SeparateNodes` case. Reversing
    /// self-loops move onto the clone with a reversing connection back to the
    /// original; a non-reversing self-loop is bridged between original and
    /// clone so a cyclic path remains. The bridge sides differ between the
    /// source-side and sink-side endpoint, so they are passed in.
    fn duplicate_separate_node(
        &mut self,
        node_id: u64,
        clone_bridge_left: bool,
        original_bridge_left: bool,
    ) {
        let new_id = self.alloc_id();
        let sequence = self.graph.node(node_id).sequence.clone();
        self.graph.insert(new_id, LocalNode::new(sequence));

        let mut add_looping_connection = false;

        let edges_right = self.graph.take_side(node_id, false);
        let mut kept_right = Vec::with_capacity(edges_right.len());
        for (nbr, reversing) in edges_right {
            if nbr == node_id && reversing {
                // reversing self-loop: moves onto the clone, connected back
                kept_right.push((new_id, true));
                self.graph.push_side(new_id, false, (node_id, true));
                self.graph.push_side(new_id, false, (new_id, true));
            } else if nbr == node_id {
                // non-reversing self-loop: clone gets its own copy, bridge
                // added after the side loops
                add_looping_connection = true;
                kept_right.push((nbr, reversing));
                self.graph.push_side(new_id, false, (new_id, reversing));
                self.graph.push_side(new_id, true, (new_id, reversing));
            } else {
                kept_right.push((nbr, reversing));
                self.graph.push_side(nbr, !reversing, (new_id, reversing));
                self.graph.push_side(new_id, false, (nbr, reversing));
            }
        }
        *self.graph.side_mut(node_id, false) = kept_right;

        let edges_left = self.graph.take_side(node_id, true);
        let mut kept_left = Vec::with_capacity(edges_left.len());
        for (nbr, reversing) in edges_left {
            if nbr == node_id && reversing {
                kept_left.push((new_id, true));
                self.graph.push_side(new_id, true, (node_id, true));
                self.graph.push_side(new_id, true, (new_id, true));
            } else if nbr == node_id {
                // mirror of the non-reversing self-loop, already handled
                kept_left.push((nbr, reversing));
            } else {
                kept_left.push((nbr, reversing));
                self.graph.push_side(nbr, reversing, (new_id, reversing));
                self.graph.push_side(new_id, true, (nbr, reversing));
            }
        }
        *self.graph.side_mut(node_id, true) = kept_left;

        if add_looping_connection {
            self.graph
                .push_side(new_id, clone_bridge_left, (node_id, false));
            self.graph
                .push_side(node_id, original_bridge_left, (new_id, false));
        }

        self.id_trans.insert(new_id, node_id);
    }

    /// `SharedNodeReachable` duplication: split the shared node into a
    /// righthand piece holding the edges the traversal leaves by, a lefthand
    /// piece holding the edges it arrives by, and a full-length cycle piece
    /// bridging the two.
    fn duplicate_shared_reachable(&mut self) {
        let id = self.pos_1.id();
        let rev = self.pos_1.is_rev();
        let keep = self.include_terminal_positions;
        let full_seq = self.graph.node(id).sequence.clone();

        // righthand piece takes the edges out of the side the traversal
        // leaves
        let righthand_id = self.alloc_id();
        self.graph.insert(
            righthand_id,
            LocalNode::new(trimmed_seq_right(&full_seq, self.pos_1.offset(), rev, keep)),
        );
        let moved_out = self.graph.take_side(id, rev);
        let mut righthand_edges = Vec::with_capacity(moved_out.len());
        for (nbr, reversing) in moved_out {
            if nbr == id && reversing {
                // reversing self-loop: point it at the new piece; edges to
                // the not-yet-made lefthand piece keep the old id for now
                righthand_edges.push((righthand_id, reversing));
            } else {
                righthand_edges.push((nbr, reversing));
                self.graph
                    .rewrite_side_entry(nbr, rev == reversing, (id, reversing), righthand_id);
            }
        }
        *self.graph.side_mut(righthand_id, rev) = righthand_edges;
        self.id_trans.insert(righthand_id, id);

        // lefthand piece takes the edges out of the arriving side
        let lefthand_id = self.alloc_id();
        self.graph.insert(
            lefthand_id,
            LocalNode::new(trimmed_seq_left(
                &full_seq,
                self.pos_2.offset(),
                self.pos_2.is_rev(),
                keep,
            )),
        );
        let moved_in = self.graph.take_side(id, !rev);
        let mut lefthand_edges = Vec::with_capacity(moved_in.len());
        for (mut nbr, reversing) in moved_in {
            if nbr == id {
                // only reversing self-loops still name the old id; the
                // non-reversing ones were rewritten to the righthand piece
                nbr = lefthand_id;
            }
            if !(nbr == lefthand_id && reversing) {
                self.graph
                    .rewrite_side_entry(nbr, rev != reversing, (id, reversing), lefthand_id);
            }
            lefthand_edges.push((nbr, reversing));
        }
        *self.graph.side_mut(lefthand_id, !rev) = lefthand_edges;
        self.id_trans.insert(lefthand_id, id);

        // the cycle piece is a full copy of the node bridging the two pieces
        let cycle_id = self.alloc_id();
        self.graph.insert(cycle_id, LocalNode::new(full_seq));

        let mut add_looping_connection = false;

        let righthand_edges = self.graph.side(righthand_id, rev).clone();
        let mut updated_righthand = Vec::with_capacity(righthand_edges.len());
        for (nbr, reversing) in righthand_edges {
            if nbr == righthand_id {
                // reversing self-loop moves onto the cycle piece
                updated_righthand.push((cycle_id, reversing));
                self.graph.push_side(cycle_id, rev, (righthand_id, reversing));
                self.graph.push_side(cycle_id, rev, (cycle_id, reversing));
            } else if nbr == lefthand_id {
                add_looping_connection = true;
                updated_righthand.push((nbr, reversing));
            } else {
                updated_righthand.push((nbr, reversing));
                self.graph
                    .push_side(nbr, rev == reversing, (cycle_id, reversing));
                self.graph.push_side(cycle_id, rev, (nbr, reversing));
            }
        }
        *self.graph.side_mut(righthand_id, rev) = updated_righthand;

        let lefthand_edges = self.graph.side(lefthand_id, !rev).clone();
        let mut updated_lefthand = Vec::with_capacity(lefthand_edges.len());
        for (nbr, reversing) in lefthand_edges {
            if nbr == lefthand_id {
                updated_lefthand.push((cycle_id, reversing));
                self.graph.push_side(cycle_id, !rev, (lefthand_id, reversing));
                self.graph.push_side(cycle_id, !rev, (cycle_id, reversing));
            } else if nbr != righthand_id {
                updated_lefthand.push((nbr, reversing));
                self.graph
                    .push_side(nbr, rev != reversing, (cycle_id, reversing));
                self.graph.push_side(cycle_id, !rev, (nbr, reversing));
            } else {
                updated_lefthand.push((nbr, reversing));
            }
        }
        *self.graph.side_mut(lefthand_id, !rev) = updated_lefthand;

        if add_looping_connection {
            // righthand into the cycle piece, cycle piece into lefthand, and
            // the loop itself on the cycle piece only
            self.graph.push_side(righthand_id, rev, (cycle_id, false));
            self.graph.push_side(cycle_id, !rev, (righthand_id, false));
            self.graph.push_side(lefthand_id, !rev, (cycle_id, false));
            self.graph.push_side(cycle_id, rev, (lefthand_id, false));
            self.graph.push_side(cycle_id, rev, (cycle_id, false));
            self.graph.push_side(cycle_id, !rev, (cycle_id, false));
        }

        self.id_trans.insert(cycle_id, id);
        self.duplicate_node_1 = Some(righthand_id);
        self.duplicate_node_2 = Some(lefthand_id);
    }

    /// `SharedNodeUnreachable` duplication: every endpoint-to-endpoint path
    /// is cyclical, so clone the node once; the distance filter decides later
    /// which of the resulting paths are short enough.
    fn duplicate_shared_unreachable(&mut self) {
        let id = self.pos_1.id();
        let rev = self.pos_1.is_rev();
        let new_id = self.alloc_id();
        let sequence = self.graph.node(id).sequence.clone();
        self.graph.insert(new_id, LocalNode::new(sequence));

        // the side the pos_1 traversal leaves by, and the one it enters by
        let out_left = rev;
        let in_left = !rev;

        let mut add_looping_connection = false;

        let old_outgoing = self.graph.take_side(id, out_left);
        let mut kept_out = Vec::with_capacity(old_outgoing.len());
        for (nbr, reversing) in old_outgoing {
            if nbr == id && reversing {
                kept_out.push((new_id, true));
                self.graph.push_side(new_id, out_left, (id, true));
                self.graph.push_side(new_id, out_left, (new_id, true));
            } else if nbr == id {
                add_looping_connection = true;
                kept_out.push((nbr, reversing));
            } else {
                kept_out.push((nbr, reversing));
                self.graph
                    .push_side(nbr, rev == reversing, (new_id, reversing));
                self.graph.push_side(new_id, out_left, (nbr, reversing));
            }
        }
        *self.graph.side_mut(id, out_left) = kept_out;

        let old_incoming = self.graph.take_side(id, in_left);
        let mut kept_in = Vec::with_capacity(old_incoming.len());
        for (nbr, reversing) in old_incoming {
            if nbr == id && reversing {
                kept_in.push((new_id, true));
                self.graph.push_side(new_id, in_left, (id, true));
                self.graph.push_side(new_id, in_left, (new_id, true));
            } else if nbr == id {
                kept_in.push((nbr, reversing));
            } else {
                kept_in.push((nbr, reversing));
                self.graph
                    .push_side(nbr, rev != reversing, (new_id, reversing));
                self.graph.push_side(new_id, in_left, (nbr, reversing));
            }
        }
        *self.graph.side_mut(id, in_left) = kept_in;

        if add_looping_connection {
            // original into clone, clone into original, and the loop itself
            // on the clone
            self.graph.push_side(id, out_left, (new_id, false));
            self.graph.push_side(new_id, in_left, (id, false));
            self.graph.push_side(id, in_left, (new_id, false));
            self.graph.push_side(new_id, out_left, (id, false));
            self.graph.push_side(new_id, out_left, (new_id, false));
            self.graph.push_side(new_id, in_left, (new_id, false));
        }

        self.id_trans.insert(new_id, id);
    }

    /// `SharedNodeReverse` duplication: clone the node once; self-loops are
    /// re-expressed as bridges between original and clone so that strand-
    /// flipping cycles remain representable.
    fn duplicate_shared_reverse(&mut self) {
        let id = self.pos_1.id();
        let rev = self.pos_1.is_rev();
        let new_id = self.alloc_id();
        let sequence = self.graph.node(id).sequence.clone();
        self.graph.insert(new_id, LocalNode::new(sequence));

        let out_left = rev;
        let in_left = !rev;

        let mut add_reversing_connection = false;
        let mut add_looping_connection = false;

        let old_outgoing = self.graph.take_side(id, out_left);
        let mut kept_out = Vec::with_capacity(old_outgoing.len());
        for (nbr, reversing) in old_outgoing {
            if nbr == id && reversing {
                add_reversing_connection = true;
                kept_out.push((nbr, reversing));
            } else if nbr == id {
                add_looping_connection = true;
                kept_out.push((nbr, reversing));
            } else {
                kept_out.push((nbr, reversing));
                self.graph
                    .push_side(nbr, rev == reversing, (new_id, reversing));
                self.graph.push_side(new_id, out_left, (nbr, reversing));
            }
        }
        *self.graph.side_mut(id, out_left) = kept_out;

        let old_incoming = self.graph.take_side(id, in_left);
        let mut kept_in = Vec::with_capacity(old_incoming.len());
        for (nbr, reversing) in old_incoming {
            if nbr == id && reversing {
                // incoming-side reversing self-loop: the clone gets its own
                kept_in.push((nbr, reversing));
                self.graph.push_side(new_id, in_left, (new_id, reversing));
            } else if nbr == id {
                kept_in.push((nbr, reversing));
            } else {
                kept_in.push((nbr, reversing));
                self.graph
                    .push_side(nbr, rev != reversing, (new_id, reversing));
                self.graph.push_side(new_id, in_left, (nbr, reversing));
            }
        }
        *self.graph.side_mut(id, in_left) = kept_in;

        if add_reversing_connection {
            self.graph.push_side(id, out_left, (new_id, true));
            self.graph.push_side(new_id, out_left, (id, true));
            self.graph.push_side(new_id, out_left, (new_id, true));
        }
        if add_looping_connection {
            self.graph.push_side(id, out_left, (new_id, false));
            self.graph.push_side(new_id, in_left, (id, false));
            self.graph.push_side(new_id, out_left, (new_id, false));
            self.graph.push_side(new_id, in_left, (new_id, false));
        }

        self.id_trans.insert(new_id, id);
    }

    /// Phase 4: trim the endpoint nodes to the positions and strip their
    /// outward edges so both positions become tips.
    fn cut_nodes(&mut self) {
        match self.colocation {
            Colocation::SeparateNodes => self.cut_separate_nodes(),
            Colocation::SharedNodeReachable => self.cut_shared_reachable(),
            Colocation::SharedNodeUnreachable => self.cut_shared_unreachable(),
            Colocation::SharedNodeReverse => self.cut_shared_reverse(),
        }
    }

    fn cut_separate_nodes(&mut self) {
        let (id_1, rev_1, off_1) = (self.pos_1.id(), self.pos_1.is_rev(), self.pos_1.offset());
        let (id_2, rev_2, off_2) = (self.pos_2.id(), self.pos_2.is_rev(), self.pos_2.offset());
        let keep = self.include_terminal_positions;

        // the side behind pos_1 and the side past pos_2 face away from the
        // partner; everything attached there goes
        let outward_1 = self.graph.take_side(id_1, !rev_1);
        for (nbr, reversing) in outward_1 {
            if !(nbr == id_1 && reversing) {
                self.graph
                    .remove_side_entry(nbr, rev_1 != reversing, (id_1, reversing));
            }
        }
        let outward_2 = self.graph.take_side(id_2, rev_2);
        for (nbr, reversing) in outward_2 {
            if !(nbr == id_2 && reversing) {
                self.graph
                    .remove_side_entry(nbr, rev_2 == reversing, (id_2, reversing));
            }
        }

        let trimmed_1 = trimmed_seq_right(&self.graph.node(id_1).sequence, off_1, rev_1, keep);
        self.graph.node_mut(id_1).sequence = trimmed_1;
        let trimmed_2 = trimmed_seq_left(&self.graph.node(id_2).sequence, off_2, rev_2, keep);
        self.graph.node_mut(id_2).sequence = trimmed_2;
    }

    fn cut_shared_reachable(&mut self) {
        let id = self.pos_1.id();
        let rev = self.pos_1.is_rev();
        let (off_1, off_2) = (self.pos_1.offset(), self.pos_2.offset());
        let keep = self.include_terminal_positions as usize;

        // duplication has already preserved any cycles elsewhere; both sides
        // are stripped wholesale
        let edges_right = self.graph.take_side(id, false);
        for (nbr, reversing) in edges_right {
            if !(nbr == id && reversing) {
                self.graph
                    .remove_side_entry(nbr, rev != reversing, (id, reversing));
            }
        }
        let edges_left = self.graph.take_side(id, true);
        for (nbr, reversing) in edges_left {
            if !(nbr == id && reversing) {
                self.graph
                    .remove_side_entry(nbr, rev == reversing, (id, reversing));
            }
        }

        // keep the substring strictly between the two offsets, widened by
        // the terminal bases when they are included
        let node = self.graph.node_mut(id);
        let len = off_2 + 2 * keep - off_1 - 1;
        let start = if rev {
            node.sequence.len() - off_2 - keep
        } else {
            off_1 + 1 - keep
        };
        node.sequence = node.sequence[start..start + len].to_vec();
    }

    fn cut_shared_unreachable(&mut self) {
        let id = self.pos_1.id();
        let keep = self.include_terminal_positions;
        let new_id = self.alloc_id();
        let sequence = self.graph.node(id).sequence.clone();
        self.graph.insert(new_id, LocalNode::new(sequence));

        // move the right-side edges onto the new node and relabel the
        // references pointing back into that side
        let moved = self.graph.take_side(id, false);
        for &(nbr, reversing) in &moved {
            let edges = self.graph.side_mut(nbr, !reversing);
            for edge in edges.iter_mut() {
                if edge.0 == id {
                    edge.0 = new_id;
                    break;
                }
            }
        }
        *self.graph.side_mut(new_id, false) = moved;

        // one half serves each position; which one depends on strand
        self.id_trans.insert(new_id, id);
        if self.pos_1.is_rev() {
            self.pos_2.set_id(new_id);
            let trimmed = trimmed_seq_right(
                &self.graph.node(id).sequence,
                self.pos_1.offset(),
                true,
                keep,
            );
            self.graph.node_mut(id).sequence = trimmed;
            let trimmed = trimmed_seq_left(
                &self.graph.node(new_id).sequence,
                self.pos_2.offset(),
                true,
                keep,
            );
            self.graph.node_mut(new_id).sequence = trimmed;
        } else {
            self.pos_1.set_id(new_id);
            let trimmed = trimmed_seq_right(
                &self.graph.node(new_id).sequence,
                self.pos_1.offset(),
                false,
                keep,
            );
            self.graph.node_mut(new_id).sequence = trimmed;
            let trimmed = trimmed_seq_left(
                &self.graph.node(id).sequence,
                self.pos_2.offset(),
                false,
                keep,
            );
            self.graph.node_mut(id).sequence = trimmed;
        }
    }

    fn cut_shared_reverse(&mut self) {
        let id = self.pos_1.id();
        let rev = self.pos_1.is_rev();
        let keep = self.include_terminal_positions;

        // strip the side the traversal arrives by
        let incoming = self.graph.take_side(id, !rev);
        for (nbr, reversing) in incoming {
            if !(nbr == id && reversing) {
                self.graph
                    .remove_side_entry(nbr, rev != reversing, (id, reversing));
            }
        }

        // clone the node into a sink holding a copy of the outgoing edges
        let new_id = self.alloc_id();
        let sequence = self.graph.node(id).sequence.clone();
        self.graph.insert(new_id, LocalNode::new(sequence));

        let old_outgoing = self.graph.take_side(id, rev);
        let mut kept_out = Vec::with_capacity(old_outgoing.len());
        for (nbr, reversing) in old_outgoing {
            if nbr == id {
                // the arriving side is bare now, so this is a reversing
                // self-loop; it becomes the connection between the pieces
                kept_out.push((new_id, reversing));
                self.graph.push_side(new_id, rev, (id, reversing));
            } else {
                kept_out.push((nbr, reversing));
                self.graph.push_side(new_id, rev, (nbr, reversing));
                self.graph
                    .push_side(nbr, rev == reversing, (new_id, reversing));
            }
        }
        *self.graph.side_mut(id, rev) = kept_out;

        self.id_trans.insert(new_id, id);
        self.pos_2.set_id(new_id);

        let trimmed = trimmed_seq_right(
            &self.graph.node(id).sequence,
            self.pos_1.offset(),
            rev,
            keep,
        );
        self.graph.node_mut(id).sequence = trimmed;
        let trimmed = trimmed_seq_left(
            &self.graph.node(new_id).sequence,
            self.pos_2.offset(),
            self.pos_2.is_rev(),
            keep,
        );
        self.graph.node_mut(new_id).sequence = trimmed;
    }

    /// Phase 5, `strict_max_len`: keep only nodes and edges that lie on some
    /// endpoint-to-endpoint walk of total length at most `max_len`, measured
    /// by a forward and a backward distance sweep over the working graph.
    fn prune_strict_max_len(&mut self) {
        let mut forward_dist: HashMap<(u64, bool), i64> = HashMap::new();
        let mut reverse_dist: HashMap<(u64, bool), i64> = HashMap::new();

        let mut queue =
            FilteredPriorityQueue::new(|trav: &LocalTraversal| (trav.id, trav.rev));
        queue.push(LocalTraversal::new(
            self.pos_1.id(),
            self.pos_1.is_rev(),
            self.graph.sequence_len(self.pos_1.id()),
        ));
        if let Some(dup) = self.duplicate_node_1 {
            queue.push(LocalTraversal::new(
                dup,
                self.pos_1.is_rev(),
                self.graph.sequence_len(dup),
            ));
        }
        while let Some(trav) = queue.pop() {
            forward_dist.insert((trav.id, trav.rev), trav.dist);
            for &(nbr, reversing) in self.graph.side(trav.id, trav.rev) {
                let dist_thru = trav.dist + self.graph.sequence_len(nbr);
                queue.push(LocalTraversal::new(nbr, reversing != trav.rev, dist_thru));
            }
        }

        let mut queue =
            FilteredPriorityQueue::new(|trav: &LocalTraversal| (trav.id, trav.rev));
        queue.push(LocalTraversal::new(self.pos_2.id(), !self.pos_2.is_rev(), 0));
        if let Some(dup) = self.duplicate_node_2 {
            queue.push(LocalTraversal::new(dup, !self.pos_2.is_rev(), 0));
        }
        while let Some(trav) = queue.pop() {
            reverse_dist.insert((trav.id, trav.rev), trav.dist);
            let dist_thru = trav.dist + self.graph.sequence_len(trav.id);
            for &(nbr, reversing) in self.graph.side(trav.id, trav.rev) {
                queue.push(LocalTraversal::new(nbr, reversing != trav.rev, dist_thru));
            }
        }

        let max_len = self.max_len;
        let within = |a: Option<&i64>, b: Option<&i64>, extra: i64| match (a, b) {
            (Some(&a), Some(&b)) => a + b + extra <= max_len,
            _ => false,
        };

        let node_lens: HashMap<u64, i64> = self
            .graph
            .nodes
            .iter()
            .map(|(&id, node)| (id, node.sequence.len() as i64))
            .collect();

        let ids: Vec<u64> = self.graph.nodes.keys().copied().collect();
        let mut to_erase = Vec::new();
        for id in ids {
            let usable_reverse = within(
                forward_dist.get(&(id, true)),
                reverse_dist.get(&(id, false)),
                0,
            );
            let usable_forward = within(
                forward_dist.get(&(id, false)),
                reverse_dist.get(&(id, true)),
                0,
            );
            if !(usable_reverse || usable_forward) {
                // the shortest walk using this node is too long
                to_erase.push(id);
                continue;
            }

            let node = self.graph.node_mut(id);
            node.edges_right.retain(|&(nbr, reversing)| {
                within(
                    forward_dist.get(&(id, false)),
                    reverse_dist.get(&(nbr, !reversing)),
                    node_lens[&nbr],
                ) || within(
                    forward_dist.get(&(nbr, !reversing)),
                    reverse_dist.get(&(id, false)),
                    node_lens[&id],
                )
            });
            node.edges_left.retain(|&(nbr, reversing)| {
                within(
                    forward_dist.get(&(id, true)),
                    reverse_dist.get(&(nbr, reversing)),
                    node_lens[&nbr],
                ) || within(
                    forward_dist.get(&(nbr, reversing)),
                    reverse_dist.get(&(id, true)),
                    node_lens[&id],
                )
            });
        }

        for id in to_erase {
            self.graph.nodes.remove(&id);
            self.id_trans.remove(&id);
        }
    }

    /// Phase 5, `only_paths`: like `strict_max_len` but as pure
    /// reachability, keeping anything on some endpoint-to-endpoint walk.
    fn prune_only_paths(&mut self) {
        let mut forward_reachable: HashSet<(u64, bool)> = HashSet::new();
        let mut stack: Vec<(u64, bool)> = Vec::new();

        let seed = (self.pos_1.id(), self.pos_1.is_rev());
        stack.push(seed);
        forward_reachable.insert(seed);
        if let Some(dup) = self.duplicate_node_1 {
            let seed = (dup, self.pos_1.is_rev());
            stack.push(seed);
            forward_reachable.insert(seed);
        }
        while let Some((id, rev)) = stack.pop() {
            for &(nbr, reversing) in self.graph.side(id, rev) {
                let next = (nbr, reversing != rev);
                if forward_reachable.insert(next) {
                    stack.push(next);
                }
            }
        }

        let mut reverse_reachable: HashSet<(u64, bool)> = HashSet::new();
        let seed = (self.pos_2.id(), !self.pos_2.is_rev());
        stack.push(seed);
        reverse_reachable.insert(seed);
        if let Some(dup) = self.duplicate_node_2 {
            let seed = (dup, !self.pos_2.is_rev());
            stack.push(seed);
            reverse_reachable.insert(seed);
        }
        while let Some((id, rev)) = stack.pop() {
            for &(nbr, reversing) in self.graph.side(id, rev) {
                let next = (nbr, reversing != rev);
                if reverse_reachable.insert(next) {
                    stack.push(next);
                }
            }
        }

        let ids: Vec<u64> = self.graph.nodes.keys().copied().collect();
        let mut to_erase = Vec::new();
        for id in ids {
            let on_path = (forward_reachable.contains(&(id, true))
                && reverse_reachable.contains(&(id, false)))
                || (forward_reachable.contains(&(id, false))
                    && reverse_reachable.contains(&(id, true)));
            if !on_path {
                to_erase.push(id);
                continue;
            }

            let node = self.graph.node_mut(id);
            node.edges_right.retain(|&(nbr, reversing)| {
                (forward_reachable.contains(&(id, false))
                    && reverse_reachable.contains(&(nbr, !reversing)))
                    || (forward_reachable.contains(&(nbr, !reversing))
                        && reverse_reachable.contains(&(id, false)))
            });
            node.edges_left.retain(|&(nbr, reversing)| {
                (forward_reachable.contains(&(id, true))
                    && reverse_reachable.contains(&(nbr, reversing)))
                    || (forward_reachable.contains(&(nbr, reversing))
                        && reverse_reachable.contains(&(id, true)))
            });
        }

        for id in to_erase {
            self.graph.nodes.remove(&id);
            self.id_trans.remove(&id);
        }
    }

    /// Phase 5, `no_additional_tips`: iteratively remove any node with a
    /// bare side, except the endpoint nodes and their duplicates. Degree
    /// counters per side let each deletion requeue only its neighbors.
    fn prune_extra_tips(&mut self) {
        let mut left_degree: HashMap<u64, i64> = HashMap::new();
        let mut right_degree: HashMap<u64, i64> = HashMap::new();
        for (&id, node) in &self.graph.nodes {
            left_degree.insert(id, node.edges_left.len() as i64);
            right_degree.insert(id, node.edges_right.len() as i64);
        }

        let protected = [
            Some(self.pos_1.id()),
            Some(self.pos_2.id()),
            self.duplicate_node_1,
            self.duplicate_node_2,
        ];

        let all_ids: Vec<u64> = self.graph.nodes.keys().copied().collect();
        let mut to_check: VecDeque<u64> = VecDeque::new();
        for id in all_ids {
            to_check.push_front(id);
            while let Some(node_id) = to_check.pop_back() {
                if protected.contains(&Some(node_id)) || !self.graph.contains(node_id) {
                    // endpoints get a free pass on being tips, and the node
                    // may already be gone
                    continue;
                }
                if left_degree[&node_id] == 0 {
                    self.id_trans.remove(&node_id);
                    let edges = self.graph.node(node_id).edges_right.clone();
                    for (nbr, reversing) in edges {
                        let degree = if reversing {
                            right_degree.get_mut(&nbr)
                        } else {
                            left_degree.get_mut(&nbr)
                        };
                        if let Some(degree) = degree {
                            *degree -= 1;
                        }
                        to_check.push_front(nbr);
                    }
                    self.graph.nodes.remove(&node_id);
                } else if right_degree[&node_id] == 0 {
                    self.id_trans.remove(&node_id);
                    let edges = self.graph.node(node_id).edges_left.clone();
                    for (nbr, reversing) in edges {
                        let degree = if reversing {
                            left_degree.get_mut(&nbr)
                        } else {
                            right_degree.get_mut(&nbr)
                        };
                        if let Some(degree) = degree {
                            *degree -= 1;
                        }
                        to_check.push_front(nbr);
                    }
                    self.graph.nodes.remove(&node_id);
                }
            }
        }

        // drop edges left dangling to removed nodes
        let alive: HashSet<u64> = self.graph.nodes.keys().copied().collect();
        for node in self.graph.nodes.values_mut() {
            node.edges_left.retain(|&(nbr, _)| alive.contains(&nbr));
            node.edges_right.retain(|&(nbr, _)| alive.contains(&nbr));
        }
    }

    /// Phase 6: translate the working graph into the output object. Each
    /// edge is emitted exactly once by breaking the mirror symmetry on node
    /// id.
    fn emit(&mut self, out: &mut Subgraph) {
        for &id in self.graph.nodes.keys() {
            self.id_trans.entry(id).or_insert(id);
        }

        for (&id, node) in &self.graph.nodes {
            out.add_node(id, node.sequence.clone());

            for &(nbr, reversing) in &node.edges_left {
                if nbr > id || (nbr == id && reversing) {
                    out.add_edge(id, nbr, true, !reversing);
                }
            }
            for &(nbr, reversing) in &node.edges_right {
                if nbr >= id {
                    out.add_edge(id, nbr, false, reversing);
                }
            }
        }
    }
}
