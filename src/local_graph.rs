use std::collections::BTreeMap;

/// A node of the working graph built up during extraction. Edges are stored
/// by neighbor id on the side they attach to, as `(neighbor_id, reversing)`.
/// A reversing edge connects two same-named sides, so traversing it flips
/// strand. Every edge appears on both endpoints' lists, except a reversing
/// self-loop which appears exactly once on its side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalNode {
    pub sequence: Vec<u8>,
    pub edges_left: Vec<(u64, bool)>,
    pub edges_right: Vec<(u64, bool)>,
}

impl LocalNode {
    pub fn new(sequence: Vec<u8>) -> Self {
        LocalNode {
            sequence,
            edges_left: Vec::new(),
            edges_right: Vec::new(),
        }
    }
}

/// The working graph: an id-ordered map of nodes whose edge lists mirror
/// each other. Ordered so that emission walks ids in ascending order and
/// repeated extractions produce identical output.
#[derive(Debug, Clone, Default)]
pub struct LocalGraph {
    pub nodes: BTreeMap<u64, LocalNode>,
}

impl LocalGraph {
    pub fn new() -> Self {
        LocalGraph {
            nodes: BTreeMap::new(),
        }
    }

    pub fn contains(&self, id: u64) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn insert(&mut self, id: u64, node: LocalNode) {
        self.nodes.insert(id, node);
    }

    pub fn node(&self, id: u64) -> &LocalNode {
        &self.nodes[&id]
    }

    pub fn node_mut(&mut self, id: u64) -> &mut LocalNode {
        self.nodes.get_mut(&id).expect("node missing from local graph")
    }

    pub fn sequence_len(&self, id: u64) -> i64 {
        self.nodes[&id].sequence.len() as i64
    }

    /// Edge list of one side, `left` selecting `edges_left`.
    pub fn side(&self, id: u64, left: bool) -> &Vec<(u64, bool)> {
        let node = &self.nodes[&id];
        if left {
            &node.edges_left
        } else {
            &node.edges_right
        }
    }

    pub fn side_mut(&mut self, id: u64, left: bool) -> &mut Vec<(u64, bool)> {
        let node = self.node_mut(id);
        if left {
            &mut node.edges_left
        } else {
            &mut node.edges_right
        }
    }

    pub fn push_side(&mut self, id: u64, left: bool, entry: (u64, bool)) {
        self.side_mut(id, left).push(entry);
    }

    /// Move a whole side list out, leaving it empty.
    pub fn take_side(&mut self, id: u64, left: bool) -> Vec<(u64, bool)> {
        std::mem::take(self.side_mut(id, left))
    }

    /// Record a newly observed edge between two oriented traversals,
    /// mirroring it on both endpoints. The edge leaves the side `from` is
    /// traversing out of and enters the side `to` is traversing into. A
    /// reversing self-loop is stored only once.
    pub fn record_edge(&mut self, from_id: u64, from_rev: bool, to_id: u64, to_rev: bool) {
        let reversing = from_rev != to_rev;
        // leaving out of the right side unless the traversal is reversed
        self.push_side(from_id, from_rev, (to_id, reversing));
        if !(from_id == to_id && reversing) {
            // entering on the left side unless the target is reversed
            self.push_side(to_id, !to_rev, (from_id, reversing));
        }
    }

    /// Remove the first occurrence of `entry` from one side of a node, if
    /// present.
    pub fn remove_side_entry(&mut self, id: u64, left: bool, entry: (u64, bool)) {
        let edges = self.side_mut(id, left);
        if let Some(ix) = edges.iter().position(|&e| e == entry) {
            edges.remove(ix);
        }
    }

    /// Rewrite the first occurrence of `old` on one side of a node to point
    /// at `new_id`, keeping the reversing flag.
    pub fn rewrite_side_entry(&mut self, id: u64, left: bool, old: (u64, bool), new_id: u64) {
        let edges = self.side_mut(id, left);
        if let Some(edge) = edges.iter_mut().find(|e| **e == old) {
            edge.0 = new_id;
        }
    }
}

/// The part of `seq` to the right of `offset` on the given strand. With
/// `include_position` the base at the offset itself is kept.
pub fn trimmed_seq_right(seq: &[u8], offset: usize, rev: bool, include_position: bool) -> Vec<u8> {
    let keep = include_position as usize;
    let len = seq.len() - offset - 1 + keep;
    if rev {
        seq[..len].to_vec()
    } else {
        seq[offset + 1 - keep..].to_vec()
    }
}

/// The part of `seq` to the left of `offset` on the given strand.
pub fn trimmed_seq_left(seq: &[u8], offset: usize, rev: bool, include_position: bool) -> Vec<u8> {
    let keep = include_position as usize;
    let len = offset + keep;
    if rev {
        seq[seq.len() - len..].to_vec()
    } else {
        seq[..len].to_vec()
    }
}
