use handlegraph::handle::{Direction, Edge, Handle};
use handlegraph::handlegraph::*;
use handlegraph::hashgraph::HashGraph;

/// Read capability over a bidirected sequence graph. The extraction and
/// sorting algorithms only ever see a source graph through this trait, so any
/// backing store that can answer these queries can be sliced.
///
/// Handles are oriented node references; `get_sequence` returns the sequence
/// as read in the handle's orientation.
pub trait GraphSource {
    /// Number of nodes in the graph
    fn node_count(&self) -> usize;

    /// Handle for the given node in the given orientation
    fn get_handle(&self, node_id: u64, is_reverse: bool) -> Handle;

    /// Node id of a handle
    fn get_id(&self, handle: Handle) -> u64;

    /// Whether a handle is on the reverse strand
    fn get_is_reverse(&self, handle: Handle) -> bool;

    /// The locally-forward orientation of the handle's node
    fn forward(&self, handle: Handle) -> Handle {
        if self.get_is_reverse(handle) {
            handle.flip()
        } else {
            handle
        }
    }

    /// Sequence of the node as read in the handle's orientation
    fn get_sequence(&self, handle: Handle) -> Vec<u8>;

    /// Invoke `f` for each edge leaving the given side of the handle
    /// (`go_left = false` leaves the side the handle is traversing toward).
    /// Iteration stops early when `f` returns false; the return value is
    /// false iff iteration was stopped.
    fn follow_edges<F>(&self, handle: Handle, go_left: bool, f: F) -> bool
    where
        F: FnMut(Handle) -> bool;

    /// Invoke `f` with the forward handle of every node; stops early when
    /// `f` returns false.
    fn for_each_handle<F>(&self, f: F)
    where
        F: FnMut(Handle) -> bool;

    /// Canonical form of an oriented edge: `(a, b)` and `(b', a')` describe
    /// the same edge and must map to the same value.
    fn edge_handle(&self, left: Handle, right: Handle) -> Edge {
        let flipped = (right.flip(), left.flip());
        if handle_key(left) <= handle_key(flipped.0) {
            Edge(left, right)
        } else {
            Edge(flipped.0, flipped.1)
        }
    }
}

/// Total order on handles built from confirmed accessors: node id first,
/// reverse orientation second.
#[inline]
pub fn handle_key(handle: Handle) -> (u64, bool) {
    (u64::from(handle.id()), handle.is_reverse())
}

impl GraphSource for HashGraph {
    fn node_count(&self) -> usize {
        self.handles().count()
    }

    fn get_handle(&self, node_id: u64, is_reverse: bool) -> Handle {
        Handle::pack(node_id, is_reverse)
    }

    fn get_id(&self, handle: Handle) -> u64 {
        u64::from(handle.id())
    }

    fn get_is_reverse(&self, handle: Handle) -> bool {
        handle.is_reverse()
    }

    fn get_sequence(&self, handle: Handle) -> Vec<u8> {
        self.sequence(handle).collect()
    }

    fn follow_edges<F>(&self, handle: Handle, go_left: bool, mut f: F) -> bool
    where
        F: FnMut(Handle) -> bool,
    {
        let dir = if go_left {
            Direction::Left
        } else {
            Direction::Right
        };
        for next in self.neighbors(handle, dir) {
            if !f(next) {
                return false;
            }
        }
        true
    }

    fn for_each_handle<F>(&self, mut f: F)
    where
        F: FnMut(Handle) -> bool,
    {
        for handle in self.handles() {
            if !f(handle) {
                return;
            }
        }
    }
}
