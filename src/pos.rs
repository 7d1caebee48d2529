use std::fmt;
use std::str::FromStr;

use crate::error::GraphsliceError;

/// An oriented position inside a node of a bidirected sequence graph.
/// The offset is measured on the stated strand: offset 0 is the first base
/// of the node read in that orientation. For a node of length L the valid
/// offsets are 0..L-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    node_id: u64,
    is_rev: bool,
    offset: usize,
}

impl Pos {
    pub fn new(node_id: u64, is_rev: bool, offset: usize) -> Self {
        Pos {
            node_id,
            is_rev,
            offset,
        }
    }

    /// The node this position lies on
    #[inline]
    pub fn id(&self) -> u64 {
        self.node_id
    }

    /// Whether the position is on the reverse strand
    #[inline]
    pub fn is_rev(&self) -> bool {
        self.is_rev
    }

    /// Offset along the oriented strand
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Redirect the position onto another node, keeping strand and offset.
    /// Used when an endpoint node is split and the position now lives on one
    /// of the pieces.
    #[inline]
    pub fn set_id(&mut self, node_id: u64) {
        self.node_id = node_id;
    }

    /// Get orientation as a character ('+' or '-')
    #[inline]
    pub fn orientation_char(&self) -> char {
        if self.is_rev {
            '-'
        } else {
            '+'
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}", self.node_id, self.orientation_char(), self.offset)
    }
}

impl FromStr for Pos {
    type Err = GraphsliceError;

    /// Parse `<id>[+-]:<offset>`, e.g. `17+:4` or `3-:0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || GraphsliceError::PosParse(s.to_string());
        let (oriented_id, offset) = s.split_once(':').ok_or_else(bad)?;
        let offset: usize = offset.parse().map_err(|_| bad())?;
        let is_rev = match oriented_id.as_bytes().last() {
            Some(b'+') => false,
            Some(b'-') => true,
            _ => return Err(bad()),
        };
        let node_id: u64 = oriented_id[..oriented_id.len() - 1]
            .parse()
            .map_err(|_| bad())?;
        if node_id == 0 {
            return Err(bad());
        }
        Ok(Pos::new(node_id, is_rev, offset))
    }
}
