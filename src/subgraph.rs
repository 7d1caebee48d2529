use std::io::{self, Write};

/// A node of the extracted graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubgraphNode {
    pub id: u64,
    pub sequence: Vec<u8>,
}

/// An edge of the extracted graph. `from_start` means the edge leaves the
/// from-node's left side; `to_end` means it enters the to-node's right side.
/// This matches the orientation encoding of GFA links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubgraphEdge {
    pub from: u64,
    pub to: u64,
    pub from_start: bool,
    pub to_end: bool,
}

/// The output surface of the extraction: a graph built once, in emission
/// order, then handed to the caller.
#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    pub nodes: Vec<SubgraphNode>,
    pub edges: Vec<SubgraphEdge>,
}

impl Subgraph {
    pub fn new() -> Self {
        Subgraph {
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn add_node(&mut self, id: u64, sequence: Vec<u8>) {
        self.nodes.push(SubgraphNode { id, sequence });
    }

    pub fn add_edge(&mut self, from: u64, to: u64, from_start: bool, to_end: bool) {
        self.edges.push(SubgraphEdge {
            from,
            to,
            from_start,
            to_end,
        });
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: u64) -> Option<&SubgraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn has_edge(&self, from: u64, to: u64, from_start: bool, to_end: bool) -> bool {
        self.edges.contains(&SubgraphEdge {
            from,
            to,
            from_start,
            to_end,
        })
    }

    /// Write the graph as GFA v1. A link leaving the from-node's left side
    /// traverses that segment in reverse, so `from_start` maps to `-` on the
    /// from column and `to_end` to `-` on the to column.
    pub fn write_gfa<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "H\tVN:Z:1.0")?;
        for node in &self.nodes {
            writeln!(
                out,
                "S\t{}\t{}",
                node.id,
                String::from_utf8_lossy(&node.sequence)
            )?;
        }
        for edge in &self.edges {
            writeln!(
                out,
                "L\t{}\t{}\t{}\t{}\t0M",
                edge.from,
                if edge.from_start { '-' } else { '+' },
                edge.to,
                if edge.to_end { '-' } else { '+' },
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_query() {
        let mut graph = Subgraph::new();
        assert!(graph.is_empty());

        graph.add_node(1, b"ACGT".to_vec());
        graph.add_node(2, b"GG".to_vec());
        graph.add_edge(1, 2, false, false);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(!graph.is_empty());
        assert_eq!(graph.node(2).unwrap().sequence, b"GG");
        assert!(graph.has_edge(1, 2, false, false));
        assert!(!graph.has_edge(1, 2, true, false));
    }

    #[test]
    fn test_gfa_output() {
        let mut graph = Subgraph::new();
        graph.add_node(1, b"ACGT".to_vec());
        graph.add_node(2, b"GG".to_vec());
        graph.add_edge(1, 2, false, false);
        graph.add_edge(2, 2, false, true);

        let mut buf = Vec::new();
        graph.write_gfa(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "H\tVN:Z:1.0",
                "S\t1\tACGT",
                "S\t2\tGG",
                "L\t1\t+\t2\t+\t0M",
                "L\t2\t+\t2\t-\t0M",
            ]
        );
    }
}
