//! graphslice extracts the subgraph of a bidirected sequence graph that
//! connects two oriented positions, within a distance bound, turning the
//! positions into tips of the result and optionally preserving local cycles
//! through the endpoint nodes.
//!
//! The source graph is read through the [`GraphSource`] capability trait,
//! implemented here for `handlegraph::hashgraph::HashGraph`; the result is
//! built into a [`Subgraph`] together with a translation from output node
//! ids back to source ids.

pub mod connecting_subgraph;
pub mod error;
pub mod filtered_queue;
pub mod graph_source;
pub mod local_graph;
pub mod pos;
pub mod subgraph;
pub mod topological_sort;

pub use connecting_subgraph::extract_connecting_graph;
pub use error::GraphsliceError;
pub use graph_source::GraphSource;
pub use pos::Pos;
pub use subgraph::{Subgraph, SubgraphEdge, SubgraphNode};
