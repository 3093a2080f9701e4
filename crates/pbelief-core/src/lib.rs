//! Exact reachability / belief propagation over probabilistic DAGs.
//!
//! Three cooperating pieces, bottom-up: [`topology`] derives ancestor/
//! descendant closures and a level order from an edge list, [`diamond`]
//! finds every fork/join structure that breaks the naive independence
//! assumption and carves out a self-contained subgraph for it, and
//! [`propagate`] walks the topology in level order, conditioning on those
//! subgraphs where they occur and combining ordinary parents with
//! inclusion-exclusion everywhere else. [`algebra`] is the value
//! representation all three are generic over.

pub mod algebra;
pub mod diamond;
pub mod error;
pub mod propagate;
pub mod topology;

pub use algebra::{Interval, Point, Probability, Slice, SliceConfig};
pub use diamond::{AncestorGroup, DiamondCatalog, DiamondsAtJoin, decompose};
pub use error::{PdagError, PdagResult};
pub use propagate::propagate;
pub use topology::{NodeId, Topology, build_topology};
