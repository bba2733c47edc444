//! Directed edge topology, points upon edges, and routing between them.

pub mod cost;
pub mod dijkstra;
pub mod edge;
pub mod error;
pub mod graph;
pub mod path;
pub mod point;
pub mod router;


#[doc(inline)]
pub use cost::*;
#[doc(inline)]
pub use dijkstra::*;
#[doc(inline)]
pub use edge::*;
#[doc(inline)]
pub use error::*;
#[doc(inline)]
pub use graph::{Adjacency, Graph};
#[doc(inline)]
pub use path::*;
#[doc(inline)]
pub use point::*;
#[doc(inline)]
pub use router::*;
