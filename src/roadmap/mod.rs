//! The road network: directed roads over base roads, positions and routes
//! upon them, and their costs.

pub mod base;
pub mod cost;
pub mod error;
pub mod map;
pub mod road;
pub mod route;


#[doc(inline)]
pub use base::*;
#[doc(inline)]
pub use cost::*;
#[doc(inline)]
pub use error::*;
#[doc(inline)]
pub use map::*;
#[doc(inline)]
pub use road::*;
#[doc(inline)]
pub use route::*;
