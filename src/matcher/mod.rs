//! Map matching of position samples onto the road network, as a Hidden Markov
//! Model filter over candidate road positions.

pub mod candidate;
pub mod config;
pub mod error;
pub mod kstate;
#[allow(clippy::module_inception)]
pub mod matcher;
pub mod minset;
pub mod sample;
pub mod scheduler;

#[doc(hidden)]
#[cfg(test)]
mod test;

#[doc(inline)]
pub use candidate::*;
#[doc(inline)]
pub use config::*;
#[doc(inline)]
pub use error::*;
#[doc(inline)]
pub use kstate::*;
#[doc(inline)]
pub use matcher::*;
#[doc(inline)]
pub use sample::*;
#[doc(inline)]
pub use scheduler::*;
