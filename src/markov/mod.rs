//! Hidden Markov Model filtering and state memories.
//!
//! A [`Filter`] determines the state vector of each measurement sample from
//! the state vector of the previous one, which a [`KState`] collects into a
//! window of steps from which the most likely sequence is read out.

pub mod candidate;
pub mod error;
pub mod factory;
pub mod filter;
pub mod kstate;
pub mod memory;
pub mod sample;


#[doc(inline)]
pub use candidate::*;
#[doc(inline)]
pub use error::*;
#[doc(inline)]
pub use factory::*;
#[doc(inline)]
pub use filter::*;
#[doc(inline)]
pub use kstate::*;
#[doc(inline)]
pub use memory::*;
#[doc(inline)]
pub use sample::*;
