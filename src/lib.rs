#![doc = include_str!("../README.md")]

#[cfg(feature = "mimalloc")]
use mimalloc::MiMalloc;
#[cfg_attr(feature = "mimalloc", global_allocator)]
#[cfg(feature = "mimalloc")]
static GLOBAL: MiMalloc = MiMalloc;

pub mod error;
pub mod markov;
pub mod matcher;
pub mod roadmap;
pub mod spatial;
pub mod topology;
pub mod util;

#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use matcher::{Matcher, MatcherConfig, MatcherKState, MatcherSample};
#[doc(inline)]
pub use roadmap::RoadMap;
