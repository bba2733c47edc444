//! Geographic operations and the spatial index of line strings.

pub mod index;
pub mod operator;

#[doc(hidden)]
#[cfg(test)]
mod test;

#[doc(inline)]
pub use index::*;
#[doc(inline)]
pub use operator::*;
