//! The static hash index: a flat directory of `2^D` bucket-chain heads
//! mapping a `SearchKey`'s low-order hash bits to an overflow-chained list
//! of sorted bucket pages, built on top of the `buffer` pool and the
//! page-layer typed views in `page`.

mod errors;
mod hash_index;
mod scan;

pub use errors::HashError;
pub use hash_index::HashIndex;
pub use scan::HashScan;
