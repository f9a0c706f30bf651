//! PDF mechanics: text-layer probing and page-aligned splitting.
//!
//! Everything that touches lopdf lives here. The rest of the pipeline only
//! sees `ProbeResult` and `Chunk` values.

pub mod probe;
pub mod splitter;

pub use probe::{probe, ProbeResult};
pub use splitter::{needs_splitting, split};

#[cfg(test)]
pub(crate) mod testpdf;
