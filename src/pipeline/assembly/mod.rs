pub mod assembler;
pub mod normalize;

pub use assembler::*;
pub use normalize::*;

use thiserror::Error;

/// The occurrence list handed to the assembler broke its contract. Only a
/// scanner bug (or a hand-built list) can produce these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("Marker {id} spans {start}..{end}, outside text of {len} bytes")]
    OutOfBounds {
        id: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("Marker {id} has an inverted span {start}..{end}")]
    InvertedSpan { id: String, start: usize, end: usize },

    #[error("Marker {id} starts at {start}, before the previous marker ends at {previous_end}")]
    Overlap {
        id: String,
        start: usize,
        previous_end: usize,
    },

    #[error("Marker {id} offset {offset} is not on a character boundary")]
    NotCharBoundary { id: String, offset: usize },
}
