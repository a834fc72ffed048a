//! Compact integer sets with two interchangeable representations.
//!
//! [`IntervalSet`] stores a sorted sequence of disjoint, non-adjacent closed
//! intervals and is cheap for sets made of large contiguous runs.
//! [`BitmapSet`] stores a sparse map from chunk index to a bit-packed word
//! and is cheap for scattered non-negative values. Both expose the same
//! mutable set algebra (membership, union, intersection, difference,
//! symmetric difference, subset ordering, add/remove/pop, ascending
//! iteration) and interoperate: a mixed binary operation converts the
//! right-hand operand into the left-hand representation first, exactly.
//!
//! Construction and bulk updates accept heterogeneous inputs through
//! [`Source`]: a bare integer, an arithmetic range (with any non-zero
//! step), a list of values, or another set of either kind.
//!
//! Sets are plain values: no interior mutability, no thread safety beyond
//! what the underlying storage provides. Mutating a set from several
//! threads, or iterating it while mutating it, needs external
//! synchronization. Values within one step of `i64::MIN`/`i64::MAX` are
//! not supported by [`IntervalSet`] (run merging needs `value ± 1`).

mod bitmap;
mod error;
mod interval;
mod source;

#[cfg(test)]
mod tests_cross;

pub use bitmap::{BitmapIter, BitmapSet, ChunkIter};
pub use error::SetError;
pub use interval::{IntervalIter, IntervalSet, RunIter};
pub use source::Source;

/// Number of payload bits packed into one bitmap chunk word.
///
/// 62 leaves two bits of headroom in a `u64` word so that chunk-local
/// shifts like `1 << (bit + 1)` never overflow.
pub const CHUNK_BITS: u32 = 62;

/// Split a non-negative value into its (chunk index, bit index) pair.
#[inline]
pub(crate) fn chunk_split(value: i64) -> (i64, u32) {
    debug_assert!(value >= 0);
    (value / CHUNK_BITS as i64, (value % CHUNK_BITS as i64) as u32)
}

/// The base value of the chunk with the given index.
#[inline]
pub(crate) fn chunk_base(chunk: i64) -> i64 {
    chunk * CHUNK_BITS as i64
}
