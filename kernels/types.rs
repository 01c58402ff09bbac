// ========================================================================================
//
//                 SHARED VOCABULARY: SAMPLE TYPES AND PRECONDITION ERRORS
//
// ========================================================================================
//
// Every kernel in this crate is generic over the sample type carried by the pipeline
// buffers (`f32` for raw filterbank data, `f64` for derived statistics). This module
// pins down what a sample must support and the single error type used to report a
// violated size or shape contract.

use num_traits::Float;
use std::cmp::Ordering;
use std::fmt::Debug;
use thiserror::Error;

/// A floating-point sample that can flow through the kernels.
///
/// On top of `num_traits::Float`, a sample has a total order. The order-statistics
/// tree relies on it: every bit pattern, including NaN, has exactly one place in the
/// tree, so a value that was inserted can always be found again for eviction.
pub trait Sample: Float + Debug + Default + Send + Sync + 'static {
    /// IEEE 754 `totalOrder` comparison.
    fn total_order(&self, other: &Self) -> Ordering;
}

impl Sample for f32 {
    #[inline(always)]
    fn total_order(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

impl Sample for f64 {
    #[inline(always)]
    fn total_order(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

/// A violated size or shape contract.
///
/// Kernels never clamp or truncate to make mismatched inputs fit. They fail fast with
/// one of these variants before touching the output.
#[derive(Error, Debug)]
pub enum KernelError {
    #[error("Mismatched {what} buffer: expected length {expected}, got {found}.")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error(
        "Matrix of shape {rows}x{cols} is not a whole number of {tile_rows}x{tile_cols} tiles."
    )]
    NotTileAligned {
        rows: usize,
        cols: usize,
        tile_rows: usize,
        tile_cols: usize,
    },

    #[error("Tile dimensions must be non-zero, but got {rows}x{cols}.")]
    EmptyTile { rows: usize, cols: usize },

    #[error("Sliding median window width must be at least 1.")]
    ZeroWindow,

    #[error("Failed to build the transpose worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Checks that a buffer holds exactly `expected` elements.
#[inline]
pub fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), KernelError> {
    if expected != found {
        return Err(KernelError::LengthMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}
