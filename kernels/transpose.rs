// ========================================================================================
//
//                 A TILED, CACHE-AWARE, CONTENTION-FREE MATRIX TRANSPOSE
//
// ========================================================================================
//
// Channelized time series are stored sample-major (`nsamples x nchans`), while the
// spectral and dedispersion stages want channel-major rows. This module performs that
// layout change. The `rows x cols` input is cut into fixed-size tiles; each tile is
// staged column-wise into a small scratch block that stays in L1, then written out as
// contiguous runs of the transposed rows.
//
// ### Work partitioning ###
//
// Tiles are addressed by one linear index `s -> (s / block_cols, s % block_cols)`. A
// tile at block `(l, k)` only ever writes output rows `[k*tc, (k+1)*tc)` restricted to
// output columns `[l*tr, (l+1)*tr)`, so no two tiles touch the same output element and
// the output needs no synchronization at all.
//
// Each worker slot owns one scratch block from an arena allocated when the engine is
// built. Slot `w` processes tiles `w, w + W, w + 2W, ...`. Because all tiles cost the
// same, this static round-robin split is as balanced as work stealing and keeps the
// result independent of scheduling order.

use crate::config::TransposeConfig;
use crate::types::{KernelError, Sample, check_len};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use std::borrow::Cow;
use std::marker::PhantomData;

/// Tile dimensions: `rows` along the input's row axis, `cols` along its column axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileShape {
    pub rows: usize,
    pub cols: usize,
}

impl TileShape {
    /// 64 input rows by 16 input columns: a 4 KiB `f32` tile whose 16 output runs are
    /// each a full 256-byte stretch of a transposed row.
    pub const DEFAULT: Self = Self { rows: 64, cols: 16 };

    pub fn new(rows: usize, cols: usize) -> Result<Self, KernelError> {
        let shape = Self { rows, cols };
        shape.validate()?;
        Ok(shape)
    }

    /// Number of elements in one tile, which is also the scratch block size.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn validate(&self) -> Result<(), KernelError> {
        if self.is_empty() {
            return Err(KernelError::EmptyTile {
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }
}

impl Default for TileShape {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// How tiles at the bottom and right edges of the matrix are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransposeMode {
    /// Both dimensions must be whole multiples of the tile shape.
    Exact,
    /// Any shape. Edge tiles copy only their valid sub-rectangle.
    Padded,
    /// Any shape. Every tile walks the full tile extent with a per-element bounds
    /// check. Produces exactly the same output as `Padded`.
    PaddedUniform,
}

/// Geometric class of a tile relative to the matrix bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileClip {
    Full,
    RowClipped,
    ColClipped,
    Corner,
}

/// One unit of transpose work: an origin in the input and its valid extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Tile {
    pub fn clip(&self, shape: TileShape) -> TileClip {
        match (self.rows < shape.rows, self.cols < shape.cols) {
            (false, false) => TileClip::Full,
            (true, false) => TileClip::RowClipped,
            (false, true) => TileClip::ColClipped,
            (true, true) => TileClip::Corner,
        }
    }
}

/// The tile decomposition of a `rows x cols` matrix, padded up to whole tiles.
#[derive(Debug, Clone, Copy)]
pub struct TileGrid {
    rows: usize,
    cols: usize,
    shape: TileShape,
    block_rows: usize,
    block_cols: usize,
}

impl TileGrid {
    pub fn new(rows: usize, cols: usize, shape: TileShape) -> Self {
        Self {
            rows,
            cols,
            shape,
            block_rows: rows.div_ceil(shape.rows.max(1)),
            block_cols: cols.div_ceil(shape.cols.max(1)),
        }
    }

    /// Total number of tiles.
    pub fn len(&self) -> usize {
        self.block_rows * self.block_cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when no tile is clipped.
    pub fn is_aligned(&self) -> bool {
        self.rows % self.shape.rows == 0 && self.cols % self.shape.cols == 0
    }

    /// The tile at linear index `index`, with its extent clipped to the matrix.
    #[inline(always)]
    pub fn tile(&self, index: usize) -> Tile {
        let row = (index / self.block_cols) * self.shape.rows;
        let col = (index % self.block_cols) * self.shape.cols;
        Tile {
            row,
            col,
            rows: self.shape.rows.min(self.rows - row),
            cols: self.shape.cols.min(self.cols - col),
        }
    }
}

/// Write access to an output buffer shared by all workers.
///
/// Every tile writes to a region no other tile touches, so concurrent writes through
/// this handle never alias. Writes go through raw pointers; no `&mut` to the shared
/// buffer is ever created while workers run.
struct DisjointOutput<'a, T> {
    ptr: *mut T,
    len: usize,
    marker: PhantomData<&'a mut [T]>,
}

// SAFETY: the handle is only used to write disjoint regions (see the module notes),
// and `T: Send` values may be written from any thread.
unsafe impl<T: Send> Send for DisjointOutput<'_, T> {}
unsafe impl<T: Send> Sync for DisjointOutput<'_, T> {}

impl<'a, T: Copy> DisjointOutput<'a, T> {
    fn new(out: &'a mut [T]) -> Self {
        Self {
            ptr: out.as_mut_ptr(),
            len: out.len(),
            marker: PhantomData,
        }
    }

    /// Copies `src` to `[start, start + src.len())`.
    ///
    /// # Safety
    /// The range must be in bounds and must not be written by any other worker.
    #[inline(always)]
    unsafe fn write_run(&self, start: usize, src: &[T]) {
        debug_assert!(start + src.len() <= self.len);
        unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), self.ptr.add(start), src.len()) }
    }

    /// # Safety
    /// `index` must be in bounds and must not be written by any other worker.
    #[inline(always)]
    unsafe fn write(&self, index: usize, value: T) {
        debug_assert!(index < self.len);
        unsafe { self.ptr.add(index).write(value) }
    }
}

/// Transposes the valid sub-rectangle of one tile through `scratch`.
///
/// Full, row-clipped, column-clipped, and corner tiles all go through here; the clip
/// is carried entirely by `tile.rows` and `tile.cols`.
#[inline]
fn transpose_tile_clipped<T: Sample>(
    input: &[T],
    rows: usize,
    cols: usize,
    tile: Tile,
    stride: usize,
    scratch: &mut [T],
    out: &DisjointOutput<'_, T>,
) {
    for i in 0..tile.rows {
        let src_start = (tile.row + i) * cols + tile.col;
        let src = &input[src_start..src_start + tile.cols];
        for (j, &value) in src.iter().enumerate() {
            scratch[j * stride + i] = value;
        }
    }
    for j in 0..tile.cols {
        let run = &scratch[j * stride..j * stride + tile.rows];
        // SAFETY: output row `tile.col + j`, columns `[tile.row, tile.row + tile.rows)`,
        // belongs to this tile alone and lies inside the `cols x rows` output.
        unsafe { out.write_run((tile.col + j) * rows + tile.row, run) };
    }
}

/// Transposes one tile by walking the full tile extent and bounds-checking each
/// element against the matrix.
#[inline]
fn transpose_tile_uniform<T: Sample>(
    input: &[T],
    rows: usize,
    cols: usize,
    tile: Tile,
    shape: TileShape,
    scratch: &mut [T],
    out: &DisjointOutput<'_, T>,
) {
    let stride = shape.rows;
    for i in 0..shape.rows {
        for j in 0..shape.cols {
            let (r, c) = (tile.row + i, tile.col + j);
            if r < rows && c < cols {
                scratch[j * stride + i] = input[r * cols + c];
            }
        }
    }
    for j in 0..shape.cols {
        for i in 0..shape.rows {
            let (r, c) = (tile.row + i, tile.col + j);
            if c < cols && r < rows {
                // SAFETY: `(c, r)` is inside the output and inside this tile.
                unsafe { out.write(c * rows + r, scratch[j * stride + i]) };
            }
        }
    }
}

/// Drives every tile of `grid` through the worker-slot scratch blocks.
fn run_tiles<T: Sample>(
    input: &[T],
    grid: &TileGrid,
    mode: TransposeMode,
    scratch: &mut [T],
    slots: usize,
    out: &DisjointOutput<'_, T>,
) {
    let shape = grid.shape;
    let tiles = grid.len();
    scratch
        .par_chunks_mut(shape.len())
        .take(slots)
        .enumerate()
        .for_each(|(slot, block)| {
            for index in (slot..tiles).step_by(slots) {
                let tile = grid.tile(index);
                match mode {
                    TransposeMode::Exact | TransposeMode::Padded => transpose_tile_clipped(
                        input, grid.rows, grid.cols, tile, shape.rows, block, out,
                    ),
                    TransposeMode::PaddedUniform => transpose_tile_uniform(
                        input, grid.rows, grid.cols, tile, shape, block, out,
                    ),
                }
            }
        });
}

/// A reusable transpose engine: tile shape, worker pool, and one scratch block per
/// worker slot.
pub struct TransposeEngine<T> {
    shape: TileShape,
    pool: Option<rayon::ThreadPool>,
    slots: usize,
    scratch: Vec<T>,
}

impl<T: Sample> TransposeEngine<T> {
    /// Engine running on the global rayon pool, one slot per pool thread.
    pub fn new(shape: TileShape) -> Result<Self, KernelError> {
        shape.validate()?;
        let slots = rayon::current_num_threads().max(1);
        Ok(Self {
            shape,
            pool: None,
            slots,
            scratch: vec![T::zero(); slots * shape.len()],
        })
    }

    /// Engine with a dedicated pool of exactly `workers` threads.
    pub fn with_workers(shape: TileShape, workers: usize) -> Result<Self, KernelError> {
        shape.validate()?;
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("astrokern-transpose-{i}"))
            .build()?;
        log::debug!(
            "Built transpose pool: {workers} workers, {}x{} tiles, {} scratch elements",
            shape.rows,
            shape.cols,
            workers * shape.len()
        );
        Ok(Self {
            shape,
            pool: Some(pool),
            slots: workers,
            scratch: vec![T::zero(); workers * shape.len()],
        })
    }

    pub fn from_config(config: &TransposeConfig) -> Result<Self, KernelError> {
        Self::with_workers(config.tile_shape(), config.worker_count())
    }

    pub fn shape(&self) -> TileShape {
        self.shape
    }

    /// Number of worker slots, i.e. the maximum number of tiles in flight.
    pub fn workers(&self) -> usize {
        self.slots
    }

    /// Transposes the row-major `rows x cols` `input` into the row-major `cols x rows`
    /// `output`.
    pub fn transpose(
        &mut self,
        input: &[T],
        output: &mut [T],
        rows: usize,
        cols: usize,
        mode: TransposeMode,
    ) -> Result<(), KernelError> {
        check_len("transpose input", rows * cols, input.len())?;
        check_len("transpose output", rows * cols, output.len())?;

        let grid = TileGrid::new(rows, cols, self.shape);
        if mode == TransposeMode::Exact && !grid.is_aligned() {
            return Err(KernelError::NotTileAligned {
                rows,
                cols,
                tile_rows: self.shape.rows,
                tile_cols: self.shape.cols,
            });
        }
        if grid.is_empty() {
            return Ok(());
        }

        let slots = self.slots.min(grid.len());
        log::trace!(
            "Transposing {rows}x{cols} ({mode:?}): {} tiles over {slots} slots",
            grid.len()
        );

        let out = DisjointOutput::new(output);
        let scratch = &mut self.scratch[..];
        match &self.pool {
            Some(pool) => pool.install(|| run_tiles(input, &grid, mode, scratch, slots, &out)),
            None => run_tiles(input, &grid, mode, scratch, slots, &out),
        }
        Ok(())
    }
}

/// Exact transpose with the default 64x16 tiles.
///
/// `rows` must be a multiple of 64 and `cols` a multiple of 16.
pub fn transpose<T: Sample>(
    input: &[T],
    output: &mut [T],
    rows: usize,
    cols: usize,
) -> Result<(), KernelError> {
    TransposeEngine::new(TileShape::DEFAULT)?.transpose(
        input,
        output,
        rows,
        cols,
        TransposeMode::Exact,
    )
}

/// Transpose of any shape with the default 64x16 tiles.
pub fn transpose_padded<T: Sample>(
    input: &[T],
    output: &mut [T],
    rows: usize,
    cols: usize,
) -> Result<(), KernelError> {
    transpose_padded_with(input, output, rows, cols, TileShape::DEFAULT)
}

/// Transpose of any shape with caller-chosen tiles.
pub fn transpose_padded_with<T: Sample>(
    input: &[T],
    output: &mut [T],
    rows: usize,
    cols: usize,
    shape: TileShape,
) -> Result<(), KernelError> {
    TransposeEngine::new(shape)?.transpose(input, output, rows, cols, TransposeMode::Padded)
}

/// Transpose of any shape using the per-element bounds check.
pub fn transpose_padded_uniform<T: Sample>(
    input: &[T],
    output: &mut [T],
    rows: usize,
    cols: usize,
    shape: TileShape,
) -> Result<(), KernelError> {
    TransposeEngine::new(shape)?.transpose(
        input,
        output,
        rows,
        cols,
        TransposeMode::PaddedUniform,
    )
}

/// Transposes an `ndarray` view into a new standard-layout array.
pub fn transpose_array<T: Sample>(view: ArrayView2<'_, T>) -> Result<Array2<T>, KernelError> {
    let (rows, cols) = view.dim();
    let input: Cow<'_, [T]> = match view.as_slice() {
        Some(slice) => Cow::Borrowed(slice),
        None => Cow::Owned(view.iter().copied().collect()),
    };
    let mut output = vec![T::zero(); rows * cols];
    transpose_padded(&input, &mut output, rows, cols)?;
    Array2::from_shape_vec((cols, rows), output).map_err(|_| KernelError::LengthMismatch {
        what: "ndarray output",
        expected: rows * cols,
        found: 0,
    })
}

// ========================================================================================
//                          Transpose as a rank-0 strided transform
// ========================================================================================

/// One loop dimension of a strided copy: `n` iterations, advancing the input by `is`
/// and the output by `os` elements per iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoDim {
    pub n: usize,
    pub is: usize,
    pub os: usize,
}

/// The loop nest an FFT library's "guru" interface needs to perform an out-of-place
/// transpose as a rank-0 transform: no transform dimensions, two "howmany" dimensions
/// whose output strides swap the axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransposePlan {
    pub rows: usize,
    pub cols: usize,
    pub dims: [IoDim; 2],
}

/// Plans the transpose of a row-major `rows x cols` matrix.
pub fn plan_transpose(rows: usize, cols: usize) -> TransposePlan {
    TransposePlan {
        rows,
        cols,
        dims: [
            IoDim {
                n: rows,
                is: cols,
                os: 1,
            },
            IoDim {
                n: cols,
                is: 1,
                os: rows,
            },
        ],
    }
}

impl TransposePlan {
    /// Number of elements moved.
    pub fn len(&self) -> usize {
        self.dims[0].n * self.dims[1].n
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs the loop nest as a plain strided copy. An external FFT executor given the
    /// same dimensions produces the same output.
    pub fn execute<T: Copy>(&self, input: &[T], output: &mut [T]) -> Result<(), KernelError> {
        check_len("plan input", self.len(), input.len())?;
        check_len("plan output", self.len(), output.len())?;
        let [outer, inner] = self.dims;
        for i in 0..outer.n {
            for j in 0..inner.n {
                output[i * outer.os + j * inner.os] = input[i * outer.is + j * inner.is];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|v| v as f32).collect()
    }

    #[test]
    fn grid_classifies_all_four_edge_cases() {
        let shape = TileShape::DEFAULT;
        let grid = TileGrid::new(70, 18, shape);
        assert_eq!(grid.len(), 4);
        assert!(!grid.is_aligned());

        let clips: Vec<TileClip> = (0..grid.len()).map(|s| grid.tile(s).clip(shape)).collect();
        assert_eq!(
            clips,
            vec![
                TileClip::Full,
                TileClip::ColClipped,
                TileClip::RowClipped,
                TileClip::Corner
            ]
        );
        assert_eq!(
            grid.tile(3),
            Tile {
                row: 64,
                col: 16,
                rows: 6,
                cols: 2
            }
        );
    }

    #[test]
    fn zero_sized_tiles_are_rejected() {
        assert!(matches!(
            TileShape::new(0, 16),
            Err(KernelError::EmptyTile { rows: 0, cols: 16 })
        ));
        assert!(TransposeEngine::<f32>::new(TileShape { rows: 4, cols: 0 }).is_err());
    }

    #[test]
    fn exact_mode_rejects_unaligned_shapes() {
        let input = ramp(70 * 16);
        let mut output = vec![0.0; input.len()];
        let err = transpose(&input, &mut output, 70, 16).unwrap_err();
        assert!(matches!(
            err,
            KernelError::NotTileAligned {
                rows: 70,
                cols: 16,
                tile_rows: 64,
                tile_cols: 16
            }
        ));
    }

    #[test]
    fn buffer_lengths_are_checked() {
        let input = ramp(12);
        let mut short = vec![0.0; 11];
        assert!(matches!(
            transpose_padded(&input, &mut short, 3, 4),
            Err(KernelError::LengthMismatch { what: "transpose output", .. })
        ));
    }

    #[test]
    fn small_tiles_with_dedicated_pool() {
        let (rows, cols) = (7, 5);
        let input = ramp(rows * cols);
        let mut output = vec![0.0; rows * cols];
        let mut engine = TransposeEngine::with_workers(TileShape::new(2, 3).unwrap(), 3).unwrap();
        assert_eq!(engine.workers(), 3);
        engine
            .transpose(&input, &mut output, rows, cols, TransposeMode::Padded)
            .unwrap();
        for r in 0..rows {
            for c in 0..cols {
                assert_eq!(output[c * rows + r], input[r * cols + c]);
            }
        }
    }

    #[test]
    fn empty_matrix_is_a_no_op() {
        let mut output: Vec<f64> = Vec::new();
        transpose_padded(&[], &mut output, 0, 9).unwrap();
        transpose(&[], &mut output, 0, 0).unwrap();
    }

    #[test]
    fn plan_dims_swap_strides() {
        let plan = plan_transpose(3, 5);
        assert_eq!(plan.dims[0], IoDim { n: 3, is: 5, os: 1 });
        assert_eq!(plan.dims[1], IoDim { n: 5, is: 1, os: 3 });
        assert_eq!(plan.len(), 15);
    }
}
