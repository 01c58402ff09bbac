// ========================================================================================
//
//                         SLIDING-WINDOW MEDIAN BASELINE FILTER
//
// ========================================================================================
//
// A running median over a 1-D sample stream, used as a robust baseline for de-trending
// and for estimating the RFI-free level of a channel. The window is centred on each
// output sample: output `i` is the median of `input[i - w/2 .. i + ceil(w/2))`, with
// both ends clipped to the sequence. Near the edges the window simply shrinks; there is
// no padding and no mirroring, so the first output is the median of the first
// `ceil(w/2)` samples only.
//
// The window store sees exactly one insert and at most one eviction per output sample,
// which keeps the whole filter at O(N log w).

use crate::ostree::{OrderStatTree, OrderStatistics};
use crate::types::{KernelError, Sample, check_len};

/// Runs the median filter with a caller-chosen window store.
///
/// `output` must have the same length as `input`. `window` is clamped to the input
/// length and must be at least 1.
pub fn sliding_median_with<T, S>(
    input: &[T],
    output: &mut [T],
    window: usize,
) -> Result<(), KernelError>
where
    T: Sample,
    S: OrderStatistics<T> + Default,
{
    check_len("median output", input.len(), output.len())?;
    if window == 0 {
        return Err(KernelError::ZeroWindow);
    }
    let size = input.len();
    if size == 0 {
        return Ok(());
    }

    let window = window.min(size);
    log::trace!("Sliding median over {size} samples with window {window}");

    // `lower` trails the output index by floor(w/2); once it turns positive the sample
    // just behind it leaves the window. `upper` leads by ceil(w/2) and feeds new samples
    // until it runs off the end.
    let mut lower = -((window / 2) as isize);
    let mut upper = window.div_ceil(2);

    let mut store = S::default();
    for &value in &input[..upper] {
        store.insert(value);
    }
    output[0] = store.median().unwrap_or_else(T::nan);

    for slot in output.iter_mut().skip(1) {
        lower += 1;
        upper += 1;
        if lower > 0 {
            let evicted = store.remove(input[lower as usize - 1]);
            debug_assert!(evicted, "evicted sample must be in the window");
        }
        if upper <= size {
            store.insert(input[upper - 1]);
        }
        *slot = store.median().unwrap_or_else(T::nan);
    }

    Ok(())
}

/// Sliding median into a caller-owned output buffer, backed by [`OrderStatTree`].
pub fn sliding_median_into<T: Sample>(
    input: &[T],
    output: &mut [T],
    window: usize,
) -> Result<(), KernelError> {
    sliding_median_with::<T, OrderStatTree<T>>(input, output, window)
}

/// Sliding median returning a freshly allocated output of the same length as `input`.
pub fn sliding_median<T: Sample>(input: &[T], window: usize) -> Result<Vec<T>, KernelError> {
    let mut output = vec![T::zero(); input.len()];
    sliding_median_into(input, &mut output, window)?;
    Ok(output)
}
