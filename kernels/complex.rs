// Pointwise complex multiplication on split real/imaginary planes.
//
// Interleaved `(re, im)` pairs defeat auto-vectorization of the cross terms. Splitting
// both operands into planes first turns the product into four independent
// multiply-add streams over contiguous memory.

use crate::types::{KernelError, Sample, check_len};
use num_complex::Complex;

/// Deinterleaved scratch planes for [`complex_multiply`], reusable across calls.
#[derive(Debug, Default)]
pub struct ComplexPlanes<T> {
    xr: Vec<T>,
    xi: Vec<T>,
    yr: Vec<T>,
    yi: Vec<T>,
}

impl<T: Sample> ComplexPlanes<T> {
    pub fn new() -> Self {
        Self {
            xr: Vec::new(),
            xi: Vec::new(),
            yr: Vec::new(),
            yi: Vec::new(),
        }
    }

    fn split(values: &[Complex<T>], re: &mut Vec<T>, im: &mut Vec<T>) {
        re.clear();
        im.clear();
        re.extend(values.iter().map(|c| c.re));
        im.extend(values.iter().map(|c| c.im));
    }

    /// Overwrites `x` with the elementwise product `x * y`.
    pub fn multiply(&mut self, x: &mut [Complex<T>], y: &[Complex<T>]) -> Result<(), KernelError> {
        check_len("complex multiplier", x.len(), y.len())?;

        Self::split(x, &mut self.xr, &mut self.xi);
        Self::split(y, &mut self.yr, &mut self.yi);

        let planes = self
            .xr
            .iter()
            .zip(&self.xi)
            .zip(self.yr.iter().zip(&self.yi));
        for (out, ((&xr, &xi), (&yr, &yi))) in x.iter_mut().zip(planes) {
            out.re = xr * yr - xi * yi;
            out.im = xr * yi + xi * yr;
        }
        Ok(())
    }
}

/// Overwrites `x` with the elementwise product `x * y`.
///
/// Allocates its planes per call; hold a [`ComplexPlanes`] to reuse them.
pub fn complex_multiply<T: Sample>(
    x: &mut [Complex<T>],
    y: &[Complex<T>],
) -> Result<(), KernelError> {
    ComplexPlanes::new().multiply(x, y)
}
