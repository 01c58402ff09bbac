// ========================================================================================
//
//                PARAMETER UNCERTAINTIES FROM A QUADRATIC CHI-SQUARE SURFACE
//
// ========================================================================================
//
// A search over one or two trial parameters (e.g. period and DM) produces a grid of
// chi-square values. Near the minimum that grid is a quadratic bowl, and its curvature
// is the inverse covariance of the parameters. This module fits the bowl by linear
// least squares, solving the normal equations with the closed-form inverses in
// `inverse`, and turns the fitted curvature into 1-sigma errors.
//
// Sample grids arrive in whatever precision the pipeline uses; every accumulation
// happens in `f64`.

use crate::inverse::{self, Matrix3, Matrix4};
use crate::types::{KernelError, Sample, check_len};
use thiserror::Error;

/// Why a chi-square grid could not produce parameter errors.
#[derive(Error, Debug)]
pub enum FitError {
    #[error(transparent)]
    Shape(#[from] KernelError),

    #[error(
        "The {order}x{order} normal-equations matrix is singular; the chi-square grid does not constrain a quadratic fit."
    )]
    SingularSystem { order: usize },
}

/// Powers 1 through 4 of one coordinate axis, computed once so the O(m*n) double loop
/// only multiplies cached values.
struct AxisPowers {
    p1: Vec<f64>,
    p2: Vec<f64>,
    p3: Vec<f64>,
    p4: Vec<f64>,
}

impl AxisPowers {
    fn new<T: Sample>(axis: &[T]) -> Self {
        let n = axis.len();
        let mut powers = Self {
            p1: Vec::with_capacity(n),
            p2: Vec::with_capacity(n),
            p3: Vec::with_capacity(n),
            p4: Vec::with_capacity(n),
        };
        for v in axis {
            let x = v.to_f64().unwrap_or(f64::NAN);
            let x2 = x * x;
            let x3 = x2 * x;
            powers.p1.push(x);
            powers.p2.push(x2);
            powers.p3.push(x3);
            powers.p4.push(x3 * x);
        }
        powers
    }
}

#[inline(always)]
fn as_f64<T: Sample>(v: T) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}

/// The fitted parabola `z = a*x^2 + b*x + c` through a 1-D chi-square curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveFit {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl CurveFit {
    /// Least-squares fit of a parabola to `chisq` sampled at `x`.
    ///
    /// `x` and `chisq` must have the same length. Returns
    /// [`FitError::SingularSystem`] when the samples cannot pin down three
    /// coefficients (fewer than three distinct abscissae).
    pub fn fit<T: Sample>(x: &[T], chisq: &[T]) -> Result<Self, FitError> {
        check_len("chi-square curve", x.len(), chisq.len())?;

        let xp = AxisPowers::new(x);
        let mut a: Matrix3 = [[0.0; 3]; 3];
        let mut rhs = [0.0; 3];

        for (i, &z) in chisq.iter().enumerate() {
            let z = as_f64(z);
            a[0][0] += xp.p4[i];
            a[0][1] += xp.p3[i];
            a[0][2] += xp.p2[i];
            a[1][2] += xp.p1[i];
            a[2][2] += 1.0;

            rhs[0] += xp.p2[i] * z;
            rhs[1] += xp.p1[i] * z;
            rhs[2] += z;
        }
        a[1][0] = a[0][1];
        a[1][1] = a[0][2];
        a[2][0] = a[0][2];
        a[2][1] = a[1][2];

        let inv = inverse::invert_3x3(&a).ok_or_else(|| {
            log::warn!(
                "Quadratic curve fit over {} samples is singular; no error estimate.",
                x.len()
            );
            FitError::SingularSystem { order: 3 }
        })?;
        let [a, b, c] = inverse::mul_vec(&inv, &rhs);
        Ok(Self { a, b, c })
    }

    /// Second derivative of the fitted curve.
    pub fn curvature(&self) -> f64 {
        2.0 * self.a
    }

    /// 1-sigma error on `x`, the inverse square root of the curvature.
    pub fn error(&self) -> f64 {
        (1.0 / self.curvature()).abs().sqrt()
    }

    /// Position of the vertex, `-b / 2a`.
    pub fn minimum(&self) -> f64 {
        -self.b / (2.0 * self.a)
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        (self.a * x + self.b) * x + self.c
    }
}

/// The fitted surface `z = a*x^2 + 2b*x*y + c*y^2 + d` through a 2-D chi-square grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceFit {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl SurfaceFit {
    /// Least-squares fit over the outer-product grid of `x` (length n, fastest axis)
    /// and `y` (length m). `chisq` is row-major `m x n`: the value at `(x[j], y[i])`
    /// lives at `chisq[i * n + j]`.
    pub fn fit<T: Sample>(x: &[T], y: &[T], chisq: &[T]) -> Result<Self, FitError> {
        let n = x.len();
        let m = y.len();
        check_len("chi-square grid", m * n, chisq.len())?;

        let xp = AxisPowers::new(x);
        let yp = AxisPowers::new(y);

        let mut a: Matrix4 = [[0.0; 4]; 4];
        let mut rhs = [0.0; 4];

        for (i, row) in chisq.chunks_exact(n.max(1)).take(m).enumerate() {
            let (y1, y2, y3, y4) = (yp.p1[i], yp.p2[i], yp.p3[i], yp.p4[i]);
            for (j, &z) in row.iter().enumerate() {
                let z = as_f64(z);
                let (x1, x2, x3, x4) = (xp.p1[j], xp.p2[j], xp.p3[j], xp.p4[j]);

                a[0][0] += x4;
                a[0][1] += 2.0 * x3 * y1;
                a[0][2] += x2 * y2;
                a[0][3] += x2;
                a[1][1] += 4.0 * x2 * y2;
                a[1][2] += 2.0 * x1 * y3;
                a[1][3] += 2.0 * x1 * y1;
                a[2][2] += y4;
                a[2][3] += y2;
                a[3][3] += 1.0;

                rhs[0] += x2 * z;
                rhs[1] += 2.0 * x1 * y1 * z;
                rhs[2] += y2 * z;
                rhs[3] += z;
            }
        }
        for r in 1..4 {
            for col in 0..r {
                a[r][col] = a[col][r];
            }
        }

        let inv = inverse::invert_4x4(&a).ok_or_else(|| {
            log::warn!("Quadratic surface fit over a {m}x{n} grid is singular; no error estimate.");
            FitError::SingularSystem { order: 4 }
        })?;
        let [a, b, c, d] = inverse::mul_vec(&inv, &rhs);
        Ok(Self { a, b, c, d })
    }

    /// Determinant of the 2x2 curvature block `[[a, b], [b, c]]`.
    pub fn curvature_determinant(&self) -> f64 {
        self.a * self.c - self.b * self.b
    }

    /// Marginal 1-sigma errors `(xerr, yerr)` from the inverse curvature block.
    pub fn errors(&self) -> (f64, f64) {
        let det = self.curvature_determinant();
        ((self.c / det).abs().sqrt(), (self.a / det).abs().sqrt())
    }

    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        self.a * x * x + 2.0 * self.b * x * y + self.c * y * y + self.d
    }
}

/// 1-sigma error of a single parameter from its chi-square curve.
pub fn error_from_chisq_curve<T: Sample>(x: &[T], chisq: &[T]) -> Result<f64, FitError> {
    CurveFit::fit(x, chisq).map(|fit| fit.error())
}

/// Marginal 1-sigma errors `(xerr, yerr)` of two parameters from their chi-square grid.
pub fn error_from_chisq_surface<T: Sample>(
    x: &[T],
    y: &[T],
    chisq: &[T],
) -> Result<(f64, f64), FitError> {
    SurfaceFit::fit(x, y, chisq).map(|fit| fit.errors())
}
