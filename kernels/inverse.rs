//! Closed-form inverses of small dense matrices.
//!
//! The normal-equations systems built by [`crate::fit`] are at most 4x4, so the
//! adjugate formula is both exact and cheaper than any general factorization. A matrix
//! whose determinant is exactly zero has no inverse and is reported as `None`. There is
//! no tolerance: a nearly singular system still inverts, and callers decide what to do
//! with the (possibly huge) result.

/// A dense 3x3 matrix, indexed `[row][col]`.
pub type Matrix3 = [[f64; 3]; 3];

/// A dense 4x4 matrix, indexed `[row][col]`.
pub type Matrix4 = [[f64; 4]; 4];

/// Determinant of a 3x3 matrix by cofactor expansion along the first row.
#[inline]
pub fn determinant_3x3(m: &Matrix3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[2][1] * m[1][2])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Inverts a 3x3 matrix through its adjugate.
///
/// Returns `None` when the determinant is exactly zero.
pub fn invert_3x3(m: &Matrix3) -> Option<Matrix3> {
    let det = determinant_3x3(m);
    if det == 0.0 {
        return None;
    }
    let inv_det = 1.0 / det;

    Some([
        [
            (m[1][1] * m[2][2] - m[2][1] * m[1][2]) * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[1][0] * m[0][2] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            (m[1][0] * m[2][1] - m[2][0] * m[1][1]) * inv_det,
            (m[2][0] * m[0][1] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[1][0] * m[0][1]) * inv_det,
        ],
    ])
}

/// Inverts a 4x4 matrix through its adjugate.
///
/// The cofactors are assembled from the six 2x2 minors of the top two rows (`s*`) and
/// the six 2x2 minors of the bottom two rows (`c*`), which is the Laplace expansion of
/// the determinant along the first two rows. Returns `None` when the determinant is
/// exactly zero.
pub fn invert_4x4(a: &Matrix4) -> Option<Matrix4> {
    let s0 = a[0][0] * a[1][1] - a[1][0] * a[0][1];
    let s1 = a[0][0] * a[1][2] - a[1][0] * a[0][2];
    let s2 = a[0][0] * a[1][3] - a[1][0] * a[0][3];
    let s3 = a[0][1] * a[1][2] - a[1][1] * a[0][2];
    let s4 = a[0][1] * a[1][3] - a[1][1] * a[0][3];
    let s5 = a[0][2] * a[1][3] - a[1][2] * a[0][3];

    let c5 = a[2][2] * a[3][3] - a[3][2] * a[2][3];
    let c4 = a[2][1] * a[3][3] - a[3][1] * a[2][3];
    let c3 = a[2][1] * a[3][2] - a[3][1] * a[2][2];
    let c2 = a[2][0] * a[3][3] - a[3][0] * a[2][3];
    let c1 = a[2][0] * a[3][2] - a[3][0] * a[2][2];
    let c0 = a[2][0] * a[3][1] - a[3][0] * a[2][1];

    let det = s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0;
    if det == 0.0 {
        return None;
    }
    let inv_det = 1.0 / det;

    Some([
        [
            (a[1][1] * c5 - a[1][2] * c4 + a[1][3] * c3) * inv_det,
            (-a[0][1] * c5 + a[0][2] * c4 - a[0][3] * c3) * inv_det,
            (a[3][1] * s5 - a[3][2] * s4 + a[3][3] * s3) * inv_det,
            (-a[2][1] * s5 + a[2][2] * s4 - a[2][3] * s3) * inv_det,
        ],
        [
            (-a[1][0] * c5 + a[1][2] * c2 - a[1][3] * c1) * inv_det,
            (a[0][0] * c5 - a[0][2] * c2 + a[0][3] * c1) * inv_det,
            (-a[3][0] * s5 + a[3][2] * s2 - a[3][3] * s1) * inv_det,
            (a[2][0] * s5 - a[2][2] * s2 + a[2][3] * s1) * inv_det,
        ],
        [
            (a[1][0] * c4 - a[1][1] * c2 + a[1][3] * c0) * inv_det,
            (-a[0][0] * c4 + a[0][1] * c2 - a[0][3] * c0) * inv_det,
            (a[3][0] * s4 - a[3][1] * s2 + a[3][3] * s0) * inv_det,
            (-a[2][0] * s4 + a[2][1] * s2 - a[2][3] * s0) * inv_det,
        ],
        [
            (-a[1][0] * c3 + a[1][1] * c1 - a[1][2] * c0) * inv_det,
            (a[0][0] * c3 - a[0][1] * c1 + a[0][2] * c0) * inv_det,
            (-a[3][0] * s3 + a[3][1] * s1 - a[3][2] * s0) * inv_det,
            (a[2][0] * s3 - a[2][1] * s1 + a[2][2] * s0) * inv_det,
        ],
    ])
}

/// Dense matrix-vector product for the fixed-size systems above.
#[inline]
pub fn mul_vec<const N: usize>(m: &[[f64; N]; N], v: &[f64; N]) -> [f64; N] {
    let mut out = [0.0; N];
    for (row, acc) in m.iter().zip(out.iter_mut()) {
        *acc = row.iter().zip(v.iter()).map(|(a, b)| a * b).sum();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn product<const N: usize>(a: &[[f64; N]; N], b: &[[f64; N]; N]) -> [[f64; N]; N] {
        let mut out = [[0.0; N]; N];
        for i in 0..N {
            for j in 0..N {
                out[i][j] = (0..N).map(|k| a[i][k] * b[k][j]).sum();
            }
        }
        out
    }

    fn assert_identity<const N: usize>(m: &[[f64; N]; N]) {
        for (i, row) in m.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(value, expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn random_3x3_round_trip() {
        let mut rng = StdRng::seed_from_u64(0x3_3);
        for _ in 0..50 {
            let mut m = [[0.0; 3]; 3];
            for row in m.iter_mut() {
                for v in row.iter_mut() {
                    *v = rng.gen_range(-5.0..5.0);
                }
            }
            for (i, row) in m.iter_mut().enumerate() {
                row[i] += 8.0;
            }
            let inv = invert_3x3(&m).expect("non-singular matrix must invert");
            assert_identity(&product(&m, &inv));
            assert_identity(&product(&inv, &m));
        }
    }

    #[test]
    fn random_4x4_round_trip() {
        let mut rng = StdRng::seed_from_u64(0x4_4);
        for _ in 0..50 {
            let mut m = [[0.0; 4]; 4];
            for row in m.iter_mut() {
                for v in row.iter_mut() {
                    *v = rng.gen_range(-5.0..5.0);
                }
            }
            // Diagonal loading keeps the random draw comfortably away from singular.
            for (i, row) in m.iter_mut().enumerate() {
                row[i] += 10.0;
            }
            let inv = invert_4x4(&m).expect("non-singular matrix must invert");
            assert_identity(&product(&m, &inv));
        }
    }

    #[test]
    fn zero_row_is_singular() {
        let m3 = [[1.0, 2.0, 3.0], [0.0, 0.0, 0.0], [4.0, 5.0, 6.0]];
        assert!(invert_3x3(&m3).is_none());

        let m4 = [
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 1.0, 0.0],
        ];
        assert!(invert_4x4(&m4).is_none());
    }

    #[test]
    fn duplicated_rows_are_singular() {
        let m4 = [
            [2.0, 1.0, 0.0, 3.0],
            [2.0, 1.0, 0.0, 3.0],
            [0.0, 1.0, 4.0, 1.0],
            [7.0, 0.0, 1.0, 1.0],
        ];
        assert!(invert_4x4(&m4).is_none());
    }

    #[test]
    fn diagonal_inverse_is_reciprocal() {
        let m = [[2.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, -0.5]];
        let inv = invert_3x3(&m).unwrap();
        assert_abs_diff_eq!(inv[0][0], 0.5);
        assert_abs_diff_eq!(inv[1][1], 0.25);
        assert_abs_diff_eq!(inv[2][2], -2.0);
    }

    #[test]
    fn mul_vec_matches_hand_computation() {
        let m = [[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(mul_vec(&m, &[1.0, -1.0]), [-1.0, -1.0]);
    }
}
