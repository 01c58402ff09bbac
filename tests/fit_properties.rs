use approx::assert_abs_diff_eq;
use astrokern::inverse::{invert_3x3, invert_4x4};
use astrokern::{CurveFit, FitError, SurfaceFit, error_from_chisq_curve, error_from_chisq_surface};

#[test]
fn parabolic_chisq_gives_half_unit_error() {
    let x = [-1.5f64, -1.0, -0.5, 0.0, 0.5, 1.0, 1.5];
    let chisq: Vec<f64> = x.iter().map(|v| 2.0 * v * v).collect();
    let xerr = error_from_chisq_curve(&x, &chisq).unwrap();
    assert_abs_diff_eq!(xerr, 0.5, epsilon = 1e-9);
}

#[test]
fn single_precision_grids_are_accumulated_in_double() {
    let x: Vec<f32> = (-5..=5).map(|i| i as f32 * 0.1).collect();
    let chisq: Vec<f32> = x.iter().map(|v| 50.0 * v * v + 12.0).collect();
    let fit = CurveFit::fit(&x, &chisq).unwrap();
    assert_abs_diff_eq!(fit.a, 50.0, epsilon = 1e-3);
    assert_abs_diff_eq!(fit.error(), 0.1, epsilon = 1e-5);
}

#[test]
fn surface_errors_follow_inverse_curvature() {
    let x = [-0.2, -0.1, 0.0, 0.1, 0.2];
    let y = [-3.0, -1.0, 1.0, 3.0];
    let (a, b, c, d) = (100.0, 0.0, 0.25, 40.0);
    let chisq: Vec<f64> = y
        .iter()
        .flat_map(|&yv| {
            x.iter()
                .map(move |&xv| a * xv * xv + 2.0 * b * xv * yv + c * yv * yv + d)
        })
        .collect();

    let fit = SurfaceFit::fit(&x, &y, &chisq).unwrap();
    assert_abs_diff_eq!(fit.evaluate(0.0, 0.0), d, epsilon = 1e-8);
    let (xerr, yerr) = error_from_chisq_surface(&x, &y, &chisq).unwrap();
    assert_abs_diff_eq!(xerr, 0.1, epsilon = 1e-9);
    assert_abs_diff_eq!(yerr, 2.0, epsilon = 1e-9);
}

#[test]
fn degenerate_grid_reports_singular_not_panic() {
    let x = [2.0, 2.0, 2.0, 2.0];
    let chisq = [1.0, 1.0, 1.0, 1.0];
    assert!(matches!(
        error_from_chisq_curve(&x, &chisq),
        Err(FitError::SingularSystem { order: 3 })
    ));
}

#[test]
fn inverters_are_exposed_for_direct_use() {
    let m3 = [[4.0, 7.0, 2.0], [3.0, 6.0, 1.0], [2.0, 5.0, 3.0]];
    let inv3 = invert_3x3(&m3).unwrap();
    assert_abs_diff_eq!(inv3[0][0], 13.0 / 9.0, epsilon = 1e-12);

    let identity = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];
    assert_eq!(invert_4x4(&identity), Some(identity));
}
