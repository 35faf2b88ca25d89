//! Tooth orientation from a segmentation contour.
//!
//! Fits an ellipse to the contour points with the direct least-squares method
//! (Fitzgibbon et al., 1999) and reports the major-axis angle against the
//! vertical image axis, in degrees, folded into (−90, 90] so that 0 means an
//! upright tooth. Every failure mode (too few points, singular scatter
//! matrix, non-ellipse conic, degenerate axes) falls closed to 0.0; a bad
//! contour must never abort a fusion batch.

use nalgebra::{DMatrix, Matrix3, Vector3, Vector6};

use crate::core::model::Contour;

/// Contours shorter than this cannot constrain an ellipse orientation.
pub const MIN_CONTOUR_POINTS: usize = 5;

/// Rotation of the contour's best-fit ellipse in degrees, (−90, 90], with 0
/// meaning vertically upright. Returns 0.0 whenever the fit is impossible.
pub fn estimate_rotation(contour: &Contour) -> f32 {
    if contour.len() < MIN_CONTOUR_POINTS {
        return 0.0;
    }
    let points: Vec<[f64; 2]> = contour
        .iter()
        .map(|&[x, y]| [x as f64, y as f64])
        .collect();
    match major_axis_angle(&points) {
        Some(angle_from_x) => fold_to_vertical(angle_from_x.to_degrees()) as f32,
        None => 0.0,
    }
}

/// Convert a major-axis angle measured from +x into the clinical convention:
/// degrees from the vertical axis, folded into (−90, 90].
fn fold_to_vertical(angle_from_x_deg: f64) -> f64 {
    let mut rotation = 90.0 - angle_from_x_deg;
    while rotation > 90.0 {
        rotation -= 180.0;
    }
    while rotation <= -90.0 {
        rotation += 180.0;
    }
    rotation
}

/// Major-axis angle from +x, in radians, of the direct least-squares ellipse
/// fit over `points`. `None` on any numerical failure.
fn major_axis_angle(points: &[[f64; 2]]) -> Option<f64> {
    let coeffs = fit_conic_direct(points)?;
    let [a, b, c, d, e, f] = coeffs;

    // Must be an ellipse: discriminant B² − 4AC < 0.
    let denom = 4.0 * a * c - b * b;
    if denom <= 0.0 {
        return None;
    }

    // Ellipse center from the gradient system.
    let cx = (b * e - 2.0 * c * d) / denom;
    let cy = (b * d - 2.0 * a * e) / denom;

    // Conic value at the center decides which eigen-direction is major.
    let f_center = a * cx * cx + b * cx * cy + c * cy * cy + d * cx + e * cy + f;
    if f_center.abs() < 1e-15 {
        return None;
    }

    let axis_angle = if (a - c).abs() < 1e-15 && b.abs() < 1e-15 {
        0.0
    } else {
        0.5 * b.atan2(a - c)
    };

    // Semi-axis lengths from the eigenvalues of the quadratic part.
    let sum = a + c;
    let diff = ((a - c).powi(2) + b * b).sqrt();
    let lambda1 = (sum + diff) / 2.0;
    let lambda2 = (sum - diff) / 2.0;
    let axis1_sq = -f_center / lambda1;
    let axis2_sq = -f_center / lambda2;
    if axis1_sq <= 0.0 || axis2_sq <= 0.0 {
        return None;
    }

    // `axis_angle` points along the lambda1 eigen-direction; swap to the
    // major axis when the other one is longer.
    let angle = if axis1_sq >= axis2_sq {
        axis_angle
    } else {
        axis_angle + std::f64::consts::FRAC_PI_2
    };
    if !angle.is_finite() {
        return None;
    }
    Some(angle)
}

/// Direct least-squares conic fit: returns `[A, B, C, D, E, F]` of
/// `Ax² + Bxy + Cy² + Dx + Ey + F = 0`, constrained to the ellipse branch.
fn fit_conic_direct(points: &[[f64; 2]]) -> Option<[f64; 6]> {
    let n = points.len();
    if n < MIN_CONTOUR_POINTS {
        return None;
    }

    // Normalize for conditioning: shift to the centroid, scale so the mean
    // distance from it is ≈ √2.
    let (mx, my, scale) = normalization_params(points);

    let mut design = DMatrix::<f64>::zeros(n, 6);
    for (i, &[px, py]) in points.iter().enumerate() {
        let x = (px - mx) * scale;
        let y = (py - my) * scale;
        design[(i, 0)] = x * x;
        design[(i, 1)] = x * y;
        design[(i, 2)] = y * y;
        design[(i, 3)] = x;
        design[(i, 4)] = y;
        design[(i, 5)] = 1.0;
    }

    // Scatter matrix S = DᵀD, partitioned into 3×3 blocks.
    let s = design.transpose() * &design;
    let s11 = s.fixed_view::<3, 3>(0, 0).into_owned();
    let s12 = s.fixed_view::<3, 3>(0, 3).into_owned();
    let s22 = s.fixed_view::<3, 3>(3, 3).into_owned();

    // Ellipse constraint matrix: aᵀ C1 a = 4AC − B² > 0.
    let c1 = Matrix3::new(0.0, 0.0, 2.0, 0.0, -1.0, 0.0, 2.0, 0.0, 0.0);

    let s22_inv = s22.try_inverse()?;
    let reduced = s11 - s12 * s22_inv * s12.transpose();
    let system = c1.try_inverse()? * reduced;

    let quad = constrained_eigenvector(&system)?;
    let linear = -s22_inv * s12.transpose() * quad;

    let normalized = Vector6::new(quad[0], quad[1], quad[2], linear[0], linear[1], linear[2]);
    Some(denormalize_conic(&normalized, mx, my, scale))
}

fn normalization_params(points: &[[f64; 2]]) -> (f64, f64, f64) {
    let n = points.len() as f64;
    let mx: f64 = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let my: f64 = points.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist: f64 = points
        .iter()
        .map(|p| ((p[0] - mx).powi(2) + (p[1] - my).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let scale = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    (mx, my, scale)
}

/// Undo the normalization substitution x' = s(x − mx), y' = s(y − my).
fn denormalize_conic(c: &Vector6<f64>, mx: f64, my: f64, s: f64) -> [f64; 6] {
    let [a_, b_, c_, d_, e_, f_] = [c[0], c[1], c[2], c[3], c[4], c[5]];
    let s2 = s * s;
    let a = a_ * s2;
    let b = b_ * s2;
    let cc = c_ * s2;
    let d = -2.0 * a_ * s2 * mx - b_ * s2 * my + d_ * s;
    let e = -b_ * s2 * mx - 2.0 * c_ * s2 * my + e_ * s;
    let f =
        a_ * s2 * mx * mx + b_ * s2 * mx * my + c_ * s2 * my * my - d_ * s * mx - e_ * s * my + f_;
    [a, b, cc, d, e, f]
}

/// Eigenvector of `system` whose quadratic part satisfies the ellipse
/// constraint 4AC − B² > 0. The matrix is not symmetric, so eigenvalues come
/// from the characteristic cubic and eigenvectors from adjugate null vectors.
fn constrained_eigenvector(system: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let a = system;
    let trace = a[(0, 0)] + a[(1, 1)] + a[(2, 2)];
    let minor_sum = a[(0, 0)] * a[(1, 1)] - a[(0, 1)] * a[(1, 0)] + a[(0, 0)] * a[(2, 2)]
        - a[(0, 2)] * a[(2, 0)]
        + a[(1, 1)] * a[(2, 2)]
        - a[(1, 2)] * a[(2, 1)];
    let det = a.determinant();

    let mut best: Option<(f64, Vector3<f64>)> = None;
    for ev in real_cubic_roots(1.0, -trace, minor_sum, -det) {
        let shifted = system - Matrix3::identity() * ev;
        let Some(v) = null_vector(&shifted) else {
            continue;
        };
        let constraint = 4.0 * v[0] * v[2] - v[1] * v[1];
        if constraint > 0.0 {
            match best {
                Some((best_abs, _)) if ev.abs() >= best_abs => {}
                _ => best = Some((ev.abs(), v)),
            }
        }
    }
    best.map(|(_, v)| v)
}

/// Null vector of a near-singular 3×3 matrix: the largest-norm row of the
/// adjugate, which is proportional to the null space for a rank-2 matrix.
fn null_vector(m: &Matrix3<f64>) -> Option<Vector3<f64>> {
    let rows = [
        Vector3::new(
            m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)],
            -(m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)]),
            m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)],
        ),
        Vector3::new(
            -(m[(0, 1)] * m[(2, 2)] - m[(0, 2)] * m[(2, 1)]),
            m[(0, 0)] * m[(2, 2)] - m[(0, 2)] * m[(2, 0)],
            -(m[(0, 0)] * m[(2, 1)] - m[(0, 1)] * m[(2, 0)]),
        ),
        Vector3::new(
            m[(0, 1)] * m[(1, 2)] - m[(0, 2)] * m[(1, 1)],
            -(m[(0, 0)] * m[(1, 2)] - m[(0, 2)] * m[(1, 0)]),
            m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)],
        ),
    ];

    let mut best = &rows[0];
    let mut best_norm = best.norm_squared();
    for row in &rows[1..] {
        let n = row.norm_squared();
        if n > best_norm {
            best = row;
            best_norm = n;
        }
    }
    if best_norm < 1e-30 {
        return None;
    }
    Some(best / best_norm.sqrt())
}

/// Real roots of `a x³ + b x² + c x + d = 0` (one or three).
fn real_cubic_roots(a: f64, b: f64, c: f64, d: f64) -> Vec<f64> {
    let b = b / a;
    let c = c / a;
    let d = d / a;

    // Depressed form t³ + pt + q = 0 with x = t − b/3.
    let p = c - b * b / 3.0;
    let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;
    let shift = -b / 3.0;
    let disc = -4.0 * p * p * p - 27.0 * q * q;

    if disc >= 0.0 {
        let r = (-p / 3.0).sqrt();
        let cos_arg = if r.abs() < 1e-15 {
            0.0
        } else {
            (-q / (2.0 * r * r * r)).clamp(-1.0, 1.0)
        };
        let theta = cos_arg.acos();
        let two_r = 2.0 * r;
        vec![
            two_r * (theta / 3.0).cos() + shift,
            two_r * ((theta + 2.0 * std::f64::consts::PI) / 3.0).cos() + shift,
            two_r * ((theta + 4.0 * std::f64::consts::PI) / 3.0).cos() + shift,
        ]
    } else {
        let sqrt_disc = (q * q / 4.0 + p * p * p / 27.0).sqrt();
        let u = (-q / 2.0 + sqrt_disc).cbrt();
        let v = (-q / 2.0 - sqrt_disc).cbrt();
        vec![u + v + shift]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Points on an ellipse with semi-axes (a, b), rotated by `tilt` radians
    /// from the x axis, centered at (cx, cy).
    fn ellipse_contour(cx: f64, cy: f64, a: f64, b: f64, tilt: f64, n: usize) -> Contour {
        (0..n)
            .map(|i| {
                let t = 2.0 * std::f64::consts::PI * (i as f64) / (n as f64);
                let px = a * t.cos();
                let py = b * t.sin();
                let x = cx + tilt.cos() * px - tilt.sin() * py;
                let y = cy + tilt.sin() * px + tilt.cos() * py;
                [x.round() as i32, y.round() as i32]
            })
            .collect()
    }

    #[test]
    fn short_contour_yields_zero() {
        assert_eq!(estimate_rotation(&vec![]), 0.0);
        assert_eq!(estimate_rotation(&vec![[0, 0], [10, 0], [10, 10], [0, 10]]), 0.0);
    }

    #[test]
    fn degenerate_contour_yields_zero() {
        // All points identical: no ellipse to fit.
        let contour = vec![[5, 5]; 12];
        assert_eq!(estimate_rotation(&contour), 0.0);
    }

    #[test]
    fn collinear_contour_yields_zero() {
        let contour: Contour = (0..12).map(|i| [i * 10, i * 10]).collect();
        assert_eq!(estimate_rotation(&contour), 0.0);
    }

    #[test]
    fn upright_tooth_has_near_zero_rotation() {
        // Major axis vertical: tilt of the long axis is 90° from x.
        let contour = ellipse_contour(200.0, 300.0, 40.0, 120.0, 0.0, 48);
        let rotation = estimate_rotation(&contour);
        assert!(rotation.abs() < 3.0, "rotation {rotation} not upright");
    }

    #[test]
    fn tilted_tooth_recovers_tilt_sign_and_magnitude() {
        // Long axis rotated 20° off vertical.
        let tilt = (90.0_f64 - 20.0).to_radians();
        let contour = ellipse_contour(200.0, 300.0, 120.0, 40.0, tilt, 48);
        let rotation = estimate_rotation(&contour);
        assert!(
            (rotation - 20.0).abs() < 3.0,
            "rotation {rotation} not near 20°"
        );
    }

    #[test]
    fn rotation_stays_in_half_open_range() {
        for deg in [-85.0_f64, -45.0, 0.0, 30.0, 89.0] {
            let tilt = (90.0 - deg).to_radians();
            let contour = ellipse_contour(500.0, 500.0, 150.0, 60.0, tilt, 64);
            let rotation = estimate_rotation(&contour);
            assert!(
                rotation > -90.0 && rotation <= 90.0,
                "rotation {rotation} out of (-90, 90] for tilt {deg}"
            );
        }
    }

    #[test]
    fn fold_keeps_canonical_frame() {
        assert_eq!(fold_to_vertical(90.0), 0.0);
        assert_eq!(fold_to_vertical(0.0), 90.0);
        assert_eq!(fold_to_vertical(-45.0), -45.0);
        assert_eq!(fold_to_vertical(180.0), 90.0);
        assert_eq!(fold_to_vertical(135.0), -45.0);
    }
}
