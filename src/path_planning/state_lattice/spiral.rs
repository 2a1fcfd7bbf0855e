//! Curvature-polynomial spirals for State Lattice edges
//!
//! Lattice edges are paths whose curvature is a cubic or quintic polynomial
//! in arc length. Position and heading are integrated numerically with a
//! trapezoidal rule, so accuracy improves with sampling density.

use nalgebra::{Matrix3, Vector3};

use crate::common::LatticePose;

use super::config::MAX_PATH_SAMPLES;

/// One sample along a spiral
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PathSample {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub curvature: f64,
    /// dk/ds at this sample [1/m^2]
    pub curvature_rate: f64,
}

/// Fixed-capacity buffer of path samples.
///
/// Sized to `MAX_PATH_SAMPLES`; configuration validation guarantees no
/// lattice edge needs more.
#[derive(Debug, Clone)]
pub struct PathSamples {
    samples: [PathSample; MAX_PATH_SAMPLES],
    len: usize,
    arc_length: f64,
}

impl PathSamples {
    pub fn new() -> Self {
        Self {
            samples: [PathSample::default(); MAX_PATH_SAMPLES],
            len: 0,
            arc_length: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn arc_length(&self) -> f64 {
        self.arc_length
    }

    pub fn as_slice(&self) -> &[PathSample] {
        &self.samples[..self.len]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathSample> {
        self.as_slice().iter()
    }

    pub fn first(&self) -> Option<&PathSample> {
        self.as_slice().first()
    }

    pub fn last(&self) -> Option<&PathSample> {
        self.as_slice().last()
    }
}

impl Default for PathSamples {
    fn default() -> Self {
        Self::new()
    }
}

/// Curvature as a polynomial of arc length:
/// k(s) = a0 + a1*s + a2*s^2 + a3*s^3 + a4*s^4 + a5*s^5
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvaturePolynomial {
    coefficients: [f64; 6],
}

impl CurvaturePolynomial {
    /// Cubic spiral through k(0)=p0, k(sG/3)=p1, k(2sG/3)=p2, k(sG)=p3
    pub fn cubic(p0: f64, p1: f64, p2: f64, p3: f64, s_g: f64) -> Self {
        let a = p0;
        let b = -(11.0 * p0 / 2.0 - 9.0 * p1 + 9.0 * p2 / 2.0 - p3) / s_g;
        let c = (9.0 * p0 - 45.0 * p1 / 2.0 + 18.0 * p2 - 9.0 * p3 / 2.0) / s_g.powi(2);
        let d = -(9.0 * p0 / 2.0 - 27.0 * p1 / 2.0 + 27.0 * p2 / 2.0 - 9.0 * p3 / 2.0)
            / s_g.powi(3);

        Self {
            coefficients: [a, b, c, d, 0.0, 0.0],
        }
    }

    /// Quintic spiral matching start curvature, curvature rate and curvature
    /// acceleration, plus k(sG/3)=p3, k(2sG/3)=p4, k(sG)=p5
    pub fn quintic(p0: f64, dk0: f64, ddk0: f64, p3: f64, p4: f64, p5: f64, s_g: f64) -> Self {
        let a0 = p0;
        let a1 = dk0;
        let a2 = ddk0 / 2.0;

        // Solve in normalized arc length u = s / sG for c_i = a_i * sG^i
        let knots: [f64; 3] = [1.0 / 3.0, 2.0 / 3.0, 1.0];
        let targets = [p3, p4, p5];
        let c1 = a1 * s_g;
        let c2 = a2 * s_g * s_g;

        let a_matrix = Matrix3::from_fn(|row, col| knots[row].powi(col as i32 + 3));
        let b = Vector3::from_fn(|row, _| {
            let u = knots[row];
            targets[row] - (a0 + c1 * u + c2 * u * u)
        });

        // The knot matrix is constant and non-singular
        let c = a_matrix.lu().solve(&b).unwrap_or_else(|| Vector3::zeros());

        Self {
            coefficients: [
                a0,
                a1,
                a2,
                c[0] / s_g.powi(3),
                c[1] / s_g.powi(4),
                c[2] / s_g.powi(5),
            ],
        }
    }

    pub fn coefficients(&self) -> &[f64; 6] {
        &self.coefficients
    }

    /// Curvature at arc length `s`
    pub fn curvature(&self, s: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &a| acc * s + a)
    }

    /// dk/ds at arc length `s`
    pub fn curvature_rate(&self, s: f64) -> f64 {
        self.coefficients
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .fold(0.0, |acc, (i, &a)| acc * s + i as f64 * a)
    }
}

/// Sample a spiral starting at `start` into `out`.
///
/// Produces `ceil(arc_length / step) + 1` samples evenly spread over the
/// arc length. The first sample is exactly the start pose.
pub fn sample_path(
    start: &LatticePose,
    polynomial: &CurvaturePolynomial,
    arc_length: f64,
    step: f64,
    out: &mut PathSamples,
) {
    let wanted = (arc_length / step).ceil() as usize + 1;
    debug_assert!(
        wanted <= MAX_PATH_SAMPLES,
        "path of length {} needs {} samples",
        arc_length,
        wanted
    );
    let n = wanted.clamp(2, MAX_PATH_SAMPLES);
    let ds = arc_length / (n - 1) as f64;

    out.arc_length = arc_length;
    out.len = n;
    out.samples[0] = PathSample {
        x: start.x,
        y: start.y,
        heading: start.heading,
        curvature: start.curvature,
        curvature_rate: polynomial.curvature_rate(0.0),
    };

    let mut prev = out.samples[0];
    let (mut prev_sin, mut prev_cos) = prev.heading.sin_cos();

    for i in 1..n {
        let s = if i == n - 1 { arc_length } else { i as f64 * ds };
        let curvature = polynomial.curvature(s);
        let heading = prev.heading + 0.5 * (prev.curvature + curvature) * ds;
        let (sin, cos) = heading.sin_cos();

        let sample = PathSample {
            x: prev.x + 0.5 * (prev_cos + cos) * ds,
            y: prev.y + 0.5 * (prev_sin + sin) * ds,
            heading,
            curvature,
            curvature_rate: polynomial.curvature_rate(s),
        };

        out.samples[i] = sample;
        prev = sample;
        prev_sin = sin;
        prev_cos = cos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cubic_boundary_conditions() {
        let poly = CurvaturePolynomial::cubic(0.01, 0.05, -0.02, 0.03, 12.0);

        assert_relative_eq!(poly.curvature(0.0), 0.01, epsilon = 1e-12);
        assert_relative_eq!(poly.curvature(4.0), 0.05, epsilon = 1e-12);
        assert_relative_eq!(poly.curvature(8.0), -0.02, epsilon = 1e-12);
        assert_relative_eq!(poly.curvature(12.0), 0.03, epsilon = 1e-12);
    }

    #[test]
    fn test_quintic_boundary_conditions() {
        let poly = CurvaturePolynomial::quintic(0.02, 0.004, -0.001, 0.01, -0.01, 0.0, 15.0);

        assert_relative_eq!(poly.curvature(0.0), 0.02, epsilon = 1e-12);
        assert_relative_eq!(poly.curvature_rate(0.0), 0.004, epsilon = 1e-12);
        assert_relative_eq!(poly.coefficients()[2] * 2.0, -0.001, epsilon = 1e-12);
        assert_relative_eq!(poly.curvature(5.0), 0.01, epsilon = 1e-10);
        assert_relative_eq!(poly.curvature(10.0), -0.01, epsilon = 1e-10);
        assert_relative_eq!(poly.curvature(15.0), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_curvature_rate_matches_finite_difference() {
        let poly = CurvaturePolynomial::quintic(0.0, 0.01, 0.002, 0.05, 0.02, -0.03, 10.0);
        let h = 1e-6;
        for &s in &[0.5, 3.0, 7.5] {
            let numeric = (poly.curvature(s + h) - poly.curvature(s - h)) / (2.0 * h);
            assert_relative_eq!(poly.curvature_rate(s), numeric, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_sample_endpoints_and_count() {
        let start = LatticePose::new(1.0, -2.0, 0.3, 0.01);
        let poly = CurvaturePolynomial::cubic(0.01, 0.04, 0.02, -0.01, 10.2);
        let mut samples = PathSamples::new();
        sample_path(&start, &poly, 10.2, 0.5, &mut samples);

        assert_eq!(samples.len(), 22);
        let first = samples.first().unwrap();
        assert_eq!(first.x, start.x);
        assert_eq!(first.y, start.y);
        assert_eq!(first.heading, start.heading);
        assert_eq!(first.curvature, start.curvature);
        assert_relative_eq!(samples.last().unwrap().curvature, -0.01, epsilon = 1e-9);
    }

    #[test]
    fn test_straight_path() {
        let start = LatticePose::new(0.0, 0.0, 0.0, 0.0);
        let poly = CurvaturePolynomial::cubic(0.0, 0.0, 0.0, 0.0, 10.0);
        let mut samples = PathSamples::new();
        sample_path(&start, &poly, 10.0, 0.5, &mut samples);

        assert_eq!(samples.len(), 21);
        for (i, sample) in samples.iter().enumerate() {
            assert_relative_eq!(sample.x, i as f64 * 0.5, epsilon = 1e-9);
            assert!(sample.y.abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_curvature_follows_arc() {
        // Quarter circle of radius 10
        let radius = 10.0;
        let k = 1.0 / radius;
        let length = std::f64::consts::FRAC_PI_2 * radius;
        let start = LatticePose::new(0.0, 0.0, 0.0, k);
        let poly = CurvaturePolynomial::cubic(k, k, k, k, length);
        let mut samples = PathSamples::new();
        sample_path(&start, &poly, length, 0.2, &mut samples);

        let end = samples.last().unwrap();
        assert_relative_eq!(end.heading, std::f64::consts::FRAC_PI_2, epsilon = 1e-9);
        assert_relative_eq!(end.x, radius, epsilon = 1e-2);
        assert_relative_eq!(end.y, radius, epsilon = 1e-2);
    }

    #[test]
    fn test_sampling_is_pure() {
        let start = LatticePose::new(3.0, 4.0, -0.2, 0.0);
        let poly = CurvaturePolynomial::quintic(0.0, 0.001, 0.0, 0.02, -0.02, 0.0, 20.0);
        let mut a = PathSamples::new();
        let mut b = PathSamples::new();
        sample_path(&start, &poly, 20.0, 0.5, &mut a);
        sample_path(&start, &poly, 20.0, 0.5, &mut b);
        assert_eq!(a.as_slice(), b.as_slice());
    }
}
