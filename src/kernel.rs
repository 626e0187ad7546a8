use std::f64::consts::PI;

/// 3D normalization of the spline kernel, to be divided by h³.
const NORMALIZATION: f64 = 8.0 / PI;

/// Per-target kernel descriptor. Caches the inverse powers of the
/// smoothing length so the per-pair evaluations stay cheap.
///
/// The radial form is the cubic spline (Monaghan & Lattanzio 1985)
/// with compact support radius h: W(r, h) = 8/(π h³) w(r/h).
#[derive(Clone, Copy, Debug)]
pub struct Kernel {
    pub h: f64,
    hinv: f64,
    hinv3: f64,
    hinv4: f64,
}

fn spline(u: f64) -> f64 {
    if u < 0.5 {
        1.0 - 6.0 * u.powi(2) + 6.0 * u.powi(3)
    } else if u < 1.0 {
        2.0 * (1.0 - u).powi(3)
    } else {
        0.0
    }
}

fn spline_derivative(u: f64) -> f64 {
    if u < 0.5 {
        -12.0 * u + 18.0 * u.powi(2)
    } else if u < 1.0 {
        -6.0 * (1.0 - u).powi(2)
    } else {
        0.0
    }
}

impl Kernel {
    pub fn new(h: f64) -> Self {
        debug_assert!(h > 0.0);
        let hinv = 1.0 / h;
        Self {
            h,
            hinv,
            hinv3: hinv.powi(3),
            hinv4: hinv.powi(4),
        }
    }

    /// W(r, h)
    pub fn value(&self, r: f64) -> f64 {
        NORMALIZATION * self.hinv3 * spline(r * self.hinv)
    }

    /// dW/dr, negative inside the support.
    pub fn derivative(&self, r: f64) -> f64 {
        NORMALIZATION * self.hinv4 * spline_derivative(r * self.hinv)
    }

    /// ∂W/∂h at fixed r. Since W = C/h³ w(r/h) this is
    /// −C/h⁴ (3 w(u) + u w'(u)).
    pub fn dh_derivative(&self, r: f64) -> f64 {
        let u = r * self.hinv;
        -NORMALIZATION * self.hinv4 * (3.0 * spline(u) + u * spline_derivative(u))
    }

    /// The volume of the kernel support. Multiplying kernel values by
    /// this gives the kernel-weighted neighbor count.
    pub fn volume(&self) -> f64 {
        4.0 * PI / 3.0 * self.h.powi(3)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::Kernel;
    use crate::test_utils::assert_relative_eq;

    /// Radial Simpson integration of f(r) r² over [0, r_max].
    fn radial_integral(f: impl Fn(f64) -> f64, r_max: f64) -> f64 {
        let n = 10000;
        let dr = r_max / n as f64;
        let g = |r: f64| f(r) * r * r;
        let mut sum = g(0.0) + g(r_max);
        for i in 1..n {
            let weight = if i % 2 == 0 { 2.0 } else { 4.0 };
            sum += weight * g(i as f64 * dr);
        }
        sum * dr / 3.0
    }

    #[test]
    fn kernel_integrates_to_one() {
        for h in [0.3, 1.0, 2.5] {
            let kernel = Kernel::new(h);
            let integral = 4.0 * PI * radial_integral(|r| kernel.value(r), h);
            assert_relative_eq(integral, 1.0, 1e-9);
        }
    }

    #[test]
    fn kernel_is_compactly_supported() {
        let kernel = Kernel::new(1.5);
        assert_eq!(kernel.value(1.5), 0.0);
        assert_eq!(kernel.value(2.0), 0.0);
        assert_eq!(kernel.derivative(1.5), 0.0);
        assert_eq!(kernel.dh_derivative(1.5), -0.0);
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let kernel = Kernel::new(1.3);
        let eps = 1e-7;
        for r in [0.1, 0.3, 0.64, 0.65, 0.66, 1.0, 1.2] {
            let numeric = (kernel.value(r + eps) - kernel.value(r - eps)) / (2.0 * eps);
            assert_relative_eq(kernel.derivative(r), numeric, 1e-5);
        }
    }

    #[test]
    fn dh_derivative_matches_finite_difference() {
        let eps = 1e-7;
        for r in [0.0, 0.2, 0.5, 0.9, 1.1] {
            let numeric =
                (Kernel::new(1.2 + eps).value(r) - Kernel::new(1.2 - eps).value(r)) / (2.0 * eps);
            assert_relative_eq(Kernel::new(1.2).dh_derivative(r), numeric, 1e-5);
        }
    }

    #[test]
    fn weighted_count_of_uniform_field_is_the_ball_count() {
        // For Σ_j W(r_ij) · volume() over a fine uniform lattice, the
        // result approaches the number of lattice points in the ball.
        let kernel = Kernel::new(1.0);
        let spacing = 0.05;
        let mut weighted = 0.0;
        let mut count = 0;
        let n = (1.0 / spacing) as i64 + 1;
        for i in -n..=n {
            for j in -n..=n {
                for k in -n..=n {
                    let r = (spacing * spacing * ((i * i + j * j + k * k) as f64)).sqrt();
                    if r < 1.0 {
                        count += 1;
                        weighted += kernel.value(r) * kernel.volume();
                    }
                }
            }
        }
        assert_relative_eq(weighted, count as f64, 0.05);
    }
}
