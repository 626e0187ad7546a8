use glam::DVec3;

use crate::parameters::HydroParameters;
use crate::particle::Particle;
use crate::tree::TreeConfig;

pub fn assert_float_is_close(x: f64, y: f64) {
    assert!((x - y).abs() < 10.0 * f64::EPSILON, "{} {}", x, y)
}

pub fn assert_vec_is_close(x: DVec3, y: DVec3) {
    assert!((x - y).length() < 10.0 * f64::EPSILON, "{} {}", x, y)
}

pub fn assert_relative_eq(x: f64, y: f64, tolerance: f64) {
    assert!(
        (x - y).abs() <= tolerance * y.abs(),
        "{} is not within {} of {}",
        x,
        tolerance,
        y
    )
}

pub fn test_parameters() -> HydroParameters {
    HydroParameters {
        des_num_ngb: 32.0,
        max_num_ngb_deviation: 2.0,
        min_gas_hsml: 0.05,
        max_gas_hsml: f64::INFINITY,
        max_iter: 150,
        buffer_size_mib: 100,
        limiter_tolerance: 0.0,
        tree: TreeConfig::default(),
    }
}

/// A cubic lattice of `n_side`³ gas particles filling the box, with
/// smoothing lengths starting at twice the spacing.
pub fn particle_lattice(n_side: usize, box_side: f64, mass: f64) -> Vec<Particle> {
    let spacing = box_side / n_side as f64;
    let mut particles = Vec::with_capacity(n_side.pow(3));
    for i in 0..n_side {
        for j in 0..n_side {
            for k in 0..n_side {
                let pos = DVec3::new(
                    (i as f64 + 0.5) * spacing,
                    (j as f64 + 0.5) * spacing,
                    (k as f64 + 0.5) * spacing,
                );
                particles.push(Particle::gas(
                    particles.len() as u64,
                    pos,
                    mass,
                    2.0 * spacing,
                ));
            }
        }
    }
    particles
}
