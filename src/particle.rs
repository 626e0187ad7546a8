use derive_more::Display;
use glam::DMat3;
use glam::DVec3;

/// Stable 64-bit particle identity, unique across all ranks.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub u64);

/// The particle kinds the neighbor loops distinguish. Gas particles
/// contribute to and receive all fluid quantities; sinks only sample
/// the surrounding fluid; everything else is ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParticleKind {
    Gas,
    Sink,
    Other,
}

impl ParticleKind {
    pub fn participates_in_density(&self) -> bool {
        matches!(self, ParticleKind::Gas | ParticleKind::Sink)
    }

    pub(crate) fn to_wire(self) -> i32 {
        match self {
            ParticleKind::Gas => 0,
            ParticleKind::Sink => 1,
            ParticleKind::Other => 2,
        }
    }

    pub(crate) fn from_wire(kind: i32) -> Self {
        match kind {
            0 => ParticleKind::Gas,
            1 => ParticleKind::Sink,
            _ => ParticleKind::Other,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Particle {
    pub id: ParticleId,
    pub kind: ParticleKind,
    pub position: DVec3,
    /// Velocity predictor, the value used in all interactions.
    pub velocity: DVec3,
    pub mass: f64,
    /// Current smoothing length. Adapted by the density iteration.
    pub hsml: f64,
    /// Index into the power-of-two timestep hierarchy.
    pub time_bin: u8,
    /// Whether the particle is integrated on the current step.
    /// Maintained by the external time stepper.
    pub active: bool,
    /// Set once the smoothing length iteration has converged for this
    /// particle during the current density pass.
    pub density_done: bool,
}

impl Particle {
    pub fn gas(id: u64, position: DVec3, mass: f64, hsml: f64) -> Self {
        Self {
            id: ParticleId(id),
            kind: ParticleKind::Gas,
            position,
            velocity: DVec3::ZERO,
            mass,
            hsml,
            time_bin: 0,
            active: true,
            density_done: false,
        }
    }
}

/// Fluid state attached to gas particles (and, where it applies, to
/// sinks sampling the surrounding gas). Lives in an array parallel to
/// the particle array.
#[derive(Clone, Debug)]
pub struct GasState {
    pub density: f64,
    pub pressure: f64,
    /// Entropy function A, with P = A ρ^γ.
    pub entropy: f64,
    /// Kernel-weighted effective neighbor count.
    pub num_ngb: f64,
    /// Raw Σ m_j ∂W/∂h accumulator.
    pub dhsml_density: f64,
    /// The dimensionless f = 1/(1 + (h/3ρ) dρ/dh) correction.
    pub dhsml_factor: f64,
    pub div_vel: f64,
    pub curl_vel: DVec3,
    pub curl_vel_mag: f64,
    /// Mass-weighted mean velocity of the surrounding fluid; the
    /// quantity sinks sample from the gas.
    pub smoothed_velocity: DVec3,
    /// Inverse of the kernel-weighted second-moment matrix of
    /// neighbor offsets. Only valid while `matrix_fallback` is false.
    pub nv_t: DMat3,
    pub condition_number: f64,
    /// True when the moment matrix was too ill-conditioned and the
    /// gradients below were computed with the SPH estimator instead.
    pub matrix_fallback: bool,
    pub grad_density: DVec3,
    pub grad_pressure: DVec3,
    /// Columns are the gradients of the velocity components:
    /// `x_axis` = ∇v_x and so on.
    pub grad_velocity: DMat3,
    /// Largest pair distance seen during the gradient walk.
    pub max_ngb_distance: f64,
}

impl Default for GasState {
    fn default() -> Self {
        Self {
            density: 0.0,
            pressure: 0.0,
            entropy: 0.0,
            num_ngb: 0.0,
            dhsml_density: 0.0,
            dhsml_factor: 1.0,
            div_vel: 0.0,
            curl_vel: DVec3::ZERO,
            curl_vel_mag: 0.0,
            smoothed_velocity: DVec3::ZERO,
            nv_t: DMat3::ZERO,
            condition_number: 0.0,
            matrix_fallback: false,
            grad_density: DVec3::ZERO,
            grad_pressure: DVec3::ZERO,
            grad_velocity: DMat3::ZERO,
            max_ngb_distance: 0.0,
        }
    }
}

/// The per-rank particle storage the passes operate on. Particles are
/// created by the external domain decomposition; the core only
/// mutates smoothing lengths and the gas state.
pub struct ParticleStore {
    pub particles: Vec<Particle>,
    pub gas: Vec<GasState>,
}

impl ParticleStore {
    pub fn new(particles: Vec<Particle>) -> Self {
        let gas = particles.iter().map(|_| GasState::default()).collect();
        Self { particles, gas }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn local_max_hsml(&self) -> f64 {
        self.particles
            .iter()
            .map(|p| p.hsml)
            .fold(0.0, |max, h| max.max(h))
    }
}

#[cfg(test)]
mod tests {
    use super::ParticleKind;

    #[test]
    fn kind_wire_roundtrip() {
        for kind in [ParticleKind::Gas, ParticleKind::Sink, ParticleKind::Other] {
            assert_eq!(ParticleKind::from_wire(kind.to_wire()), kind);
        }
    }
}
