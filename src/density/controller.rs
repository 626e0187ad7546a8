use log::error;

use crate::parameters::HydroParameters;
use crate::particle::Particle;
use crate::particle::ParticleKind;

/// Multiplicative step of the unbracketed smoothing length search,
/// one octave in kernel volume: 1.26 ≈ 2^(1/3).
pub const HSML_STEP_FACTOR: f64 = 1.26;

/// Relative width below which a bracket counts as collapsed.
const BRACKET_COLLAPSE: f64 = 1e-3;

/// Lower and upper bound on the smoothing length of one particle
/// during the root finding iteration. Zero means the side has not
/// been established yet.
#[derive(Clone, Copy, Debug, Default)]
pub struct HsmlBracket {
    pub left: f64,
    pub right: f64,
}

impl HsmlBracket {
    pub fn is_collapsed(&self) -> bool {
        self.left > 0.0 && self.right > 0.0 && self.right - self.left < BRACKET_COLLAPSE * self.left
    }
}

pub enum HsmlUpdate {
    Converged,
    Retry(f64),
}

/// Decide, from the neighbour count of the last density evaluation,
/// whether a particle's smoothing length is converged, and propose
/// the next one if it is not.
pub fn update_smoothing_length(
    particle: &Particle,
    num_ngb: f64,
    dhsml_factor: f64,
    bracket: &mut HsmlBracket,
    parameters: &HydroParameters,
) -> HsmlUpdate {
    let target = parameters.des_num_ngb;
    let deviation = parameters.max_num_ngb_deviation;
    let hsml = particle.hsml;
    if (num_ngb - target).abs() <= deviation {
        return HsmlUpdate::Converged;
    }
    // Particles pinned against the allowed smoothing length range
    // keep their out-of-window neighbour count.
    if num_ngb > target + deviation && hsml <= 1.01 * parameters.min_gas_hsml {
        return HsmlUpdate::Converged;
    }
    if num_ngb < target - deviation && hsml >= 0.99 * parameters.max_gas_hsml {
        return HsmlUpdate::Converged;
    }
    if bracket.is_collapsed() {
        return HsmlUpdate::Converged;
    }
    if num_ngb < target - deviation {
        bracket.left = bracket.left.max(hsml);
    }
    if num_ngb > target + deviation {
        bracket.right = if bracket.right == 0.0 {
            hsml
        } else {
            bracket.right.min(hsml)
        };
    }
    let proposed = if bracket.left > 0.0 && bracket.right > 0.0 {
        // Midpoint in kernel volume.
        ((bracket.left.powi(3) + bracket.right.powi(3)) / 2.0).cbrt()
    } else if bracket.left == 0.0 && bracket.right == 0.0 {
        error!(
            "corrupt smoothing length bracket for particle {}: hsml = {}, num_ngb = {}",
            particle.id, hsml, num_ngb
        );
        panic!("neither side of the smoothing length bracket is set");
    } else if particle.kind == ParticleKind::Gas && (num_ngb - target).abs() < 0.5 * target {
        // Newton-like step using the dρ/dh factor of the previous
        // evaluation, kept inside one multiplicative octave.
        let factor = 1.0 - (num_ngb - target) / (3.0 * num_ngb) * dhsml_factor;
        hsml * factor.clamp(1.0 / HSML_STEP_FACTOR, HSML_STEP_FACTOR)
    } else if bracket.right == 0.0 {
        hsml * HSML_STEP_FACTOR
    } else {
        hsml / HSML_STEP_FACTOR
    };
    HsmlUpdate::Retry(proposed.clamp(parameters.min_gas_hsml, parameters.max_gas_hsml))
}
