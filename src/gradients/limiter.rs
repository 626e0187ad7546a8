use glam::DVec3;

const ALPHA_BASE: f64 = 0.25;
const ALPHA_MAX: f64 = 0.5;

/// Limiter aggressiveness for one particle. The base value is raised
/// once the condition number signals an untrustworthy matrix
/// estimator, up to the strict envelope bound at 0.5.
pub fn limiter_alpha(condition_number: f64) -> f64 {
    if condition_number > 100.0 {
        (ALPHA_BASE * condition_number / 100.0).min(ALPHA_MAX)
    } else {
        ALPHA_BASE
    }
}

/// Scale a raw gradient down until the half-kernel reconstruction of
/// the field stays within the locally observed min/max envelope,
/// with an optional overshoot tolerance. Leaves already compliant
/// gradients untouched, which also makes the limiter idempotent.
pub fn limit_gradient(
    gradient: &mut DVec3,
    delta_max: f64,
    delta_min: f64,
    alpha: f64,
    length: f64,
    tolerance: f64,
) {
    let norm = gradient.length();
    if norm == 0.0 || length == 0.0 {
        return;
    }
    let tight = delta_max.abs().min(delta_min.abs());
    let wide = delta_max.abs().max(delta_min.abs());
    let bound = if tolerance > 0.0 {
        tight + tolerance * wide
    } else {
        tight
    };
    let factor = bound / (alpha * length * norm);
    if factor < 1.0 {
        *gradient *= factor;
    }
}
