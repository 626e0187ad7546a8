mod limiter;
mod matrix;

use glam::DMat3;
use glam::DVec3;

pub use limiter::limit_gradient;
pub use limiter::limiter_alpha;
pub use matrix::invert_with_condition_number;
pub use matrix::CONDITION_NUMBER_DANGER;

use crate::kernel::Kernel;
use crate::parameters::HydroParameters;
use crate::particle::ParticleKind;
use crate::particle::ParticleStore;
use crate::simulation_box::SimulationBox;
use crate::tree::NeighborTree;
use crate::walk::NeighborWalk;
use crate::walk::WalkComms;
use crate::walk::WalkVisitor;

/// The fields a gradient is reconstructed for: density, pressure and
/// the three velocity components.
const NUM_FIELDS: usize = 5;

#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "mpi", derive(mpi::traits::Equivalence))]
pub struct GradientQuery {
    pub pos: [f64; 3],
    pub vel: [f64; 3],
    pub hsml: f64,
    pub density: f64,
    pub pressure: f64,
    pub kind: i32,
    pub time_bin: i32,
}

/// Pairwise sums of one gradient target: the moment matrix, the
/// kernel-weighted difference sums of both estimators, the limiter
/// envelopes and the largest pair distance.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "mpi", derive(mpi::traits::Equivalence))]
pub struct GradientResult {
    /// Column-major Σ (m_j/ρ_i) W_ij dx ⊗ dx.
    pub moment_matrix: [f64; 9],
    /// Σ (m_j/ρ_i) W_ij Δφ dx per field, to be closed by NV_T.
    pub matrix_sums: [f64; 3 * NUM_FIELDS],
    /// Σ m_j (−W'_ij/r) Δφ dx per field, the SPH estimator sums.
    pub sph_sums: [f64; 3 * NUM_FIELDS],
    pub delta_max: [f64; NUM_FIELDS],
    pub delta_min: [f64; NUM_FIELDS],
    pub max_distance: f64,
}

impl Default for GradientResult {
    fn default() -> Self {
        Self {
            moment_matrix: [0.0; 9],
            matrix_sums: [0.0; 3 * NUM_FIELDS],
            sph_sums: [0.0; 3 * NUM_FIELDS],
            delta_max: [f64::NEG_INFINITY; NUM_FIELDS],
            delta_min: [f64::INFINITY; NUM_FIELDS],
            max_distance: 0.0,
        }
    }
}

pub struct GradientVisitor;

impl WalkVisitor for GradientVisitor {
    type Query = GradientQuery;
    type Result = GradientResult;

    fn is_active(&self, store: &ParticleStore, index: usize) -> bool {
        let particle = &store.particles[index];
        particle.active && particle.kind == ParticleKind::Gas
    }

    fn fill_query(&self, store: &ParticleStore, index: usize) -> GradientQuery {
        let particle = &store.particles[index];
        let gas = &store.gas[index];
        GradientQuery {
            pos: particle.position.to_array(),
            vel: particle.velocity.to_array(),
            hsml: particle.hsml,
            density: gas.density,
            pressure: gas.pressure,
            kind: particle.kind.to_wire(),
            time_bin: particle.time_bin as i32,
        }
    }

    fn search_ball(&self, query: &GradientQuery) -> (DVec3, f64) {
        (DVec3::from_array(query.pos), query.hsml)
    }

    fn symmetric(&self) -> bool {
        true
    }

    fn evaluate(
        &self,
        query: &GradientQuery,
        tree: &NeighborTree,
        store: &ParticleStore,
        box_: &SimulationBox,
    ) -> GradientResult {
        let pos = DVec3::from_array(query.pos);
        let vel = DVec3::from_array(query.vel);
        let own_kernel = Kernel::new(query.hsml);
        let own_fields = [query.density, query.pressure, vel.x, vel.y, vel.z];
        let mut result = GradientResult::default();
        for leaf in tree.iter_particles_in_kernel_union(box_, pos, query.hsml) {
            let neighbour = &store.particles[leaf.index];
            if neighbour.kind != ParticleKind::Gas {
                continue;
            }
            let state = &store.gas[leaf.index];
            let dist = box_.periodic_distance_vec(&neighbour.position, &pos);
            let r = dist.length();
            if r == 0.0 {
                continue;
            }
            let kernel = if r < query.hsml {
                own_kernel
            } else {
                Kernel::new(neighbour.hsml)
            };
            let weight = kernel.value(r);
            let volume_weight = if query.density > 0.0 {
                neighbour.mass / query.density * weight
            } else {
                0.0
            };
            let sph_weight = -neighbour.mass * kernel.derivative(r) / r;
            for row in 0..3 {
                for column in 0..3 {
                    result.moment_matrix[column * 3 + row] +=
                        volume_weight * dist[row] * dist[column];
                }
            }
            let neighbour_fields = [
                state.density,
                state.pressure,
                neighbour.velocity.x,
                neighbour.velocity.y,
                neighbour.velocity.z,
            ];
            for field in 0..NUM_FIELDS {
                let delta = neighbour_fields[field] - own_fields[field];
                for axis in 0..3 {
                    result.matrix_sums[field * 3 + axis] += volume_weight * delta * dist[axis];
                    result.sph_sums[field * 3 + axis] += sph_weight * delta * dist[axis];
                }
                result.delta_max[field] = result.delta_max[field].max(delta);
                result.delta_min[field] = result.delta_min[field].min(delta);
            }
            result.max_distance = result.max_distance.max(r);
        }
        result
    }

    fn merge_result(&self, accumulated: &mut GradientResult, imported: GradientResult) {
        for index in 0..9 {
            accumulated.moment_matrix[index] += imported.moment_matrix[index];
        }
        for index in 0..3 * NUM_FIELDS {
            accumulated.matrix_sums[index] += imported.matrix_sums[index];
            accumulated.sph_sums[index] += imported.sph_sums[index];
        }
        for field in 0..NUM_FIELDS {
            accumulated.delta_max[field] =
                accumulated.delta_max[field].max(imported.delta_max[field]);
            accumulated.delta_min[field] =
                accumulated.delta_min[field].min(imported.delta_min[field]);
        }
        accumulated.max_distance = accumulated.max_distance.max(imported.max_distance);
    }
}

/// Close the pairwise sums into slope-limited gradients: invert the
/// moment matrix, pick the estimator the condition number allows and
/// keep every reconstruction within the observed envelopes.
fn apply_gradient_result(
    store: &mut ParticleStore,
    index: usize,
    result: &GradientResult,
    parameters: &HydroParameters,
) {
    let particle = &store.particles[index];
    let gas = &mut store.gas[index];
    gas.max_ngb_distance = result.max_distance;
    let moments = DMat3::from_cols_array(&result.moment_matrix);
    let (nv_t, condition_number) = invert_with_condition_number(moments);
    gas.nv_t = nv_t;
    gas.condition_number = condition_number;
    gas.matrix_fallback =
        !condition_number.is_finite() || condition_number > CONDITION_NUMBER_DANGER;
    let alpha = limiter_alpha(condition_number);
    let length = particle.hsml.max(result.max_distance);
    let mut gradients = [DVec3::ZERO; NUM_FIELDS];
    for field in 0..NUM_FIELDS {
        let field_vec = |sums: &[f64; 3 * NUM_FIELDS]| {
            DVec3::new(sums[field * 3], sums[field * 3 + 1], sums[field * 3 + 2])
        };
        let mut gradient = if !gas.matrix_fallback {
            nv_t * field_vec(&result.matrix_sums)
        } else if gas.density > 0.0 {
            gas.dhsml_factor / gas.density * field_vec(&result.sph_sums)
        } else {
            DVec3::ZERO
        };
        // The envelope always contains the particle's own value, so
        // one-sided neighbourhoods (and targets without any pair)
        // cannot reconstruct away from themselves.
        let delta_max = result.delta_max[field].max(0.0);
        let delta_min = result.delta_min[field].min(0.0);
        limit_gradient(
            &mut gradient,
            delta_max,
            delta_min,
            alpha,
            length,
            parameters.limiter_tolerance,
        );
        gradients[field] = gradient;
    }
    gas.grad_density = gradients[0];
    gas.grad_pressure = gradients[1];
    gas.grad_velocity = DMat3::from_cols(gradients[2], gradients[3], gradients[4]);
}

#[derive(Clone, Copy, Debug)]
pub struct GradientStats {
    /// How many targets had to fall back to the SPH estimator.
    pub matrix_fallbacks: usize,
}

/// The collective gradient pass. Requires a finished density pass;
/// runs a single symmetric tree walk and closes the results into
/// slope-limited gradients of density, pressure and velocity.
pub fn gradients_pass(
    store: &mut ParticleStore,
    tree: &mut NeighborTree,
    box_: &SimulationBox,
    parameters: &HydroParameters,
    comms: &mut WalkComms<GradientQuery, GradientResult>,
) -> GradientStats {
    parameters.validate();
    tree.refresh_hsml(store);
    let walk = NeighborWalk::new(GradientVisitor, parameters, store, comms);
    let results = walk.run(store, tree, box_, comms);
    let mut matrix_fallbacks = 0;
    for (index, result) in results {
        apply_gradient_result(store, index, &result, parameters);
        if store.gas[index].matrix_fallback {
            matrix_fallbacks += 1;
        }
    }
    GradientStats { matrix_fallbacks }
}
