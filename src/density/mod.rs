mod controller;

use glam::DVec3;
use log::debug;
use log::error;

pub use controller::HsmlBracket;
pub use controller::HsmlUpdate;
pub use controller::update_smoothing_length;
pub use controller::HSML_STEP_FACTOR;

use crate::communication::SumCommunicator;
use crate::kernel::Kernel;
use crate::parameters::HydroParameters;
use crate::particle::ParticleKind;
use crate::particle::ParticleStore;
use crate::simulation_box::SimulationBox;
use crate::tree::NeighborTree;
use crate::walk::NeighborWalk;
use crate::walk::WalkComms;
use crate::walk::WalkVisitor;

/// Adiabatic index of the γ-law equation of state.
pub const GAMMA: f64 = 5.0 / 3.0;

/// What a rank needs to know about a density target to evaluate it:
/// the search ball and the velocity predictor entering the flow
/// field sums.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "mpi", derive(mpi::traits::Equivalence))]
pub struct DensityQuery {
    pub pos: [f64; 3],
    pub vel: [f64; 3],
    pub hsml: f64,
    pub kind: i32,
    pub time_bin: i32,
}

/// The kernel sums accumulated for one density target.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "mpi", derive(mpi::traits::Equivalence))]
pub struct DensityResult {
    pub density: f64,
    pub dhsml_density: f64,
    pub num_ngb: f64,
    pub div_vel: f64,
    pub curl_vel: [f64; 3],
    pub weighted_vel: [f64; 3],
}

fn add_vec(accumulated: &mut [f64; 3], contribution: DVec3) {
    accumulated[0] += contribution.x;
    accumulated[1] += contribution.y;
    accumulated[2] += contribution.z;
}

pub struct DensityVisitor;

impl WalkVisitor for DensityVisitor {
    type Query = DensityQuery;
    type Result = DensityResult;

    fn is_active(&self, store: &ParticleStore, index: usize) -> bool {
        let particle = &store.particles[index];
        particle.active && particle.kind.participates_in_density() && !particle.density_done
    }

    fn fill_query(&self, store: &ParticleStore, index: usize) -> DensityQuery {
        let particle = &store.particles[index];
        DensityQuery {
            pos: particle.position.to_array(),
            vel: particle.velocity.to_array(),
            hsml: particle.hsml,
            kind: particle.kind.to_wire(),
            time_bin: particle.time_bin as i32,
        }
    }

    fn search_ball(&self, query: &DensityQuery) -> (DVec3, f64) {
        (DVec3::from_array(query.pos), query.hsml)
    }

    fn evaluate(
        &self,
        query: &DensityQuery,
        tree: &NeighborTree,
        store: &ParticleStore,
        box_: &SimulationBox,
    ) -> DensityResult {
        let pos = DVec3::from_array(query.pos);
        let vel = DVec3::from_array(query.vel);
        let kernel = Kernel::new(query.hsml);
        let mut result = DensityResult::default();
        for leaf in tree.iter_particles_in_radius(box_, pos, query.hsml) {
            let neighbour = &store.particles[leaf.index];
            // Only gas carries fluid state.
            if neighbour.kind != ParticleKind::Gas {
                continue;
            }
            let dist = box_.periodic_distance_vec(&pos, &neighbour.position);
            let r = dist.length();
            let weight = kernel.value(r);
            result.density += neighbour.mass * weight;
            result.num_ngb += weight * kernel.volume();
            result.dhsml_density += neighbour.mass * kernel.dh_derivative(r);
            add_vec(
                &mut result.weighted_vel,
                neighbour.mass * weight * neighbour.velocity,
            );
            if r > 0.0 {
                let dweight_over_r = kernel.derivative(r) / r;
                let dv = vel - neighbour.velocity;
                result.div_vel -= neighbour.mass * dweight_over_r * dv.dot(dist);
                add_vec(
                    &mut result.curl_vel,
                    neighbour.mass * dweight_over_r * dv.cross(dist),
                );
            }
        }
        result
    }

    fn merge_result(&self, accumulated: &mut DensityResult, imported: DensityResult) {
        accumulated.density += imported.density;
        accumulated.dhsml_density += imported.dhsml_density;
        accumulated.num_ngb += imported.num_ngb;
        accumulated.div_vel += imported.div_vel;
        for axis in 0..3 {
            accumulated.curl_vel[axis] += imported.curl_vel[axis];
            accumulated.weighted_vel[axis] += imported.weighted_vel[axis];
        }
    }
}

/// Apply a fully merged density result to its particle and derive
/// the per-particle factors the controller and the gradient pass
/// need.
fn apply_density_result(store: &mut ParticleStore, index: usize, result: &DensityResult) {
    let particle = &store.particles[index];
    let gas = &mut store.gas[index];
    gas.density = result.density;
    gas.num_ngb = result.num_ngb;
    gas.dhsml_density = result.dhsml_density;
    if gas.density > 0.0 {
        let term = particle.hsml / (3.0 * gas.density) * gas.dhsml_density;
        gas.dhsml_factor = if term <= -0.9 { 1.0 } else { 1.0 / (1.0 + term) };
        gas.div_vel = result.div_vel / gas.density;
        gas.curl_vel = DVec3::from_array(result.curl_vel) / gas.density;
        gas.curl_vel_mag = gas.curl_vel.length();
        gas.smoothed_velocity = DVec3::from_array(result.weighted_vel) / gas.density;
    } else {
        gas.dhsml_factor = 1.0;
        gas.div_vel = 0.0;
        gas.curl_vel = DVec3::ZERO;
        gas.curl_vel_mag = 0.0;
        gas.smoothed_velocity = DVec3::ZERO;
    }
}

fn report_unconverged(store: &ParticleStore, brackets: &[HsmlBracket]) {
    for (index, particle) in store.particles.iter().enumerate() {
        if !(particle.active && particle.kind.participates_in_density() && !particle.density_done)
        {
            continue;
        }
        let bracket = &brackets[index];
        error!(
            "smoothing length of particle {} did not converge: hsml = {:.6e}, bracket = ({:.6e}, {:.6e}), num_ngb = {:.3}, position = {:.6?}",
            particle.id,
            particle.hsml,
            bracket.left,
            bracket.right,
            store.gas[index].num_ngb,
            particle.position,
        );
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DensityStats {
    /// Number of global density iterations until every particle
    /// converged.
    pub iterations: usize,
}

/// The collective density pass: iterate tree walks and smoothing
/// length updates until every active particle's neighbour count sits
/// inside the tolerance window (or is pinned against the allowed
/// smoothing length range), then derive pressures and the final flow
/// field quantities.
pub fn density_pass(
    store: &mut ParticleStore,
    tree: &mut NeighborTree,
    box_: &SimulationBox,
    parameters: &HydroParameters,
    comms: &mut WalkComms<DensityQuery, DensityResult>,
) -> DensityStats {
    parameters.validate();
    let mut brackets = vec![HsmlBracket::default(); store.len()];
    for particle in store.particles.iter_mut() {
        if particle.active && particle.kind.participates_in_density() {
            particle.density_done = false;
        }
    }
    tree.refresh_hsml(store);
    let walk = NeighborWalk::new(DensityVisitor, parameters, store, comms);
    let mut iterations = 0;
    loop {
        let results = walk.run(store, tree, box_, comms);
        iterations += 1;
        let mut unconverged: i64 = 0;
        for (index, result) in results {
            apply_density_result(store, index, &result);
            let update = update_smoothing_length(
                &store.particles[index],
                store.gas[index].num_ngb,
                store.gas[index].dhsml_factor,
                &mut brackets[index],
                parameters,
            );
            match update {
                HsmlUpdate::Converged => store.particles[index].density_done = true,
                HsmlUpdate::Retry(hsml) => {
                    store.particles[index].hsml = hsml;
                    unconverged += 1;
                }
            }
        }
        let global_unconverged = comms.counts.collective_sum(&unconverged);
        if global_unconverged == 0 {
            break;
        }
        if iterations >= parameters.max_iter {
            report_unconverged(store, &brackets);
            panic!(
                "smoothing length iteration did not converge within {} iterations",
                parameters.max_iter
            );
        }
        debug!(
            "density iteration {}: {} particles left",
            iterations, global_unconverged
        );
        tree.refresh_hsml(store);
    }
    for index in 0..store.len() {
        let particle = &store.particles[index];
        if !(particle.active && particle.kind.participates_in_density()) {
            continue;
        }
        if particle.kind == ParticleKind::Gas {
            let gas = &mut store.gas[index];
            gas.pressure = gas.entropy * gas.density.powf(GAMMA);
        }
    }
    DensityStats { iterations }
}
