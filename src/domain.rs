use glam::DVec3;

use crate::communication::CollectiveCommunicator;
use crate::communication::Communicator;
use crate::communication::Rank;
use crate::communication::SizedCommunicator;
use crate::extent::Extent;
use crate::particle::ParticleStore;
use crate::simulation_box::SimulationBox;
use crate::tree::bounding_boxes_overlap_periodic;

/// The domain envelope of one rank: the bounding box of its local
/// particles plus the largest smoothing length it holds. What every
/// rank needs to know about its peers to decide which targets to
/// export.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "mpi", derive(mpi::traits::Equivalence))]
pub struct RankBounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
    pub max_hsml: f64,
    pub num_particles: i64,
}

impl RankBounds {
    fn local(store: &ParticleStore) -> Self {
        let extent = Extent::from_positions(store.particles.iter().map(|p| &p.position));
        match extent {
            Some(extent) => Self {
                min: extent.min.to_array(),
                max: extent.max.to_array(),
                max_hsml: store.local_max_hsml(),
                num_particles: store.len() as i64,
            },
            None => Self::default(),
        }
    }
}

/// The all-gathered envelopes of every rank.
pub struct RankExtents {
    bounds: Vec<RankBounds>,
    home: Rank,
}

impl RankExtents {
    pub fn gather(communicator: &mut Communicator<RankBounds>, store: &ParticleStore) -> Self {
        let local = RankBounds::local(store);
        let bounds = communicator.all_gather(&local);
        Self {
            bounds,
            home: communicator.rank(),
        }
    }

    pub fn other_ranks(&self) -> impl Iterator<Item = Rank> + '_ {
        (0..self.bounds.len() as Rank).filter(move |rank| *rank != self.home)
    }

    /// Whether the search ball of a target reaches into the given
    /// rank's domain. For symmetric searches the remote side also
    /// contributes pairs through its own (larger) smoothing lengths,
    /// so the remote maximum is admitted into the overlap radius.
    pub fn overlaps_search_ball(
        &self,
        rank: Rank,
        box_: &SimulationBox,
        pos: &DVec3,
        radius: f64,
        symmetric: bool,
    ) -> bool {
        let bounds = &self.bounds[rank as usize];
        if bounds.num_particles == 0 {
            return false;
        }
        let min = DVec3::from_array(bounds.min);
        let max = DVec3::from_array(bounds.max);
        let search_radius = if symmetric {
            radius.max(bounds.max_hsml)
        } else {
            radius
        };
        bounding_boxes_overlap_periodic(
            box_,
            &((min + max) * 0.5),
            &(max - min),
            pos,
            &DVec3::splat(search_radius),
        )
    }
}

#[cfg(test)]
#[cfg(not(feature = "mpi"))]
mod tests {
    use glam::DVec3;

    use super::RankExtents;
    use crate::communication::get_local_communicators;
    use crate::particle::Particle;
    use crate::particle::ParticleStore;
    use crate::simulation_box::SimulationBox;

    #[test]
    fn gathered_extents_decide_overlap() {
        let mut communicators = get_local_communicators(2);
        let stores: Vec<_> = (0..2)
            .map(|rank| {
                let particles = (0..8)
                    .map(|i| {
                        Particle::gas(
                            i,
                            DVec3::new(rank as f64 * 4.0 + 0.5 * i as f64, 1.0, 1.0),
                            1.0,
                            0.3,
                        )
                    })
                    .collect();
                ParticleStore::new(particles)
            })
            .collect();
        let box_ = SimulationBox::cube_from_side_length(100.0);
        let threads: Vec<_> = stores
            .into_iter()
            .enumerate()
            .map(|(rank, store)| {
                let mut communicator = communicators.remove(&(rank as i32)).unwrap();
                let box_ = box_.clone();
                std::thread::spawn(move || {
                    let extents = RankExtents::gather(&mut communicator, &store);
                    let other = 1 - rank as i32;
                    // A ball next to the other rank's slab overlaps it,
                    // a faraway one does not.
                    let near = DVec3::new(other as f64 * 4.0 - 0.5, 1.0, 1.0);
                    let far = DVec3::new(50.0, 50.0, 50.0);
                    assert!(extents.overlaps_search_ball(other, &box_, &near, 1.0, false));
                    assert!(!extents.overlaps_search_ball(other, &box_, &far, 1.0, false));
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
    }
}
