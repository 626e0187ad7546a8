use std::mem;

use glam::DVec3;
use log::debug;
use log::error;
use rayon::prelude::*;

use crate::communication::Communicator;
use crate::communication::DataByRank;
use crate::communication::ExchangeCommunicator;
use crate::communication::Message;
use crate::communication::Rank;
use crate::communication::SumCommunicator;
use crate::domain::RankBounds;
use crate::domain::RankExtents;
use crate::parameters::HydroParameters;
use crate::particle::ParticleStore;
use crate::simulation_box::SimulationBox;
use crate::tree::NeighborTree;

/// The per-pass callbacks of the tree walk: which particles to
/// evaluate, what to send about them, how to evaluate a query
/// against the local tree and how to merge partial results coming
/// back from other ranks.
pub trait WalkVisitor: Sync {
    type Query: Message;
    type Result: Message + Default;

    fn is_active(&self, store: &ParticleStore, index: usize) -> bool;

    fn fill_query(&self, store: &ParticleStore, index: usize) -> Self::Query;

    /// Center and radius of the search ball of a query, used to
    /// decide which ranks it has to be exported to.
    fn search_ball(&self, query: &Self::Query) -> (DVec3, f64);

    /// Whether pairs are also admitted through the neighbour's
    /// kernel, in which case remote smoothing lengths widen the
    /// export overlap test.
    fn symmetric(&self) -> bool {
        false
    }

    /// Accumulate the kernel sums of one query over the local tree.
    /// Runs for local targets (primary phase) and for queries
    /// imported from other ranks alike.
    fn evaluate(
        &self,
        query: &Self::Query,
        tree: &NeighborTree,
        store: &ParticleStore,
        box_: &SimulationBox,
    ) -> Self::Result;

    /// Fold a partial result returned by another rank into the
    /// accumulated result of the owning target.
    fn merge_result(&self, accumulated: &mut Self::Result, imported: Self::Result);
}

/// The communicators one walk needs: pairwise exchange of queries
/// and results, a scalar sum reduction and the domain envelope
/// gather. Under MPI all four attach to the world communicator with
/// distinct type tags; under the local backend they are separate
/// channel meshes.
pub struct WalkComms<Q, R> {
    pub queries: ExchangeCommunicator<Q>,
    pub results: ExchangeCommunicator<R>,
    pub counts: Communicator<i64>,
    pub domain: Communicator<RankBounds>,
}

#[cfg(feature = "mpi")]
impl<Q: 'static, R: 'static> WalkComms<Q, R> {
    pub fn world() -> Self {
        Self {
            queries: ExchangeCommunicator::new(Communicator::new()),
            results: ExchangeCommunicator::new(Communicator::new()),
            counts: Communicator::new(),
            domain: Communicator::new(),
        }
    }
}

#[cfg(not(feature = "mpi"))]
/// One set of communicators per rank, for running ranks as threads.
pub fn local_walk_comms<Q, R>(size: usize) -> Vec<WalkComms<Q, R>> {
    let mut queries = crate::communication::get_local_communicators(size);
    let mut results = crate::communication::get_local_communicators(size);
    let mut counts = crate::communication::get_local_communicators(size);
    let mut domain = crate::communication::get_local_communicators(size);
    (0..size as Rank)
        .map(|rank| WalkComms {
            queries: ExchangeCommunicator::new(queries.remove(&rank).unwrap()),
            results: ExchangeCommunicator::new(results.remove(&rank).unwrap()),
            counts: counts.remove(&rank).unwrap(),
            domain: domain.remove(&rank).unwrap(),
        })
        .collect()
}

/// Drives one kind of neighbour evaluation over all active targets:
/// a rayon-parallel primary phase over the local tree, followed by
/// as many budget-limited export rounds as it takes until no rank
/// has pending exports left.
pub struct NeighborWalk<V> {
    visitor: V,
    export_capacity: usize,
    rank_extents: RankExtents,
}

impl<V: WalkVisitor> NeighborWalk<V> {
    pub fn new(
        visitor: V,
        parameters: &HydroParameters,
        store: &ParticleStore,
        comms: &mut WalkComms<V::Query, V::Result>,
    ) -> Self {
        let entry_size = mem::size_of::<V::Query>()
            + mem::size_of::<V::Result>()
            + 2 * mem::size_of::<usize>();
        let export_capacity = parameters.buffer_size_mib * 1024 * 1024 / entry_size;
        if export_capacity == 0 {
            error!(
                "export buffer of {} MiB cannot hold a single entry of {} bytes",
                parameters.buffer_size_mib, entry_size
            );
            panic!("export buffer too small");
        }
        let rank_extents = RankExtents::gather(&mut comms.domain, store);
        Self {
            visitor,
            export_capacity,
            rank_extents,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_export_capacity(mut self, export_capacity: usize) -> Self {
        self.export_capacity = export_capacity;
        self
    }

    /// Evaluate all currently active targets. Collective: every rank
    /// takes part in the export rounds even when it has nothing to
    /// export itself. Returns the fully merged result per target.
    pub fn run(
        &self,
        store: &ParticleStore,
        tree: &NeighborTree,
        box_: &SimulationBox,
        comms: &mut WalkComms<V::Query, V::Result>,
    ) -> Vec<(usize, V::Result)> {
        let targets: Vec<usize> = (0..store.len())
            .filter(|index| self.visitor.is_active(store, *index))
            .collect();
        let queries: Vec<V::Query> = targets
            .iter()
            .map(|index| self.visitor.fill_query(store, *index))
            .collect();
        let mut results: Vec<V::Result> = queries
            .par_iter()
            .map(|query| self.visitor.evaluate(query, tree, store, box_))
            .collect();
        // Which (target, rank) pairs have to be exported. The cursor
        // into this list is what survives a full export buffer: the
        // next round resumes where the previous one stopped.
        let exports: Vec<(usize, Rank)> = queries
            .iter()
            .enumerate()
            .flat_map(|(position, query)| {
                let (center, radius) = self.visitor.search_ball(query);
                let symmetric = self.visitor.symmetric();
                self.rank_extents
                    .other_ranks()
                    .filter(move |rank| {
                        self.rank_extents.overlaps_search_ball(
                            *rank, box_, &center, radius, symmetric,
                        )
                    })
                    .map(move |rank| (position, rank))
            })
            .collect();
        let mut cursor = 0;
        loop {
            let batch_end = (cursor + self.export_capacity).min(exports.len());
            let batch = &exports[cursor..batch_end];
            let global_pending = comms.counts.collective_sum(&(batch.len() as i64));
            if global_pending == 0 {
                break;
            }
            if !batch.is_empty() {
                debug!(
                    "exporting {} of {} pending queries",
                    batch.len(),
                    exports.len() - cursor
                );
            }
            let mut outgoing: DataByRank<Vec<V::Query>> =
                DataByRank::from_communicator(&comms.queries);
            let mut exported_positions: DataByRank<Vec<usize>> =
                DataByRank::from_communicator(&comms.queries);
            for (position, rank) in batch {
                outgoing.push(*rank, queries[*position]);
                exported_positions.push(*rank, *position);
            }
            cursor = batch_end;
            let imported = comms.queries.exchange_all(outgoing);
            // Secondary phase: evaluate the queries of other ranks
            // against our local tree. Results go back in query order.
            let mut returned: DataByRank<Vec<V::Result>> = DataByRank::empty();
            for (rank, imported_queries) in imported.iter() {
                let partials: Vec<V::Result> = imported_queries
                    .par_iter()
                    .map(|query| self.visitor.evaluate(query, tree, store, box_))
                    .collect();
                returned.insert(*rank, partials);
            }
            let merged_back = comms.results.exchange_all(returned);
            for (rank, partials) in merged_back.into_iter() {
                let positions = &exported_positions[rank];
                debug_assert_eq!(positions.len(), partials.len());
                for (position, partial) in positions.iter().zip(partials) {
                    self.visitor.merge_result(&mut results[*position], partial);
                }
            }
        }
        targets.into_iter().zip(results).collect()
    }
}
