use std::any::TypeId;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::iter::Sum;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::Mutex;

use lazy_static::lazy_static;
use mpi::environment::Universe;
use mpi::topology::SystemCommunicator;
use mpi::traits::Communicator;
use mpi::traits::CommunicatorCollectives;
use mpi::traits::Destination;
use mpi::traits::Equivalence;
use mpi::traits::MatchedReceiveVec;
use mpi::traits::Source;
use mpi::Tag;
use mpi::Threading;

use super::CollectiveCommunicator;
use super::Rank;
use super::SizedCommunicator;
use super::SumCommunicator;
use super::WorldCommunicator;

/// A wrapper around universe which contains the universe in an
/// Option. This allows calling .drop at program completion so that
/// the Universe is dropped which will call MPI_FINALIZE. This is
/// necessary because anything in a lazy_static will never be dropped.
pub struct StaticUniverse(Arc<Mutex<Option<Universe>>>);

impl StaticUniverse {
    pub fn world(&self) -> SystemCommunicator {
        self.0.lock().unwrap().as_ref().unwrap().world()
    }

    pub fn drop(&self) {
        let _ = self.0.lock().unwrap().take();
    }
}

lazy_static! {
    pub static ref MPI_UNIVERSE: StaticUniverse = {
        let threading = Threading::Funneled;
        let (universe, threading_initialized) =
            mpi::initialize_with_threading(threading).unwrap();
        assert_eq!(
            threading, threading_initialized,
            "Could not initialize MPI with the required threading level"
        );
        StaticUniverse(Arc::new(Mutex::new(Some(universe))))
    };
}

fn get_tag_for_type<T: 'static>() -> Tag {
    let id = TypeId::of::<T>();
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    // Truncate the hash and take the absolute value, since tags need
    // to be positive. Collision chance remains negligible.
    (hasher.finish() as i16).abs() as Tag
}

#[derive(Clone)]
pub struct MpiWorld<T> {
    world: SystemCommunicator,
    tag: Tag,
    _marker: PhantomData<T>,
}

impl<T: 'static> MpiWorld<T> {
    pub fn new() -> Self {
        let world = MPI_UNIVERSE.world();
        Self {
            world,
            tag: get_tag_for_type::<T>(),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> Default for MpiWorld<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorldCommunicator<T> for MpiWorld<T>
where
    T: Equivalence,
{
    fn send_vec(&mut self, rank: Rank, data: Vec<T>) {
        let process = self.world.process_at_rank(rank);
        process.send_with_tag(&data[..], self.tag);
    }

    fn receive_vec(&mut self, rank: Rank) -> Vec<T> {
        let process = self.world.process_at_rank(rank);
        let result = process.matched_probe_with_tag(self.tag);
        let (data, _) = result.matched_receive_vec();
        data
    }
}

impl<T> SizedCommunicator for MpiWorld<T> {
    fn rank(&self) -> Rank {
        self.world.rank()
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }
}

impl<T> CollectiveCommunicator<T> for MpiWorld<T>
where
    T: Equivalence + Clone,
{
    fn all_gather(&mut self, send: &T) -> Vec<T> {
        let mut result = vec![send.clone(); self.world.size() as usize];
        self.world.all_gather_into(send, &mut result[..]);
        result
    }
}

impl<T> SumCommunicator<T> for MpiWorld<T>
where
    T: Equivalence + Clone + Sum,
{
    fn collective_sum(&mut self, send: &T) -> T {
        self.all_gather(send).into_iter().sum()
    }
}
