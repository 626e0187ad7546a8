mod collective_communicator;
mod data_by_rank;
mod exchange_communicator;
mod sized_communicator;
mod world_communicator;

pub use collective_communicator::CollectiveCommunicator;
pub use collective_communicator::SumCommunicator;
pub use data_by_rank::DataByRank;
pub use sized_communicator::SizedCommunicator;
pub use world_communicator::WorldCommunicator;

#[cfg(feature = "mpi")]
pub type Rank = mpi::Rank;
#[cfg(not(feature = "mpi"))]
pub type Rank = i32;

/// Everything that goes over the wire. Payloads are plain-old-data:
/// the local communicator moves them as raw bytes and the MPI
/// communicator requires an `Equivalence` datatype mapping.
#[cfg(feature = "mpi")]
pub trait Message: Copy + Send + Sync + 'static + mpi::traits::Equivalence {}
#[cfg(feature = "mpi")]
impl<T: Copy + Send + Sync + 'static + mpi::traits::Equivalence> Message for T {}

#[cfg(not(feature = "mpi"))]
pub trait Message: Copy + Send + Sync + 'static {}
#[cfg(not(feature = "mpi"))]
impl<T: Copy + Send + Sync + 'static> Message for T {}

#[cfg(not(feature = "mpi"))]
mod local;

#[cfg(not(feature = "mpi"))]
pub use local_reexport::*;

#[cfg(not(feature = "mpi"))]
#[path = ""]
mod local_reexport {
    pub type Communicator<T> = super::local::LocalCommunicator<T>;
    pub type ExchangeCommunicator<T> =
        super::exchange_communicator::ExchangeCommunicator<super::local::LocalCommunicator<T>, T>;

    pub use super::local::get_local_communicators;
}

#[cfg(feature = "mpi")]
mod mpi_world;

#[cfg(feature = "mpi")]
pub use mpi_reexport::*;

#[cfg(feature = "mpi")]
#[path = ""]
mod mpi_reexport {
    pub type Communicator<T> = super::mpi_world::MpiWorld<T>;
    pub type ExchangeCommunicator<T> =
        super::exchange_communicator::ExchangeCommunicator<super::mpi_world::MpiWorld<T>, T>;

    pub use super::mpi_world::MPI_UNIVERSE;
}
