use std::marker::PhantomData;

use super::DataByRank;
use super::Rank;
use super::SizedCommunicator;
use super::WorldCommunicator;

/// Bulk pairwise exchange on top of a world communicator. Every rank
/// sends one (possibly empty) batch to every other rank and receives
/// one batch back; the rank-ordered send/receive pairing keeps the
/// exchange deadlock free with blocking transports.
pub struct ExchangeCommunicator<C, T> {
    pub communicator: C,
    _marker: PhantomData<T>,
}

impl<C, T> ExchangeCommunicator<C, T> {
    pub fn new(communicator: C) -> Self {
        Self {
            communicator,
            _marker: PhantomData,
        }
    }
}

impl<C, T> ExchangeCommunicator<C, T>
where
    C: WorldCommunicator<T>,
    C: SizedCommunicator,
{
    pub fn exchange_all(&mut self, mut data: DataByRank<Vec<T>>) -> DataByRank<Vec<T>> {
        let rank = self.communicator.rank();
        let mut received = DataByRank::empty();
        for other in self.communicator.all_ranks() {
            if other == rank {
                continue;
            }
            let outgoing = data.remove(&other).unwrap_or_default();
            if rank < other {
                self.communicator.send_vec(other, outgoing);
                received.insert(other, self.communicator.receive_vec(other));
            } else {
                let incoming = self.communicator.receive_vec(other);
                self.communicator.send_vec(other, outgoing);
                received.insert(other, incoming);
            }
        }
        received
    }
}

impl<C, T> SizedCommunicator for ExchangeCommunicator<C, T>
where
    C: SizedCommunicator,
{
    fn rank(&self) -> Rank {
        self.communicator.rank()
    }

    fn size(&self) -> usize {
        self.communicator.size()
    }
}
