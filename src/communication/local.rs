use std::collections::HashMap;
use std::iter::Sum;
use std::marker::PhantomData;
use std::mem;
use std::ptr;
use std::slice;
use std::sync::mpsc::channel;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::Sender;

use super::CollectiveCommunicator;
use super::DataByRank;
use super::Rank;
use super::SizedCommunicator;
use super::SumCommunicator;
use super::WorldCommunicator;

pub(super) struct Payload {
    bytes: Vec<u8>,
}

/// A drop-in replacement for the MPI world which moves payloads
/// between threads over channels. One thread plays the role of one
/// rank; used by all tests and single-process runs.
pub struct LocalCommunicator<T> {
    senders: DataByRank<Sender<Payload>>,
    receivers: DataByRank<Receiver<Payload>>,
    rank: Rank,
    size: usize,
    _marker: PhantomData<T>,
}

impl<T> LocalCommunicator<T> {
    pub(super) fn new(
        receivers: DataByRank<Receiver<Payload>>,
        senders: DataByRank<Sender<Payload>>,
        size: usize,
        rank: Rank,
    ) -> Self {
        Self {
            senders,
            receivers,
            rank,
            size,
            _marker: PhantomData,
        }
    }
}

/// Construct the full channel mesh for `size` ranks, keyed by rank.
pub fn get_local_communicators<T>(size: usize) -> HashMap<Rank, LocalCommunicator<T>> {
    let mut senders: Vec<_> = (0..size).map(|_| DataByRank::empty()).collect();
    let mut receivers: Vec<_> = (0..size).map(|_| DataByRank::empty()).collect();
    for rank1 in 0..size {
        for rank2 in 0..size {
            if rank1 == rank2 {
                continue;
            }
            let (sender, receiver) = channel();
            senders[rank1].insert(rank2 as Rank, sender);
            receivers[rank2].insert(rank1 as Rank, receiver);
        }
    }
    receivers
        .into_iter()
        .zip(senders)
        .enumerate()
        .map(|(rank, (receivers, senders))| {
            (
                rank as Rank,
                LocalCommunicator::new(receivers, senders, size, rank as Rank),
            )
        })
        .collect()
}

impl<T: Send + Sync> WorldCommunicator<T> for LocalCommunicator<T> {
    fn receive_vec(&mut self, rank: Rank) -> Vec<T> {
        let bytes = &self.receivers[rank].recv().unwrap().bytes;
        let size = mem::size_of::<T>();
        debug_assert_eq!(bytes.len().rem_euclid(size), 0);
        bytes
            .chunks_exact(size)
            .map(|chunk| unsafe { ptr::read(chunk.as_ptr().cast()) })
            .collect()
    }

    fn send_vec(&mut self, rank: Rank, data: Vec<T>) {
        let bytes = unsafe {
            slice::from_raw_parts(
                (data.as_slice() as *const [T]) as *const u8,
                data.len() * mem::size_of::<T>(),
            )
        };
        let payload = Payload {
            bytes: bytes.to_vec(),
        };
        self.senders[rank].send(payload).unwrap();
    }
}

impl<T> SizedCommunicator for LocalCommunicator<T> {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }
}

impl<T: Clone + Send + Sync> CollectiveCommunicator<T> for LocalCommunicator<T> {
    fn all_gather(&mut self, data: &T) -> Vec<T> {
        for rank in self.other_ranks() {
            self.send_vec(rank, vec![data.clone()]);
        }
        let mut result = vec![];
        for rank in self.all_ranks() {
            if rank == self.rank {
                result.push(data.clone());
            } else {
                let received = self.receive_vec(rank);
                debug_assert_eq!(received.len(), 1);
                result.extend(received);
            }
        }
        result
    }
}

impl<T: Sum + Clone + Send + Sync> SumCommunicator<T> for LocalCommunicator<T> {
    fn collective_sum(&mut self, send: &T) -> T {
        // We don't care about efficiency in the local communicator
        let result = self.all_gather(send);
        result.into_iter().sum()
    }
}
