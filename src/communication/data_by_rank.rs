use core::fmt::Debug;
use std::collections::hash_map;
use std::collections::HashMap;
use std::ops::Index;
use std::ops::IndexMut;

use super::Rank;
use super::SizedCommunicator;

/// Per-rank storage, one slot for every rank other than our own.
pub struct DataByRank<T>(HashMap<Rank, T>);

impl<T> Debug for DataByRank<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<T> Clone for DataByRank<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Default for DataByRank<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> DataByRank<T> {
    pub fn empty() -> Self {
        Self(HashMap::new())
    }
}

impl<T> DataByRank<T>
where
    T: Default,
{
    pub fn from_size_and_rank(size: usize, rank: Rank) -> Self {
        Self(
            (0..size)
                .filter(|other| *other != rank as usize)
                .map(|other| (other as Rank, T::default()))
                .collect(),
        )
    }

    pub fn from_communicator(communicator: &impl SizedCommunicator) -> Self {
        Self::from_size_and_rank(communicator.size(), communicator.rank())
    }
}

impl<T> DataByRank<T> {
    pub fn get(&self, rank: &Rank) -> Option<&T> {
        self.0.get(rank)
    }

    pub fn get_mut(&mut self, rank: &Rank) -> Option<&mut T> {
        self.0.get_mut(rank)
    }

    pub fn remove(&mut self, rank: &Rank) -> Option<T> {
        self.0.remove(rank)
    }

    pub fn insert(&mut self, rank: Rank, data: T) {
        self.0.insert(rank, data);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rank, &T)> {
        self.0.iter()
    }
}

impl<T> DataByRank<Vec<T>> {
    pub fn push(&mut self, rank: Rank, data: T) {
        self.0.get_mut(&rank).unwrap().push(data);
    }

    pub fn drain_all_sorted(&mut self) -> impl Iterator<Item = (Rank, Vec<T>)> + '_ {
        let mut ranks: Vec<_> = self.0.keys().copied().collect();
        ranks.sort();
        ranks.into_iter().map(|rank| (rank, self.0.remove(&rank).unwrap()))
    }
}

impl<T> Index<Rank> for DataByRank<T> {
    type Output = T;

    fn index(&self, index: Rank) -> &Self::Output {
        self.get(&index).unwrap()
    }
}

impl<T> IndexMut<Rank> for DataByRank<T> {
    fn index_mut(&mut self, index: Rank) -> &mut Self::Output {
        self.get_mut(&index).unwrap()
    }
}

impl<T> IntoIterator for DataByRank<T> {
    type Item = (Rank, T);

    type IntoIter = hash_map::IntoIter<Rank, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
