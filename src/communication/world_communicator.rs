use super::Rank;

/// Typed point-to-point communication with every other rank.
pub trait WorldCommunicator<T> {
    fn send_vec(&mut self, rank: Rank, data: Vec<T>);
    fn receive_vec(&mut self, rank: Rank) -> Vec<T>;
}
