use super::SizedCommunicator;

pub trait CollectiveCommunicator<T>: SizedCommunicator {
    fn all_gather(&mut self, send: &T) -> Vec<T>;
}

pub trait SumCommunicator<T>: CollectiveCommunicator<T> {
    fn collective_sum(&mut self, send: &T) -> T;
}
