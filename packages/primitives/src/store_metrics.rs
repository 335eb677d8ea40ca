use std::ops::AddAssign;

/// Aggregate metrics for the whole peer store.
///
/// These are totals over all swarms. During concurrent mutation the totals
/// are only eventually consistent with the per-swarm sums; they match after
/// quiescence.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct StoreMetrics {
    /// Total number of seeders over all swarms.
    pub seeders: u64,
    /// Total number of leechers over all swarms.
    pub leechers: u64,
    /// Number of swarms currently held by the store.
    pub swarms: u64,
}

impl AddAssign for StoreMetrics {
    fn add_assign(&mut self, rhs: Self) {
        self.seeders += rhs.seeders;
        self.leechers += rhs.leechers;
        self.swarms += rhs.swarms;
    }
}
