use crate::games::types::PendingWager;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory mirror of persisted pending wagers, keyed by player.
///
/// The store row is the source of truth; the engine updates this pool only
/// after the batch that wrote or deleted the row has committed.
pub struct PendingWagerPool {
    pending: Arc<DashMap<u64, PendingWager>>,
}

impl PendingWagerPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
        }
    }

    /// Rebuild from rows found on disk at startup
    pub fn warm<I: IntoIterator<Item = PendingWager>>(wagers: I) -> Self {
        let pool = Self::new();
        for wager in wagers {
            pool.insert(wager);
        }
        pool
    }

    pub fn insert(&self, wager: PendingWager) {
        self.pending.insert(wager.player_id, wager);
    }

    pub fn get(&self, player_id: u64) -> Option<PendingWager> {
        self.pending.get(&player_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, player_id: u64) -> Option<PendingWager> {
        self.pending.remove(&player_id).map(|(_, wager)| wager)
    }

    pub fn contains(&self, player_id: u64) -> bool {
        self.pending.contains_key(&player_id)
    }

    /// Number of wagers awaiting take or risk
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Value owed if every pending wager were taken
    pub fn outstanding_value(&self) -> u64 {
        self.pending
            .iter()
            .fold(0u64, |sum, entry| sum.saturating_add(entry.value().value))
    }
}

impl Default for PendingWagerPool {
    fn default() -> Self {
        Self::new()
    }
}
