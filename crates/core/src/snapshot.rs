use std::sync::{Arc, RwLock};

use crate::currency::RateTable;
use crate::domain::candidate::Roster;
use crate::domain::policy::{ExtensionTable, PolicyTable, TitleRankTable};

/// Every input an evaluation reads. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub roster: Roster,
    pub policy: PolicyTable,
    pub extensions: ExtensionTable,
    pub rates: RateTable,
    pub title_ranks: TitleRankTable,
}

impl EngineSnapshot {
    pub fn new(
        roster: Roster,
        policy: PolicyTable,
        extensions: ExtensionTable,
        rates: RateTable,
        title_ranks: TitleRankTable,
    ) -> Self {
        Self { roster, policy, extensions, rates, title_ranks }
    }
}

/// Holds the active snapshot. Readers take an `Arc` and keep it for the whole
/// evaluation, so a concurrent `replace` is never observed half-applied.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<EngineSnapshot>>,
}

impl SnapshotStore {
    pub fn new(snapshot: EngineSnapshot) -> Self {
        Self { current: RwLock::new(Arc::new(snapshot)) }
    }

    pub fn current(&self) -> Arc<EngineSnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Swaps in a new snapshot and returns the one it replaced.
    pub fn replace(&self, snapshot: EngineSnapshot) -> Arc<EngineSnapshot> {
        let next = Arc::new(snapshot);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}
