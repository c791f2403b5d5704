use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

use crate::error::{AnalysisError, Result};

/// Tracks which owners have an analysis in flight. A second start for the
/// same owner is rejected rather than queued.
#[derive(Debug, Clone, Default)]
pub struct BusyRegistry {
    owners: Arc<DashMap<String, ()>>,
}

impl BusyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, owner: &str) -> Result<BusyGuard> {
        match self.owners.entry(owner.to_string()) {
            Entry::Occupied(_) => Err(AnalysisError::Busy(owner.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(BusyGuard {
                    owners: self.owners.clone(),
                    owner: owner.to_string(),
                })
            }
        }
    }

    pub fn is_busy(&self, owner: &str) -> bool {
        self.owners.contains_key(owner)
    }
}

/// Releases the owner when dropped, including on error paths.
#[derive(Debug)]
pub struct BusyGuard {
    owners: Arc<DashMap<String, ()>>,
    owner: String,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.owners.remove(&self.owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_rejected_until_release() {
        let registry = BusyRegistry::new();
        let guard = registry.try_acquire("alice").unwrap();
        assert!(matches!(
            registry.try_acquire("alice"),
            Err(AnalysisError::Busy(owner)) if owner == "alice"
        ));
        assert!(registry.try_acquire("bob").is_ok());

        drop(guard);
        assert!(!registry.is_busy("alice"));
        assert!(registry.try_acquire("alice").is_ok());
    }
}
