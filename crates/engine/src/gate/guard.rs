use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use super::state::PlayerId;

/// Tracks which players have a vein operation in flight.
///
/// Membership is held through [`ProcessingLease`]: acquiring inserts the
/// player, dropping the lease removes it, on every exit path. Clones share the
/// same set. The guard is single-threaded; the host runs all operations on one
/// thread.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyGuard {
    active: Rc<RefCell<HashSet<PlayerId>>>,
}

impl ConcurrencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `player` as processing. `None` if they already are.
    pub fn try_acquire(&self, player: PlayerId) -> Option<ProcessingLease> {
        if !self.active.borrow_mut().insert(player) {
            return None;
        }
        Some(ProcessingLease {
            player,
            active: Rc::clone(&self.active),
        })
    }

    pub fn is_processing(&self, player: &PlayerId) -> bool {
        self.active.borrow().contains(player)
    }

    pub fn active_count(&self) -> usize {
        self.active.borrow().len()
    }

    pub fn clear(&self) {
        self.active.borrow_mut().clear();
    }
}

/// Proof that a player is marked as processing. Releases on drop.
#[must_use = "dropping the lease immediately releases the player"]
#[derive(Debug)]
pub struct ProcessingLease {
    player: PlayerId,
    active: Rc<RefCell<HashSet<PlayerId>>>,
}

impl ProcessingLease {
    pub fn player(&self) -> PlayerId {
        self.player
    }
}

impl Drop for ProcessingLease {
    fn drop(&mut self) {
        self.active.borrow_mut().remove(&self.player);
    }
}
