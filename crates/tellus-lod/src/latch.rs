/// Outcome of a [`CompletionLatch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatchState {
    Pending,
    /// Counted down to zero.
    Resolved,
    /// Abandoned before reaching zero.
    Cancelled,
}

/// Countdown that settles exactly once, either by reaching zero or by
/// cancellation. Both are no-ops once settled.
#[derive(Clone, Debug)]
pub struct CompletionLatch {
    remaining: usize,
    state: LatchState,
}

impl CompletionLatch {
    /// A latch waiting for `count` events. A zero count is resolved at once.
    pub fn new(count: usize) -> Self {
        let state = if count == 0 { LatchState::Resolved } else { LatchState::Pending };
        Self { remaining: count, state }
    }

    /// Record one event. Returns true if this call resolved the latch.
    pub fn count_down(&mut self) -> bool {
        if self.state != LatchState::Pending {
            return false;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            self.state = LatchState::Resolved;
            return true;
        }
        false
    }

    /// Abandon the latch. Returns true if this call cancelled it.
    pub fn cancel(&mut self) -> bool {
        if self.state != LatchState::Pending {
            return false;
        }
        self.state = LatchState::Cancelled;
        true
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn state(&self) -> LatchState {
        self.state
    }

    pub fn is_settled(&self) -> bool {
        self.state != LatchState::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_on_last_count() {
        let mut latch = CompletionLatch::new(3);
        assert!(!latch.count_down());
        assert!(!latch.count_down());
        assert!(latch.count_down());
        assert_eq!(latch.state(), LatchState::Resolved);
        assert_eq!(latch.remaining(), 0);
    }

    #[test]
    fn test_zero_count_starts_resolved() {
        let latch = CompletionLatch::new(0);
        assert_eq!(latch.state(), LatchState::Resolved);
    }

    #[test]
    fn test_cancel_wins_only_while_pending() {
        let mut latch = CompletionLatch::new(2);
        latch.count_down();
        assert!(latch.cancel());
        assert!(!latch.cancel());
        assert!(!latch.count_down());
        assert_eq!(latch.state(), LatchState::Cancelled);
        assert_eq!(latch.remaining(), 1);
    }

    #[test]
    fn test_resolved_latch_cannot_be_cancelled() {
        let mut latch = CompletionLatch::new(1);
        assert!(latch.count_down());
        assert!(!latch.cancel());
        assert!(!latch.count_down());
        assert_eq!(latch.state(), LatchState::Resolved);
    }
}
