//! Arena statistics

use core::cell::Cell;

/// Snapshot of an arena's counters
///
/// All zero unless the arena was built with `track_stats` enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Successful `alloc` calls, including the fallback path of `realloc`
    pub allocations: usize,
    /// Requests rejected for lack of space
    pub failed_allocations: usize,
    /// Resizes served by moving the cursor
    pub in_place_resizes: usize,
    /// `realloc` calls that had to copy into a fresh block
    pub relocations: usize,
    /// Regions opened over the arena's lifetime
    pub regions_opened: usize,
    /// Highest cursor position observed
    pub peak_used: usize,
}

/// Live counters behind [`ArenaStats`]
#[derive(Debug, Default)]
pub(super) struct StatCounters {
    enabled: bool,
    allocations: Cell<usize>,
    failed_allocations: Cell<usize>,
    in_place_resizes: Cell<usize>,
    relocations: Cell<usize>,
    regions_opened: Cell<usize>,
    peak_used: Cell<usize>,
}

#[inline]
fn bump(counter: &Cell<usize>) {
    counter.set(counter.get().saturating_add(1));
}

impl StatCounters {
    pub(super) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    #[inline]
    pub(super) fn record_alloc(&self, used: usize) {
        if self.enabled {
            bump(&self.allocations);
            self.record_peak(used);
        }
    }

    #[inline]
    pub(super) fn record_failure(&self) {
        if self.enabled {
            bump(&self.failed_allocations);
        }
    }

    #[inline]
    pub(super) fn record_resize(&self, used: usize) {
        if self.enabled {
            bump(&self.in_place_resizes);
            self.record_peak(used);
        }
    }

    #[inline]
    pub(super) fn record_relocation(&self) {
        if self.enabled {
            bump(&self.relocations);
        }
    }

    #[inline]
    pub(super) fn record_region(&self) {
        if self.enabled {
            bump(&self.regions_opened);
        }
    }

    fn record_peak(&self, used: usize) {
        if used > self.peak_used.get() {
            self.peak_used.set(used);
        }
    }

    pub(super) fn snapshot(&self) -> ArenaStats {
        ArenaStats {
            allocations: self.allocations.get(),
            failed_allocations: self.failed_allocations.get(),
            in_place_resizes: self.in_place_resizes.get(),
            relocations: self.relocations.get(),
            regions_opened: self.regions_opened.get(),
            peak_used: self.peak_used.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_counters_stay_zero() {
        let counters = StatCounters::new(false);
        counters.record_alloc(64);
        counters.record_failure();
        counters.record_region();
        assert_eq!(counters.snapshot(), ArenaStats::default());
    }

    #[test]
    fn test_peak_tracks_maximum() {
        let counters = StatCounters::new(true);
        counters.record_alloc(64);
        counters.record_alloc(32);
        counters.record_resize(128);
        let stats = counters.snapshot();
        assert_eq!(stats.allocations, 2);
        assert_eq!(stats.in_place_resizes, 1);
        assert_eq!(stats.peak_used, 128);
    }
}
