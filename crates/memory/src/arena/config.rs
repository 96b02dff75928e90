//! Arena configuration

/// Configuration for [`Arena`](super::Arena)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Identifier used in exhaustion errors and log events
    pub name: &'static str,

    /// Maintain [`ArenaStats`](super::ArenaStats) counters
    pub track_stats: bool,

    /// Byte written over memory discarded by a region release or
    /// `free_all`. Allocation zero-fills regardless.
    pub release_pattern: Option<u8>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            name: "arena",
            track_stats: cfg!(debug_assertions),
            release_pattern: if cfg!(debug_assertions) { Some(0xDD) } else { None },
        }
    }
}

impl ArenaConfig {
    /// Production configuration - no bookkeeping beyond the cursor
    pub fn production() -> Self {
        Self {
            name: "arena",
            track_stats: false,
            release_pattern: None,
        }
    }

    /// Debug configuration - statistics on, released memory poisoned
    pub fn debug() -> Self {
        Self {
            name: "arena",
            track_stats: true,
            release_pattern: Some(0xDD),
        }
    }

    /// Default configuration under a different name
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert!(!ArenaConfig::production().track_stats);
        assert_eq!(ArenaConfig::production().release_pattern, None);
        assert!(ArenaConfig::debug().track_stats);
        assert_eq!(ArenaConfig::debug().release_pattern, Some(0xDD));
        assert_eq!(ArenaConfig::named("print").name, "print");
    }
}
