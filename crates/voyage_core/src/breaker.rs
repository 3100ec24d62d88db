//! Circuit breaker over per-key attempt counters.
//!
//! Stateless: the counters live in the caller's state and come back updated.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerVerdict<K: Ord> {
    pub proceed: bool,
    /// Attempts recorded for the key after this call.
    pub attempts: u32,
    pub counts: BTreeMap<K, u32>,
}

/// Admits `key` while it has fewer than `max` recorded attempts, incrementing
/// its counter by exactly one. At `max` or beyond it refuses and leaves the
/// counters untouched.
pub fn guard<K: Ord + Clone>(key: &K, counts: &BTreeMap<K, u32>, max: u32) -> BreakerVerdict<K> {
    let current = counts.get(key).copied().unwrap_or(0);
    if current >= max {
        return BreakerVerdict {
            proceed: false,
            attempts: current,
            counts: counts.clone(),
        };
    }
    let mut updated = counts.clone();
    updated.insert(key.clone(), current + 1);
    BreakerVerdict {
        proceed: true,
        attempts: current + 1,
        counts: updated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_opens_after_exactly_max_attempts() {
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for expected in 1..=3 {
            let verdict = guard(&"weather", &counts, 3);
            assert!(verdict.proceed, "attempt {expected} should proceed");
            assert_eq!(verdict.attempts, expected);
            counts = verdict.counts;
        }
        let verdict = guard(&"weather", &counts, 3);
        assert!(!verdict.proceed);
        assert_eq!(verdict.counts, counts);
    }

    #[test]
    fn test_guard_keys_are_independent() {
        let counts = BTreeMap::from([("route", 3)]);
        let verdict = guard(&"bunker", &counts, 3);
        assert!(verdict.proceed);
        assert_eq!(verdict.counts.get("route"), Some(&3));
        assert_eq!(verdict.counts.get("bunker"), Some(&1));
    }

    #[test]
    fn test_guard_with_zero_max_never_proceeds() {
        let verdict = guard(&"route", &BTreeMap::new(), 0);
        assert!(!verdict.proceed);
        assert!(verdict.counts.is_empty());
    }
}
