//! Unique suffixes for staging table names

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Produces the suffix shared by all tables one import creates
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// UTC time in microseconds followed by 64 random bits
///
/// Two concurrent imports into the same destination never share an id.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampIdGenerator;

impl IdGenerator for TimestampIdGenerator {
    fn generate(&self) -> String {
        let micros = chrono::Utc::now().timestamp_micros();
        let (random, _) = Uuid::new_v4().as_u64_pair();
        format!("{}_{:016x}", micros, random)
    }
}

/// Counter-based ids: `1`, `2`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn generate(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_ids_are_unique() {
        let generator = TimestampIdGenerator;
        let first = generator.generate();
        let second = generator.generate();
        assert_ne!(first, second);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn test_no_collisions_over_many_generations() {
        let generator = TimestampIdGenerator;
        let ids: std::collections::HashSet<String> =
            (0..10_000).map(|_| generator.generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_sequential_ids() {
        let generator = SequentialIdGenerator::starting_at(7);
        assert_eq!(generator.generate(), "7");
        assert_eq!(generator.generate(), "8");
    }
}
