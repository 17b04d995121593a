//! Identifier generation
//!
//! Document and page identifiers are decimal epoch-millisecond strings.
//! Within a process they are strictly increasing: a request landing in the
//! same millisecond as the previous one is bumped past it.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Generate a fresh time-derived identifier
pub fn generate() -> String {
    next_after(Utc::now().timestamp_millis()).to_string()
}

/// Reserve the next identifier value at or after `now_ms`
fn next_after(now_ms: i64) -> i64 {
    let mut last = LAST_ID.load(Ordering::Relaxed);
    loop {
        let next = now_ms.max(last + 1);
        match LAST_ID.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_numeric() {
        let id = generate();
        assert!(id.parse::<i64>().is_ok());
    }

    #[test]
    fn test_ids_unique_in_tight_loop() {
        let ids: Vec<String> = (0..1000).map(|_| generate()).collect();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_ids_strictly_increase() {
        let a: i64 = generate().parse().unwrap();
        let b: i64 = generate().parse().unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_ids_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..250).map(|_| generate()).collect::<Vec<_>>()))
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id));
            }
        }
        assert_eq!(all.len(), 1000);
    }
}
