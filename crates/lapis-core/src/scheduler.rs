//! Priority-tiered execution.
//!
//! Work items are grouped into [`Tiers`] keyed by an integer priority. A tier
//! runs every one of its items concurrently and waits for all of them before
//! the next tier starts, so lower priorities always complete first:
//!
//! ```text
//! priority 0:  [a, b]   ── a ║ b ──┐ barrier
//! priority 5:  [c]                  └── c
//! ```
//!
//! Tiers are built once (startup loaders, per-route hooks) and only read
//! while executing.

use std::future::Future;

use futures::future::join_all;

/// Tier used by items that do not choose a priority.
pub const DEFAULT_PRIORITY: i32 = 0;

/// An item that selects the tier it runs in.
pub trait Prioritized {
    /// Lower values run earlier.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }
}

impl<T: Prioritized + ?Sized> Prioritized for std::sync::Arc<T> {
    fn priority(&self) -> i32 {
        (**self).priority()
    }
}

impl<T: Prioritized + ?Sized> Prioritized for Box<T> {
    fn priority(&self) -> i32 {
        (**self).priority()
    }
}

/// One priority level and its items in insertion order.
#[derive(Debug, Clone)]
pub struct Tier<T> {
    priority: i32,
    items: Vec<T>,
}

impl<T> Tier<T> {
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }
}

/// Items grouped by ascending priority.
#[derive(Debug, Clone)]
pub struct Tiers<T> {
    tiers: Vec<Tier<T>>,
}

impl<T> Default for Tiers<T> {
    fn default() -> Self {
        Self { tiers: Vec::new() }
    }
}

impl<T> Tiers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `item` to the tier for `priority`, creating it if needed.
    pub fn push(&mut self, priority: i32, item: T) {
        match self.tiers.binary_search_by_key(&priority, |tier| tier.priority) {
            Ok(index) => self.tiers[index].items.push(item),
            Err(index) => self.tiers.insert(
                index,
                Tier {
                    priority,
                    items: vec![item],
                },
            ),
        }
    }

    /// Appends every item of `other`, keeping its tier assignment.
    pub fn extend(&mut self, other: Tiers<T>) {
        for tier in other.tiers {
            for item in tier.items {
                self.push(tier.priority, item);
            }
        }
    }

    /// Tiers in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &Tier<T>> {
        self.tiers.iter()
    }

    /// Every item, tier by tier.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.tiers.iter().flat_map(|tier| tier.items.iter())
    }

    /// The distinct priorities in ascending order.
    pub fn priorities(&self) -> Vec<i32> {
        self.tiers.iter().map(|tier| tier.priority).collect()
    }

    /// Total number of items.
    pub fn len(&self) -> usize {
        self.tiers.iter().map(|tier| tier.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl<T: Prioritized> Tiers<T> {
    /// Adds `item` to the tier it asks for.
    pub fn insert(&mut self, item: T) {
        self.push(item.priority(), item);
    }
}

impl<T: Prioritized> FromIterator<T> for Tiers<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tiers = Self::new();
        for item in iter {
            tiers.insert(item);
        }
        tiers
    }
}

/// Runs `f` over every item, one tier at a time.
///
/// Items of a tier run concurrently and the tier completes only when all of
/// them have finished. If any item of a tier fails, the first failure in
/// insertion order is returned and later tiers never start.
pub async fn run_tiers<'a, T, F, Fut, E>(tiers: &'a Tiers<T>, f: F) -> Result<(), E>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    for tier in tiers.iter() {
        let results = join_all(tier.items.iter().map(&f)).await;
        if let Some(err) = results.into_iter().find_map(Result::err) {
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    struct Item {
        name: &'static str,
        priority: i32,
        delay_ms: u64,
    }

    impl Prioritized for Item {
        fn priority(&self) -> i32 {
            self.priority
        }
    }

    fn item(name: &'static str, priority: i32, delay_ms: u64) -> Item {
        Item {
            name,
            priority,
            delay_ms,
        }
    }

    #[test]
    fn test_tiers_sorted_by_priority() {
        let tiers: Tiers<Item> = vec![item("c", 5, 0), item("a", 0, 0), item("z", -3, 0), item("b", 0, 0)]
            .into_iter()
            .collect();

        assert_eq!(tiers.priorities(), vec![-3, 0, 5]);
        let names: Vec<_> = tiers.items().map(|i| i.name).collect();
        assert_eq!(names, vec!["z", "a", "b", "c"]);
        assert_eq!(tiers.len(), 4);
    }

    #[tokio::test]
    async fn test_tier_barrier() {
        let tiers: Tiers<Item> = vec![item("a", 0, 30), item("b", 0, 10), item("c", 5, 0)]
            .into_iter()
            .collect();
        let log = Arc::new(Mutex::new(Vec::new()));

        run_tiers(&tiers, |it| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(format!("start {}", it.name));
                tokio::time::sleep(Duration::from_millis(it.delay_ms)).await;
                log.lock().push(format!("end {}", it.name));
                Ok::<_, ()>(())
            }
        })
        .await
        .unwrap();

        let log = log.lock().clone();
        let start_c = log.iter().position(|e| e == "start c").unwrap();
        let end_a = log.iter().position(|e| e == "end a").unwrap();
        let end_b = log.iter().position(|e| e == "end b").unwrap();
        assert!(end_a < start_c);
        assert!(end_b < start_c);
        // a and b overlap within their tier
        let start_b = log.iter().position(|e| e == "start b").unwrap();
        assert!(start_b < end_a);
    }

    #[tokio::test]
    async fn test_failure_stops_later_tiers() {
        let tiers: Tiers<Item> = vec![item("a", 0, 0), item("bad", 0, 0), item("c", 1, 0)]
            .into_iter()
            .collect();
        let ran = Arc::new(Mutex::new(Vec::new()));

        let result = run_tiers(&tiers, |it| {
            let ran = Arc::clone(&ran);
            async move {
                ran.lock().push(it.name);
                if it.name == "bad" { Err(it.name) } else { Ok(()) }
            }
        })
        .await;

        assert_eq!(result, Err("bad"));
        assert_eq!(*ran.lock(), vec!["a", "bad"]);
    }

    #[tokio::test]
    async fn test_empty_tiers() {
        let tiers: Tiers<Item> = Tiers::new();
        assert!(tiers.is_empty());
        let result: Result<(), ()> = run_tiers(&tiers, |_| async { Ok(()) }).await;
        assert!(result.is_ok());
    }
}
