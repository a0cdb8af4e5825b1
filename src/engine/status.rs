//! Shared enabled/disabled flags for a running engine.
//!
//! The table is a single `watch` channel over the flag vector. Its internal lock is
//! held only for the length of a read or a flip, never across a sleep or an
//! emission, so a snapshot always reflects one point in time and schedulers can
//! park on the channel until their own flag turns on.

use tokio::sync::watch;

/// Per-macro enabled flags, indexed by position in the definition list.
#[derive(Debug)]
pub struct StatusTable {
    flags: watch::Sender<Vec<bool>>,
}

impl StatusTable {
    /// Build a table from the initial flag of every macro.
    pub fn new(initial: Vec<bool>) -> Self {
        let (flags, _) = watch::channel(initial);
        Self { flags }
    }

    /// Number of macros in the table.
    pub fn len(&self) -> usize {
        self.flags.borrow().len()
    }

    /// Whether the table has no macros.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current flag of `index`, or `None` when out of range.
    pub fn is_enabled(&self, index: usize) -> Option<bool> {
        self.flags.borrow().get(index).copied()
    }

    /// Atomically invert the flag of `index` and return its new value.
    /// Returns `None` (and changes nothing) when out of range.
    pub fn flip(&self, index: usize) -> Option<bool> {
        let mut flipped = None;
        self.flags.send_if_modified(|flags| match flags.get_mut(index) {
            Some(flag) => {
                *flag = !*flag;
                flipped = Some(*flag);
                true
            }
            None => false,
        });
        flipped
    }

    /// Consistent copy of every flag.
    pub fn snapshot(&self) -> Vec<bool> {
        self.flags.borrow().clone()
    }

    /// Receiver that observes every flip.
    pub fn subscribe(&self) -> watch::Receiver<Vec<bool>> {
        self.flags.subscribe()
    }
}

/// Wait until `index` is enabled. Returns `false` if the table was dropped first.
pub(crate) async fn wait_enabled(rx: &mut watch::Receiver<Vec<bool>>, index: usize) -> bool {
    rx.wait_for(|flags| flags.get(index).copied().unwrap_or(false))
        .await
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn flip_is_an_involution() {
        let table = StatusTable::new(vec![false, true, false]);
        assert_eq!(table.flip(1), Some(false));
        assert_eq!(table.snapshot(), vec![false, false, false]);
        assert_eq!(table.flip(1), Some(true));
        assert_eq!(table.snapshot(), vec![false, true, false]);
    }

    #[test]
    fn flip_out_of_range_changes_nothing() {
        let table = StatusTable::new(vec![true]);
        assert_eq!(table.flip(1), None);
        assert_eq!(table.is_enabled(1), None);
        assert_eq!(table.snapshot(), vec![true]);
        assert_eq!(table.len(), 1);
        assert!(!table.is_empty());
    }

    #[tokio::test]
    async fn waiter_wakes_on_enable() {
        let table = Arc::new(StatusTable::new(vec![false, false]));
        let mut rx = table.subscribe();
        let waiter = tokio::spawn(async move { wait_enabled(&mut rx, 1).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        table.flip(0);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        table.flip(1);
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn waiter_returns_false_when_table_dropped() {
        let table = StatusTable::new(vec![false]);
        let mut rx = table.subscribe();
        drop(table);
        assert!(!wait_enabled(&mut rx, 0).await);
    }

    #[test]
    fn concurrent_flips_are_not_lost() {
        let table = Arc::new(StatusTable::new(vec![false; 4]));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let table = table.clone();
                std::thread::spawn(move || {
                    for _ in 0..1001 {
                        table.flip(i);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(table.snapshot(), vec![true; 4]);
    }
}
