//! Reactive state cells.
//!
//! A cell holds one value and notifies subscribers whenever it changes.
//! Reads always see the latest value; updates are read-modify-write against
//! that value, never against a stale copy.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use partysheet_domain::{Character, SharedScore};

/// Shared handle to a reactive value. Clones address the same cell.
#[derive(Debug)]
pub struct StateCell<T> {
    tx: Arc<watch::Sender<T>>,
    /// Serializes read-modify-write cycles.
    updates: Arc<Mutex<()>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
            updates: Arc::clone(&self.updates),
        }
    }
}

impl<T: Clone + PartialEq> StateCell<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx: Arc::new(tx),
            updates: Arc::new(Mutex::new(())),
        }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Reads the current value without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Computes the next value from the current one.
    ///
    /// On `Ok((next, extra))` the value is replaced (subscribers are woken
    /// only if it actually changed) and `extra` is returned. On `Err` the
    /// value is left untouched.
    pub fn try_update<X, E>(
        &self,
        f: impl FnOnce(&T) -> Result<(T, X), E>,
    ) -> Result<X, E> {
        let _serial = self.updates.lock().unwrap_or_else(PoisonError::into_inner);
        let (next, extra) = self.read(f)?;
        self.tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        Ok(extra)
    }

    /// Receiver that resolves `changed()` on every modification.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

/// One character's sheet.
pub type CharacterCell = StateCell<Character>;

/// The party-wide score.
pub type ScoreCell = StateCell<SharedScore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_is_visible_to_every_clone() {
        let cell = StateCell::new(1u32);
        let other = cell.clone();

        let doubled: Result<u32, ()> = cell.try_update(|v| Ok((v + 1, v * 2)));
        assert_eq!(doubled, Ok(2));
        assert_eq!(other.get(), 2);
    }

    #[test]
    fn failed_update_leaves_value_untouched() {
        let cell = StateCell::new(5i32);
        let result: Result<(), &str> = cell.try_update(|_| Err("nope"));
        assert_eq!(result, Err("nope"));
        assert_eq!(cell.get(), 5);
    }

    #[test]
    fn concurrent_updates_are_never_lost() {
        let cell = StateCell::new(0u32);
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let _: Result<(), ()> = cell.try_update(|v| Ok((v + 1, ())));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker");
        }
        assert_eq!(cell.get(), 800);
    }

    #[tokio::test]
    async fn subscribers_are_notified_only_on_real_changes() {
        let cell = StateCell::new(String::from("a"));
        let mut rx = cell.subscribe();

        let _: Result<(), ()> = cell.try_update(|v| Ok((v.clone(), ())));
        assert!(!rx.has_changed().expect("sender alive"));

        let _: Result<(), ()> = cell.try_update(|_| Ok(("b".to_string(), ())));
        assert!(rx.has_changed().expect("sender alive"));
        assert_eq!(*rx.borrow_and_update(), "b");
    }
}
