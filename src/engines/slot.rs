//! Build-then-swap holder for a ranker's active index.
//!
//! Readers take an `Arc` snapshot of the published index and score against it
//! without holding any lock. Writers are serialized by an async mutex that
//! also guards the ranker's settings; a new index is built completely, then
//! published by replacing a single pointer.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

pub struct IndexSlot<T, S> {
    active: RwLock<Option<Arc<T>>>,
    settings: Mutex<S>,
    writing: AtomicBool,
    generation: AtomicU64,
}

impl<T, S: Clone> IndexSlot<T, S> {
    pub fn new(settings: S) -> Self {
        Self {
            active: RwLock::new(None),
            settings: Mutex::new(settings),
            writing: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// The currently published index, if any.
    pub fn snapshot(&self) -> Option<Arc<T>> {
        self.active.read().clone()
    }

    pub fn is_published(&self) -> bool {
        self.active.read().is_some()
    }

    /// Published and no writer in flight.
    pub fn is_ready(&self) -> bool {
        self.is_published() && !self.writing.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Wait for exclusive write access. Readiness drops until the returned
    /// writer is dropped, whether or not it publishes.
    pub async fn begin_write(&self) -> SlotWriter<'_, T, S> {
        let settings = self.settings.lock().await;
        self.writing.store(true, Ordering::SeqCst);
        SlotWriter {
            slot: self,
            settings,
        }
    }

    /// Copy of the committed settings.
    pub async fn settings(&self) -> S {
        self.settings.lock().await.clone()
    }
}

pub struct SlotWriter<'a, T, S> {
    slot: &'a IndexSlot<T, S>,
    settings: MutexGuard<'a, S>,
}

impl<'a, T, S> SlotWriter<'a, T, S> {
    /// Settings as of the last successful publish.
    pub fn settings(&self) -> &S {
        &self.settings
    }

    /// Swap in `index` and commit `settings`. Returns the new generation.
    pub fn publish(mut self, index: T, settings: S) -> u64 {
        *self.settings = settings;
        *self.slot.active.write() = Some(Arc::new(index));
        self.slot.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl<'a, T, S> Drop for SlotWriter<'a, T, S> {
    fn drop(&mut self) {
        self.slot.writing.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_not_ready_until_first_publish() {
        let slot: IndexSlot<Vec<u32>, u8> = IndexSlot::new(0);
        assert!(!slot.is_ready());
        assert!(slot.snapshot().is_none());

        let writer = slot.begin_write().await;
        assert_eq!(writer.publish(vec![1, 2, 3], 7), 1);

        assert!(slot.is_ready());
        assert_eq!(slot.snapshot().unwrap().len(), 3);
        assert_eq!(slot.settings().await, 7);
    }

    #[tokio::test]
    async fn test_old_snapshot_survives_swap() {
        let slot: IndexSlot<&'static str, ()> = IndexSlot::new(());
        slot.begin_write().await.publish("old", ());

        let held = slot.snapshot().unwrap();
        slot.begin_write().await.publish("new", ());

        assert_eq!(*held, "old");
        assert_eq!(*slot.snapshot().unwrap(), "new");
        assert_eq!(slot.generation(), 2);
    }

    #[tokio::test]
    async fn test_readiness_drops_during_write_and_recovers_on_abort() {
        let slot: IndexSlot<u32, u32> = IndexSlot::new(1);
        slot.begin_write().await.publish(10, 2);

        let writer = slot.begin_write().await;
        assert!(!slot.is_ready());
        assert_eq!(*slot.snapshot().unwrap(), 10);
        assert_eq!(*writer.settings(), 2);
        drop(writer);

        assert!(slot.is_ready());
        assert_eq!(slot.generation(), 1);
        assert_eq!(slot.settings().await, 2);
    }

    #[tokio::test]
    async fn test_writers_are_serialized() {
        let slot = Arc::new(IndexSlot::<u32, u32>::new(0));
        let first = slot.begin_write().await;

        let contender = Arc::clone(&slot);
        let pending = tokio::spawn(async move {
            let writer = contender.begin_write().await;
            let next = writer.settings() + 1;
            writer.publish(next, next);
        });

        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        first.publish(5, 5);
        pending.await.unwrap();
        assert_eq!(*slot.snapshot().unwrap(), 6);
    }
}
