//! Per-category list of pending work items.
//!
//! Every operation takes the queue's lock for a short, copy-only critical
//! section. Pops return the most recently pushed items first (LIFO); callers
//! must not rely on ordering.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::WorkItem;

/// Lock-protected stack of pending [`WorkItem`]s.
#[derive(Debug, Default)]
pub struct WorkQueue {
  items: Mutex<Vec<WorkItem>>,
}

impl WorkQueue {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      items: Mutex::new(Vec::with_capacity(capacity)),
    }
  }

  /// Item execution never panics without aborting the process, so a poisoned
  /// lock still guards a consistent vector.
  #[inline]
  fn lock(&self) -> MutexGuard<'_, Vec<WorkItem>> {
    self.items.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Append items in order.
  pub fn push_many(&self, items: &[WorkItem]) {
    if items.is_empty() {
      return;
    }
    self.lock().extend_from_slice(items);
  }

  /// Remove the most recently pushed item.
  pub fn pop(&self) -> Option<WorkItem> {
    self.lock().pop()
  }

  /// Move up to `max` items into `out`, newest first.
  /// Returns the number of items moved.
  pub fn pop_up_to<E: Extend<WorkItem>>(&self, max: usize, out: &mut E) -> usize {
    let mut items = self.lock();
    let count = max.min(items.len());
    let start = items.len() - count;
    out.extend(items.drain(start..).rev());
    count
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  /// Drop all pending items and release the backing allocation.
  /// Returns the number of items dropped.
  pub fn release(&self) -> usize {
    let mut items = self.lock();
    let dropped = items.len();
    *items = Vec::new();
    dropped
  }
}

#[cfg(test)]
#[path = "work_queue_test.rs"]
mod work_queue_test;
