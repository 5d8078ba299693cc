//! WorkItem - fixed-size unit of work with an inline POD payload.
//!
//! An item is an entry point plus up to [`WORK_ITEM_PAYLOAD_BYTES`] of plain
//! data. Items are copied by value into a queue and never touch the heap.
//! Shared state a task needs (fields, output buffers) travels in the phase
//! environment, reachable through [`WorkContext::environment`].
//!
//! ```text
//! WorkItem (64 bytes)
//! ┌──────────────┬─────┬────────────────────────────────────┐
//! │ entry: fn ptr│ len │ payload: [u8; 48] (bytemuck::Pod)  │
//! └──────────────┴─────┴────────────────────────────────────┘
//!        │
//!        └─► trampoline::<T>: read T from payload, call T::execute
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;

use bytemuck::Pod;

use crate::scheduler::WorkContext;

/// Inline payload capacity of a [`WorkItem`] in bytes.
pub const WORK_ITEM_PAYLOAD_BYTES: usize = 48;

/// A unit of work whose whole state fits in a [`WorkItem`] payload.
///
/// Implementors are plain data (`#[repr(C)]`, `bytemuck::Pod`). A type larger
/// than [`WORK_ITEM_PAYLOAD_BYTES`] fails to compile at [`WorkItem::new`].
pub trait Task: Pod + Send {
  /// Run the task to completion on a worker thread.
  ///
  /// Must not block: a blocked task stalls its worker for the rest of the
  /// phase.
  fn execute(self, ctx: &WorkContext<'_>);
}

type Entry = fn(&[u8], &WorkContext<'_>);

/// Type-erased, copyable unit of work.
#[derive(Clone, Copy)]
pub struct WorkItem {
  entry: Entry,
  len: u8,
  payload: [u8; WORK_ITEM_PAYLOAD_BYTES],
}

/// Compile-time payload size check, evaluated per task type.
struct PayloadFits<T>(PhantomData<T>);

impl<T> PayloadFits<T> {
  const OK: () = assert!(
    size_of::<T>() <= WORK_ITEM_PAYLOAD_BYTES,
    "task payload exceeds WORK_ITEM_PAYLOAD_BYTES"
  );
}

impl WorkItem {
  /// Pack a task into an item.
  #[inline]
  pub fn new<T: Task>(task: T) -> Self {
    #[allow(clippy::let_unit_value)]
    let () = PayloadFits::<T>::OK;

    let bytes = bytemuck::bytes_of(&task);
    let mut payload = [0u8; WORK_ITEM_PAYLOAD_BYTES];
    payload[..bytes.len()].copy_from_slice(bytes);

    Self {
      entry: trampoline::<T>,
      len: bytes.len() as u8,
      payload,
    }
  }

  /// Payload bytes actually used by the task.
  #[inline]
  pub fn payload(&self) -> &[u8] {
    &self.payload[..self.len as usize]
  }

  /// Read the payload back as `T`.
  ///
  /// Returns `None` when the payload size does not match `T`. The size is the
  /// only thing checked, so this is meant for inspection and tests.
  pub fn read_payload<T: Pod>(&self) -> Option<T> {
    bytemuck::try_pod_read_unaligned(self.payload()).ok()
  }

  /// Run the item synchronously.
  #[inline]
  pub fn execute(&self, ctx: &WorkContext<'_>) {
    (self.entry)(self.payload(), ctx)
  }
}

impl fmt::Debug for WorkItem {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WorkItem")
      .field("payload_len", &self.len)
      .finish_non_exhaustive()
  }
}

fn trampoline<T: Task>(payload: &[u8], ctx: &WorkContext<'_>) {
  let task: T = bytemuck::pod_read_unaligned(payload);
  task.execute(ctx);
}

#[cfg(test)]
#[path = "work_item_test.rs"]
mod work_item_test;
