//! Phase-driven worker pool.
//!
//! Workers park on a per-worker wake channel. [`Scheduler::start`] wakes all
//! of them for one category, each drains the category's queue, and `start`
//! returns once every worker has acknowledged on the shared completion
//! channel.
//!
//! ```text
//!  Scheduler                       worker i
//!  ─────────                       ────────
//!  start(cat) ── Signal::Phase ──► wake.recv()
//!                                  loop {
//!                                    pop ─► execute ─► outstanding -= 1
//!                                    queue empty && outstanding == 0 → break
//!                                  }
//!  done.recv() × N ◄── PhaseAck ── done.send()
//! ```
//!
//! # Completion
//!
//! Every category has an outstanding-item counter, incremented when items are
//! submitted (before they become visible in the queue) and decremented after
//! an item finished executing. Items may submit more items into the running
//! category; because children are counted before their parent is retired, the
//! counter only reaches zero once the whole fan-out has completed.
//!
//! A worker that finds the queue empty spins briefly, then parks on the
//! category's idle gate. The gate is signalled whenever items are pushed
//! into the category and when its counter drops to zero.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{self as atomic, AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{self as channel, Receiver, Sender};
use smallvec::SmallVec;
use tracing::{debug, error, trace, warn};
use web_time::Instant;

use crate::{
  PhaseBudget, SchedulerConfig, SchedulerError, SchedulerMetrics, WorkCategory, WorkItem,
  WorkQueue,
};

/// Marker stored in `Shared::active` while no phase runs.
const NO_ACTIVE_PHASE: usize = usize::MAX;

/// Idle polls that spin before a worker parks.
const SPIN_LIMIT: u32 = 64;

/// Longest single park. Bounds the cost of a notification racing the park.
const PARK_TIMEOUT: Duration = Duration::from_millis(1);

thread_local! {
  /// Address of the `Shared` state owned by this worker's scheduler.
  static WORKER_OF: Cell<usize> = const { Cell::new(0) };
}

// =============================================================================
// Shared state
// =============================================================================

/// Where idle workers of one category sleep during a phase.
struct IdleGate {
  sleepers: AtomicUsize,
  lock: Mutex<()>,
  wake: Condvar,
}

impl IdleGate {
  fn new() -> Self {
    Self {
      sleepers: AtomicUsize::new(0),
      lock: Mutex::new(()),
      wake: Condvar::new(),
    }
  }

  /// Sleep until notified or `timeout` elapses, unless `ready` already holds
  /// once the gate is locked.
  fn park(&self, timeout: Duration, ready: impl Fn() -> bool) {
    self.sleepers.fetch_add(1, Ordering::SeqCst);
    let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
    if !ready() {
      drop(
        self
          .wake
          .wait_timeout(guard, timeout)
          .unwrap_or_else(PoisonError::into_inner),
      );
    }
    self.sleepers.fetch_sub(1, Ordering::SeqCst);
  }

  fn notify(&self) {
    atomic::fence(Ordering::SeqCst);
    if self.sleepers.load(Ordering::SeqCst) > 0 {
      let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
      self.wake.notify_all();
    }
  }

  #[cfg(test)]
  fn sleepers(&self) -> usize {
    self.sleepers.load(Ordering::SeqCst)
  }
}

struct Shared {
  queues: Box<[WorkQueue]>,
  outstanding: Box<[AtomicUsize]>,
  gates: Box<[IdleGate]>,
  running: AtomicBool,
  active: AtomicUsize,
}

impl Shared {
  fn new(categories: usize) -> Self {
    Self {
      queues: (0..categories).map(|_| WorkQueue::new()).collect(),
      outstanding: (0..categories).map(|_| AtomicUsize::new(0)).collect(),
      gates: (0..categories).map(|_| IdleGate::new()).collect(),
      running: AtomicBool::new(true),
      active: AtomicUsize::new(NO_ACTIVE_PHASE),
    }
  }

  #[inline]
  fn index_of(&self, category: WorkCategory) -> Result<usize, SchedulerError> {
    let index = category.index();
    if index < self.queues.len() {
      Ok(index)
    } else {
      Err(SchedulerError::UnknownCategory {
        category: index,
        count: self.queues.len(),
      })
    }
  }

  /// Count first, then publish, so a running phase never observes a zero
  /// counter while these items are still pending.
  #[inline]
  fn push(&self, index: usize, items: &[WorkItem]) {
    if items.is_empty() {
      return;
    }
    self.outstanding[index].fetch_add(items.len(), Ordering::AcqRel);
    self.queues[index].push_many(items);
    self.gates[index].notify();
  }

  /// Retire one executed item, waking parked workers on the last one.
  #[inline]
  fn retire(&self, index: usize) {
    if self.outstanding[index].fetch_sub(1, Ordering::AcqRel) == 1 {
      self.gates[index].notify();
    }
  }

  fn is_own_worker_thread(&self) -> bool {
    WORKER_OF.with(|owner| owner.get() == self as *const Shared as usize)
  }

  /// Submission from outside the pool.
  fn submit_external(&self, category: WorkCategory, items: &[WorkItem]) -> Result<(), SchedulerError> {
    if !self.running.load(Ordering::Acquire) {
      return Err(SchedulerError::ShutDown);
    }
    let index = self.index_of(category)?;
    debug_assert!(
      self.active.load(Ordering::Acquire) != index || self.is_own_worker_thread(),
      "external submit into category {index} while its phase is running"
    );
    self.push(index, items);
    Ok(())
  }
}

// =============================================================================
// WorkContext - what a running item can see
// =============================================================================

/// Execution context handed to every running [`Task`](crate::Task).
pub struct WorkContext<'a> {
  shared: &'a Shared,
  category: WorkCategory,
  env: &'a (dyn Any + Send + Sync),
  worker_index: usize,
}

impl WorkContext<'_> {
  /// Category of the running phase.
  #[inline]
  pub fn category(&self) -> WorkCategory {
    self.category
  }

  /// Index of the worker executing this item, in `0..thread_count`.
  #[inline]
  pub fn worker_index(&self) -> usize {
    self.worker_index
  }

  /// Phase environment, if it is an `E`.
  #[inline]
  pub fn environment<E: Any>(&self) -> Option<&E> {
    self.env.downcast_ref::<E>()
  }

  /// Submit items into the running category. They are executed before the
  /// current phase ends (unless its time slice runs out first).
  #[inline]
  pub fn submit(&self, items: &[WorkItem]) {
    self.shared.push(self.category.index(), items);
  }

  /// Submit items into another category, buffered for its next phase.
  pub fn submit_to(&self, category: WorkCategory, items: &[WorkItem]) -> Result<(), SchedulerError> {
    let index = self.shared.index_of(category)?;
    self.shared.push(index, items);
    Ok(())
  }
}

// =============================================================================
// Phase plumbing
// =============================================================================

#[derive(Clone)]
struct PhaseSpec {
  category: WorkCategory,
  deadline: Option<Instant>,
  env: Arc<dyn Any + Send + Sync>,
}

enum Signal {
  Phase(PhaseSpec),
  /// Wake without work; used at shutdown so workers observe `running`.
  Wake,
}

struct PhaseAck {
  executed: usize,
}

/// Result of one [`Scheduler::start`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseReport {
  /// Category that was drained.
  pub category: WorkCategory,
  /// Items executed during the phase, across all workers.
  pub executed: usize,
  /// Items still pending when the phase ended (non-zero only for slices).
  pub remaining: usize,
  /// Wall time from wake to the last acknowledgement.
  pub elapsed: Duration,
}

impl PhaseReport {
  /// True when nothing is left in the category.
  #[inline]
  pub fn is_drained(&self) -> bool {
    self.remaining == 0
  }
}

// =============================================================================
// Worker loop
// =============================================================================

fn worker_main(
  index: usize,
  shared: Arc<Shared>,
  wake: Receiver<Signal>,
  done: Sender<PhaseAck>,
  pop_batch: usize,
) {
  WORKER_OF.with(|owner| owner.set(Arc::as_ptr(&shared) as usize));

  while let Ok(signal) = wake.recv() {
    if !shared.running.load(Ordering::Acquire) {
      break;
    }
    let Signal::Phase(phase) = signal else {
      continue;
    };

    let executed = run_phase(index, &shared, &phase, pop_batch);
    if done.send(PhaseAck { executed }).is_err() {
      break;
    }
  }

  trace!(worker = index, "worker exiting");
}

fn run_phase(index: usize, shared: &Shared, phase: &PhaseSpec, pop_batch: usize) -> usize {
  let category = phase.category.index();
  let queue = &shared.queues[category];
  let outstanding = &shared.outstanding[category];
  let gate = &shared.gates[category];
  let ctx = WorkContext {
    shared,
    category: phase.category,
    env: &*phase.env,
    worker_index: index,
  };

  let mut batch: SmallVec<[WorkItem; 8]> = SmallVec::new();
  let mut executed = 0;
  let mut idle_polls = 0u32;

  loop {
    let now = Instant::now();
    if phase.deadline.is_some_and(|deadline| now >= deadline) {
      break;
    }

    if queue.pop_up_to(pop_batch, &mut batch) == 0 {
      // Other workers may still be running items that fan out.
      if outstanding.load(Ordering::Acquire) == 0 {
        break;
      }
      if idle_polls < SPIN_LIMIT {
        std::hint::spin_loop();
        idle_polls += 1;
      } else {
        let timeout = match phase.deadline {
          Some(deadline) => PARK_TIMEOUT.min(deadline.saturating_duration_since(now)),
          None => PARK_TIMEOUT,
        };
        gate.park(timeout, || !queue.is_empty() || outstanding.load(Ordering::Acquire) == 0);
      }
      continue;
    }

    idle_polls = 0;
    for item in batch.drain(..) {
      execute_item(&item, &ctx);
      shared.retire(category);
      executed += 1;
    }
  }

  executed
}

/// A panicking item is fatal for the whole process.
fn execute_item(item: &WorkItem, ctx: &WorkContext<'_>) {
  if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| item.execute(ctx))) {
    let message = payload
      .downcast_ref::<&str>()
      .copied()
      .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
      .unwrap_or("<non-string panic payload>");
    error!(
      worker = ctx.worker_index,
      category = ctx.category.index(),
      reason = message,
      "work item panicked, aborting"
    );
    std::process::abort();
  }
}

// =============================================================================
// Scheduler
// =============================================================================

struct Worker {
  handle: JoinHandle<()>,
  wake: Sender<Signal>,
}

/// Fixed pool of worker threads driven through wake → drain → sleep phases.
///
/// Explicitly constructed and owned; hand a [`Submitter`] to code on other
/// threads that only needs to enqueue work.
pub struct Scheduler {
  shared: Arc<Shared>,
  workers: Vec<Worker>,
  done: Receiver<PhaseAck>,
  config: SchedulerConfig,
  metrics: SchedulerMetrics,
}

impl Scheduler {
  /// Spawn `config.thread_count` workers parked until the first phase.
  ///
  /// Fails if the config is invalid or a worker thread cannot be spawned; in
  /// the latter case the workers spawned so far are shut down again. There is
  /// no degraded pool: callers are expected to treat
  /// [`SchedulerError::SpawnWorker`] as fatal.
  pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
    config.validate()?;

    let shared = Arc::new(Shared::new(config.categories));
    let (done_tx, done_rx) = channel::unbounded();

    let mut scheduler = Self {
      shared,
      workers: Vec::with_capacity(config.thread_count),
      done: done_rx,
      config,
      metrics: SchedulerMetrics::default(),
    };

    for index in 0..scheduler.config.thread_count {
      let (wake_tx, wake_rx) = channel::unbounded();
      let shared = Arc::clone(&scheduler.shared);
      let done = done_tx.clone();
      let pop_batch = scheduler.config.pop_batch;

      let handle = thread::Builder::new()
        .name(format!("{}-{index}", scheduler.config.thread_name))
        .spawn(move || worker_main(index, shared, wake_rx, done, pop_batch))
        .map_err(|source| SchedulerError::SpawnWorker { index, source })?;

      scheduler.workers.push(Worker {
        handle,
        wake: wake_tx,
      });
    }

    debug!(
      threads = scheduler.config.thread_count,
      categories = scheduler.config.categories,
      "scheduler started"
    );
    Ok(scheduler)
  }

  /// Number of worker threads.
  #[inline]
  pub fn thread_count(&self) -> usize {
    self.workers.len()
  }

  /// Number of work categories.
  #[inline]
  pub fn category_count(&self) -> usize {
    self.shared.queues.len()
  }

  pub fn config(&self) -> &SchedulerConfig {
    &self.config
  }

  /// Phase statistics collected so far.
  pub fn metrics(&self) -> &SchedulerMetrics {
    &self.metrics
  }

  /// Handle for submitting from other threads.
  pub fn submitter(&self) -> Submitter {
    Submitter {
      shared: Arc::clone(&self.shared),
    }
  }

  /// Append items to a category's queue. Never blocks on workers.
  pub fn submit(&self, category: WorkCategory, items: &[WorkItem]) -> Result<(), SchedulerError> {
    self.shared.submit_external(category, items)
  }

  /// Items waiting in a category's queue.
  pub fn pending(&self, category: WorkCategory) -> Result<usize, SchedulerError> {
    let index = self.shared.index_of(category)?;
    Ok(self.shared.queues[index].len())
  }

  /// Items submitted to a category and not yet finished.
  pub fn outstanding(&self, category: WorkCategory) -> Result<usize, SchedulerError> {
    let index = self.shared.index_of(category)?;
    Ok(self.shared.outstanding[index].load(Ordering::Acquire))
  }

  /// Run one phase for `category` with no environment.
  pub fn start(
    &mut self,
    category: WorkCategory,
    budget: PhaseBudget,
  ) -> Result<PhaseReport, SchedulerError> {
    self.start_with_env(category, budget, Arc::new(()))
  }

  /// Run one phase for `category`, sharing `env` with every executing item.
  ///
  /// Blocks until all workers are parked again.
  pub fn start_with_env(
    &mut self,
    category: WorkCategory,
    budget: PhaseBudget,
    env: Arc<dyn Any + Send + Sync>,
  ) -> Result<PhaseReport, SchedulerError> {
    let index = self.shared.index_of(category)?;
    if self.workers.is_empty() {
      return Err(SchedulerError::ShutDown);
    }

    let started = Instant::now();
    let deadline = budget
      .time_slice(self.config.slice_granularity)
      .map(|slice| started + slice);
    let phase = PhaseSpec {
      category,
      deadline,
      env,
    };

    trace!(category = index, ?budget, "phase wake");
    self.shared.active.store(index, Ordering::Release);
    let result = self.wake_and_wait(phase);
    self.shared.active.store(NO_ACTIVE_PHASE, Ordering::Release);
    let executed = result?;

    let report = PhaseReport {
      category,
      executed,
      remaining: self.shared.outstanding[index].load(Ordering::Acquire),
      elapsed: started.elapsed(),
    };
    self.metrics.record_phase(&report);

    debug!(
      category = index,
      executed = report.executed,
      remaining = report.remaining,
      elapsed_us = report.elapsed.as_micros() as u64,
      "phase complete"
    );
    Ok(report)
  }

  fn wake_and_wait(&self, phase: PhaseSpec) -> Result<usize, SchedulerError> {
    let mut woken = 0;
    let mut lost = None;
    for (index, worker) in self.workers.iter().enumerate() {
      if worker.wake.send(Signal::Phase(phase.clone())).is_ok() {
        woken += 1;
      } else {
        lost.get_or_insert(index);
      }
    }

    // Collect every acknowledgement that is owed, even on failure, so no
    // stale ack leaks into the next phase.
    let mut executed = 0;
    for _ in 0..woken {
      match self.done.recv() {
        Ok(ack) => executed += ack.executed,
        Err(_) => return Err(SchedulerError::WorkerLost(lost.unwrap_or(0))),
      }
    }

    match lost {
      Some(index) => Err(SchedulerError::WorkerLost(index)),
      None => Ok(executed),
    }
  }

  /// Stop and join every worker, then release queue memory.
  pub fn shutdown(mut self) {
    self.stop_workers();
  }

  fn stop_workers(&mut self) {
    if self.workers.is_empty() {
      return;
    }

    self.shared.running.store(false, Ordering::Release);
    for worker in &self.workers {
      // A worker that already exited has dropped its receiver.
      let _ = worker.wake.send(Signal::Wake);
    }
    for (index, worker) in self.workers.drain(..).enumerate() {
      if worker.handle.join().is_err() {
        warn!(worker = index, "worker thread terminated abnormally");
      }
    }

    let dropped: usize = self.shared.queues.iter().map(WorkQueue::release).sum();
    debug!(dropped, "scheduler shut down");
  }
}

impl Drop for Scheduler {
  fn drop(&mut self) {
    self.stop_workers();
  }
}

// =============================================================================
// Submitter
// =============================================================================

/// Cloneable, thread-safe handle that can only enqueue work.
#[derive(Clone)]
pub struct Submitter {
  shared: Arc<Shared>,
}

impl Submitter {
  /// Same contract as [`Scheduler::submit`]. Fails once the scheduler has
  /// shut down.
  pub fn submit(&self, category: WorkCategory, items: &[WorkItem]) -> Result<(), SchedulerError> {
    self.shared.submit_external(category, items)
  }
}

// =============================================================================
// Test support
// =============================================================================

/// Run `f` with a context that is not attached to any worker pool.
#[cfg(test)]
pub(crate) fn with_detached_context<R>(
  env: &(dyn Any + Send + Sync),
  f: impl FnOnce(&WorkContext<'_>) -> R,
) -> R {
  let shared = Shared::new(1);
  let ctx = WorkContext {
    shared: &shared,
    category: WorkCategory::new(0),
    env,
    worker_index: 0,
  };
  f(&ctx)
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod scheduler_test;
