use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytemuck::{Pod, Zeroable};
use web_time::Instant;

use super::*;
use crate::Task;

/// Increments the shared counter by one.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct CountTask {
  id: u32,
}

impl Task for CountTask {
  fn execute(self, ctx: &WorkContext<'_>) {
    if let Some(counter) = ctx.environment::<AtomicUsize>() {
      counter.fetch_add(1, Ordering::Relaxed);
    }
  }
}

/// Counts itself, then spawns two children until `depth` reaches zero.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct FanOutTask {
  depth: u32,
}

impl Task for FanOutTask {
  fn execute(self, ctx: &WorkContext<'_>) {
    if let Some(counter) = ctx.environment::<AtomicUsize>() {
      counter.fetch_add(1, Ordering::Relaxed);
    }
    if self.depth > 0 {
      let child = WorkItem::new(FanOutTask {
        depth: self.depth - 1,
      });
      ctx.submit(&[child, child]);
    }
  }
}

/// Busy-waits for the given number of microseconds, then counts itself.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct SpinTask {
  micros: u32,
}

impl Task for SpinTask {
  fn execute(self, ctx: &WorkContext<'_>) {
    let until = Instant::now() + Duration::from_micros(self.micros as u64);
    while Instant::now() < until {
      std::hint::spin_loop();
    }
    if let Some(counter) = ctx.environment::<AtomicUsize>() {
      counter.fetch_add(1, Ordering::Relaxed);
    }
  }
}

/// Spins, then submits `children` counting items into the running phase.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct LateFanOutTask {
  micros: u32,
  children: u32,
}

impl Task for LateFanOutTask {
  fn execute(self, ctx: &WorkContext<'_>) {
    SpinTask { micros: self.micros }.execute(ctx);
    ctx.submit(&count_items(self.children));
  }
}

/// Records the highest worker index seen.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct WorkerIndexTask {
  _pad: u32,
}

impl Task for WorkerIndexTask {
  fn execute(self, ctx: &WorkContext<'_>) {
    if let Some(max_index) = ctx.environment::<AtomicUsize>() {
      max_index.fetch_max(ctx.worker_index(), Ordering::Relaxed);
    }
  }
}

fn count_items(n: u32) -> Vec<WorkItem> {
  (0..n).map(|id| WorkItem::new(CountTask { id })).collect()
}

fn scheduler(threads: usize) -> Scheduler {
  Scheduler::new(SchedulerConfig::default().with_thread_count(threads))
    .expect("scheduler should start")
}

const CAT0: WorkCategory = WorkCategory::new(0);
const CAT1: WorkCategory = WorkCategory::new(1);

// =========================================================================
// Lifecycle
// =========================================================================

#[test]
fn test_shutdown_right_after_init() {
  let scheduler = scheduler(4);
  assert_eq!(scheduler.thread_count(), 4);
  scheduler.shutdown();
}

#[test]
fn test_drop_without_shutdown_joins_workers() {
  let scheduler = scheduler(3);
  drop(scheduler);
}

#[test]
fn test_invalid_config_rejected() {
  let result = Scheduler::new(SchedulerConfig::default().with_thread_count(0));
  assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}

#[test]
fn test_shutdown_with_buffered_work() {
  let scheduler = scheduler(2);
  scheduler.submit(CAT0, &count_items(10)).unwrap();
  assert_eq!(scheduler.pending(CAT0).unwrap(), 10);
  scheduler.shutdown();
}

// =========================================================================
// Exactness
// =========================================================================

/// M items across N workers run exactly once each.
#[test]
fn test_each_item_runs_exactly_once() {
  for threads in [1, 2, 4, 8] {
    let mut scheduler = scheduler(threads);
    let counter = Arc::new(AtomicUsize::new(0));

    scheduler.submit(CAT0, &count_items(1000)).unwrap();
    let report = scheduler
      .start_with_env(CAT0, PhaseBudget::Drain, counter.clone())
      .unwrap();

    assert_eq!(counter.load(Ordering::Relaxed), 1000, "threads = {threads}");
    assert_eq!(report.executed, 1000);
    assert_eq!(report.remaining, 0);
    assert!(report.is_drained());
    assert_eq!(scheduler.pending(CAT0).unwrap(), 0);
    assert_eq!(scheduler.outstanding(CAT0).unwrap(), 0);
  }
}

/// Items submitted from inside a phase finish before `start` returns.
#[test]
fn test_recursive_fan_out_drains() {
  let mut scheduler = scheduler(4);
  let counter = Arc::new(AtomicUsize::new(0));
  let depth = 10;

  scheduler
    .submit(CAT0, &[WorkItem::new(FanOutTask { depth })])
    .unwrap();
  let report = scheduler
    .start_with_env(CAT0, PhaseBudget::Drain, counter.clone())
    .unwrap();

  let expected = (1usize << (depth + 1)) - 1;
  assert_eq!(counter.load(Ordering::Relaxed), expected);
  assert_eq!(report.executed, expected);
  assert!(report.is_drained());
}

#[test]
fn test_batched_pops_still_exact() {
  let mut scheduler = Scheduler::new(
    SchedulerConfig::default()
      .with_thread_count(3)
      .with_pop_batch(16),
  )
  .unwrap();
  let counter = Arc::new(AtomicUsize::new(0));

  scheduler
    .submit(CAT0, &[WorkItem::new(FanOutTask { depth: 8 })])
    .unwrap();
  scheduler.submit(CAT0, &count_items(100)).unwrap();
  scheduler
    .start_with_env(CAT0, PhaseBudget::Drain, counter.clone())
    .unwrap();

  assert_eq!(counter.load(Ordering::Relaxed), 511 + 100);
}

#[test]
fn test_empty_phase_returns_immediately() {
  let mut scheduler = scheduler(2);
  let report = scheduler.start(CAT0, PhaseBudget::Drain).unwrap();
  assert_eq!(report.executed, 0);
  assert!(report.is_drained());
}

#[test]
fn test_repeated_phases() {
  let mut scheduler = scheduler(4);
  let counter = Arc::new(AtomicUsize::new(0));

  for round in 1..=20 {
    scheduler.submit(CAT0, &count_items(50)).unwrap();
    scheduler
      .start_with_env(CAT0, PhaseBudget::Drain, counter.clone())
      .unwrap();
    assert_eq!(counter.load(Ordering::Relaxed), round * 50);
  }
}

// =========================================================================
// Categories
// =========================================================================

/// Work in an inactive category waits for its own phase.
#[test]
fn test_inactive_category_buffers_work() {
  let mut scheduler = scheduler(2);
  let counter = Arc::new(AtomicUsize::new(0));

  scheduler.submit(CAT1, &count_items(25)).unwrap();
  let report = scheduler
    .start_with_env(CAT0, PhaseBudget::Drain, counter.clone())
    .unwrap();
  assert_eq!(report.executed, 0);
  assert_eq!(counter.load(Ordering::Relaxed), 0);
  assert_eq!(scheduler.pending(CAT1).unwrap(), 25);

  let report = scheduler
    .start_with_env(CAT1, PhaseBudget::Drain, counter.clone())
    .unwrap();
  assert_eq!(report.executed, 25);
  assert_eq!(counter.load(Ordering::Relaxed), 25);
}

#[test]
fn test_unknown_category_rejected() {
  let mut scheduler = scheduler(1);
  let bogus = WorkCategory::new(scheduler.category_count());

  assert!(matches!(
    scheduler.submit(bogus, &count_items(1)),
    Err(SchedulerError::UnknownCategory { .. })
  ));
  assert!(matches!(
    scheduler.start(bogus, PhaseBudget::Drain),
    Err(SchedulerError::UnknownCategory { .. })
  ));
  assert!(scheduler.pending(bogus).is_err());
}

// =========================================================================
// Budgets
// =========================================================================

/// A time slice leaves unfinished work queued; a later drain finishes it.
#[test]
fn test_time_slice_leaves_work_for_later() {
  let mut scheduler = Scheduler::new(
    SchedulerConfig::default()
      .with_thread_count(1)
      .with_slice_granularity(Duration::from_millis(1)),
  )
  .unwrap();
  let counter = Arc::new(AtomicUsize::new(0));
  let items: Vec<WorkItem> = (0..50)
    .map(|_| WorkItem::new(SpinTask { micros: 2_000 }))
    .collect();

  scheduler.submit(CAT0, &items).unwrap();
  let sliced = scheduler
    .start_with_env(
      CAT0,
      PhaseBudget::Slice(Duration::from_millis(1)),
      counter.clone(),
    )
    .unwrap();

  assert!(sliced.remaining > 0);
  assert_eq!(sliced.executed + sliced.remaining, 50);
  assert_eq!(scheduler.pending(CAT0).unwrap(), sliced.remaining);

  let drained = scheduler
    .start_with_env(CAT0, PhaseBudget::Drain, counter.clone())
    .unwrap();
  assert!(drained.is_drained());
  assert_eq!(counter.load(Ordering::Relaxed), 50);
}

// =========================================================================
// Context
// =========================================================================

#[test]
fn test_worker_indices_in_range() {
  let threads = 4;
  let mut scheduler = scheduler(threads);
  let max_index = Arc::new(AtomicUsize::new(0));
  let items: Vec<WorkItem> = (0..200)
    .map(|_| WorkItem::new(WorkerIndexTask { _pad: 0 }))
    .collect();

  scheduler.submit(CAT0, &items).unwrap();
  scheduler
    .start_with_env(CAT0, PhaseBudget::Drain, max_index.clone())
    .unwrap();

  assert!(max_index.load(Ordering::Relaxed) < threads);
}

/// Tasks see `None` when the environment has a different type.
#[test]
fn test_mismatched_environment_is_none() {
  let mut scheduler = scheduler(2);
  scheduler.submit(CAT0, &count_items(10)).unwrap();
  let report = scheduler
    .start_with_env(CAT0, PhaseBudget::Drain, Arc::new(String::from("not a counter")))
    .unwrap();
  assert_eq!(report.executed, 10);
}

#[test]
fn test_submitter_from_other_thread() {
  let mut scheduler = scheduler(2);
  let counter = Arc::new(AtomicUsize::new(0));
  let submitter = scheduler.submitter();

  std::thread::spawn(move || submitter.submit(CAT0, &count_items(64)))
    .join()
    .unwrap()
    .unwrap();

  scheduler
    .start_with_env(CAT0, PhaseBudget::Drain, counter.clone())
    .unwrap();
  assert_eq!(counter.load(Ordering::Relaxed), 64);
}

#[test]
fn test_submitter_fails_after_shutdown() {
  let scheduler = scheduler(1);
  let submitter = scheduler.submitter();
  scheduler.shutdown();

  assert!(matches!(
    submitter.submit(CAT0, &count_items(1)),
    Err(SchedulerError::ShutDown)
  ));
}

#[test]
fn test_spawn_failure_keeps_io_source() {
  use std::error::Error;

  let err = SchedulerError::SpawnWorker {
    index: 3,
    source: std::io::Error::new(std::io::ErrorKind::OutOfMemory, "no threads left"),
  };
  assert_eq!(err.to_string(), "Failed to spawn worker thread 3");
  assert_eq!(
    err.source().map(ToString::to_string),
    Some(String::from("no threads left"))
  );
}

// =========================================================================
// Idle parking
// =========================================================================

/// Workers parked while one item runs long are woken by the items it submits.
#[test]
fn test_parked_workers_wake_for_late_submissions() {
  let mut scheduler = scheduler(4);
  let counter = Arc::new(AtomicUsize::new(0));

  for _ in 0..3 {
    scheduler
      .submit(
        CAT0,
        &[WorkItem::new(LateFanOutTask {
          micros: 20_000,
          children: 200,
        })],
      )
      .unwrap();
    let report = scheduler
      .start_with_env(CAT0, PhaseBudget::Drain, counter.clone())
      .unwrap();
    assert_eq!(report.executed, 201);
    assert!(report.is_drained());
    assert_eq!(scheduler.outstanding(CAT0).unwrap(), 0);
  }

  assert_eq!(counter.load(Ordering::Relaxed), 3 * 201);
  assert_eq!(scheduler.shared.gates[0].sleepers(), 0);
}

/// A parked time slice still ends near its deadline.
#[test]
fn test_parked_workers_respect_time_slice() {
  let mut scheduler = Scheduler::new(
    SchedulerConfig::default()
      .with_thread_count(4)
      .with_slice_granularity(Duration::from_millis(5)),
  )
  .unwrap();
  scheduler
    .submit(CAT0, &[WorkItem::new(SpinTask { micros: 40_000 })])
    .unwrap();

  let report = scheduler
    .start(CAT0, PhaseBudget::Slice(Duration::from_millis(5)))
    .unwrap();
  assert_eq!(report.executed, 1);
  assert!(report.elapsed < Duration::from_millis(500));
}

#[test]
fn test_idle_gate_notify_wakes_parked_thread() {
  let gate = Arc::new(IdleGate::new());
  let ready = Arc::new(AtomicBool::new(false));

  let parked = {
    let gate = Arc::clone(&gate);
    let ready = Arc::clone(&ready);
    std::thread::spawn(move || {
      let started = Instant::now();
      while !ready.load(Ordering::Acquire) {
        gate.park(Duration::from_secs(5), || ready.load(Ordering::Acquire));
      }
      started.elapsed()
    })
  };

  while gate.sleepers() == 0 {
    std::thread::yield_now();
  }
  ready.store(true, Ordering::Release);
  gate.notify();

  let waited = parked.join().unwrap();
  assert!(waited < Duration::from_secs(2), "woke after {waited:?}");
  assert_eq!(gate.sleepers(), 0);
}

#[test]
fn test_idle_gate_skips_wait_when_ready() {
  let gate = IdleGate::new();
  let started = Instant::now();
  gate.park(Duration::from_secs(5), || true);
  assert!(started.elapsed() < Duration::from_secs(1));
  // Nobody parked: notify is a no-op.
  gate.notify();
}
