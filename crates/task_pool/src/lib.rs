//! task_pool - bounded parallel task scheduler
//!
//! A fixed pool of worker threads parked between phases and woken in bulk.
//! Work is submitted as small, copyable [`WorkItem`]s into per-category
//! [`WorkQueue`]s, and a phase drains one category at a time.
//!
//! ```text
//!   submit(cat, items) ──► WorkQueue[cat] ◄── pop ── worker 0..N
//!                               ▲                      │
//!                               └── ctx.submit ◄───────┘ (recursive fan-out)
//!
//!   start(cat) : wake all ──► drain until outstanding == 0 ──► all parked
//! ```
//!
//! # Example
//!
//! ```ignore
//! use task_pool::{PhaseBudget, Scheduler, SchedulerConfig, Task, WorkCategory, WorkContext, WorkItem};
//!
//! #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
//! #[repr(C)]
//! struct Ping { value: u32 }
//!
//! impl Task for Ping {
//!   fn execute(self, _ctx: &WorkContext<'_>) {}
//! }
//!
//! let mut scheduler = Scheduler::new(SchedulerConfig::default())?;
//! let category = WorkCategory::new(0);
//! scheduler.submit(category, &[WorkItem::new(Ping { value: 1 })])?;
//! let report = scheduler.start(category, PhaseBudget::Drain)?;
//! assert_eq!(report.executed, 1);
//! scheduler.shutdown();
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod scheduler;
pub mod work_item;
pub mod work_queue;

pub use config::{PhaseBudget, SchedulerConfig, WorkCategory};
pub use error::SchedulerError;
pub use metrics::SchedulerMetrics;
pub use scheduler::{PhaseReport, Scheduler, Submitter, WorkContext};
pub use work_item::{Task, WorkItem, WORK_ITEM_PAYLOAD_BYTES};
pub use work_queue::WorkQueue;
