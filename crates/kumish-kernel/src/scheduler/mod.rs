//! Scheduler module for kumish — jobs, the job table and waiting on them.
//!
//! Nothing here blocks on a specific child. All status changes come in
//! through the reconciler, which is driven from one place (`handle_signals`)
//! whenever the SIGCHLD flag is seen.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  flag   ┌──────────────────────────────────────────┐
//! │ SIGCHLD/HUP  │────────▶│ JobControl                               │
//! │ handlers     │         │  handle_signals()                        │
//! └──────────────┘         │    └─▶ Reconciler::do_wait ──┐           │
//!                          │                              ▼           │
//!                          │  JobTable                                │
//!                          │    active: Option<Job>   (foreground)    │
//!                          │    slots:  [%1, %2, ...]  (numbered)     │
//!                          │  wait_for_job(slot) ─ sigsuspend loop    │
//!                          │  continue_job(id)   ─ SIGCONT + terminal │
//!                          └──────────────────────────────────────────┘
//! ```

mod control;
mod job;
mod reconcile;
mod table;

pub use control::{death_message, format_job, send_signal, HangupHook, JobControl};
pub use job::{Job, JobId, JobStatus, Process, RawStatus};
pub use reconcile::{Reconciler, SystemWaiter, Waiter};
pub use table::{JobSlot, JobTable};

#[cfg(test)]
pub(crate) use reconcile::testing;
