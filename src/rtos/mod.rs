//! Interrupt-driven task chain scheduler

pub mod flags;
pub mod pool;
pub mod scheduler;
pub mod task;

pub use flags::{GroupFlags, Shared, SlotMask};
pub use pool::{Cancelled, Enqueued, HeadSet, Rejected, SlotPool, MIN_LEAD};
pub use scheduler::Scheduler;
pub use task::{ActionId, GroupId, Link, TableError, TaskDescriptor, TaskId, TaskTable, MAX_ACTION};
