//! Chain scheduler multiplexing many delayed tasks onto one compare timer
//!
//! Work is split in two phases. The compare-match interrupt only raises group
//! bits and marks slots finished (see [`Shared::on_compare_match`]). The main
//! loop calls [`Scheduler::service`] to advance finished chains and point the
//! compare register at the next deadline.
//!
//! Every structural change runs with the timer's compare interrupt masked:
//! read the counter once, mutate the pool, rebuild the head set and the slot
//! tags the interrupt reads, reprogram the compare register, then unmask if
//! anything is still pending. An empty pool leaves the interrupt disabled.

use super::flags::{GroupFlags, Shared};
use super::pool::{wrap_sub, Cancelled, Enqueued, HeadSet, Rejected, SlotPool};
use super::task::{GroupId, TableError, TaskId, TaskTable};
use crate::hal::timer::CompareTimer;

pub struct Scheduler<'a, T, const SLOTS: usize, const GROUPS: usize>
where
    T: CompareTimer,
{
    timer: T,
    table: TaskTable<'a>,
    shared: &'a Shared<SLOTS, GROUPS>,
    pool: SlotPool<SLOTS>,
    head: HeadSet,
    dropped: u16,
}

impl<'a, T, const SLOTS: usize, const GROUPS: usize> Scheduler<'a, T, SLOTS, GROUPS>
where
    T: CompareTimer,
{
    /// Start with an empty pool and the compare interrupt disabled.
    pub fn new(
        mut timer: T,
        table: TaskTable<'a>,
        shared: &'a Shared<SLOTS, GROUPS>,
    ) -> Result<Self, TableError> {
        table.check_delays(timer.period())?;

        timer.disable_compare();
        shared.head().store(0);
        shared.finished().drain();

        Ok(Self {
            timer,
            table,
            shared,
            pool: SlotPool::new(),
            head: HeadSet::default(),
            dropped: 0,
        })
    }

    /// Arm the chain starting at `id`.
    ///
    /// Enqueuing a descriptor that already owns a slot is a no-op.
    pub fn enqueue(&mut self, id: TaskId) -> Result<Enqueued, Rejected> {
        let task = self.table.get(id).ok_or(Rejected::UnknownTask)?;
        if self.pool.contains(id) {
            return Ok(Enqueued::AlreadyQueued);
        }
        if self.pool.is_full() {
            self.dropped = self.dropped.wrapping_add(1);
            return Err(Rejected::Full);
        }

        let period = self.timer.period();
        self.masked(|pool, _, now| pool.insert(id, task.delay, now, period))
    }

    /// Drop `id` from the pool, whether it is waiting or already fired.
    pub fn cancel(&mut self, id: TaskId) -> Cancelled {
        if !self.pool.contains(id) {
            return Cancelled::NotFound;
        }

        self.masked(|pool, shared, _| {
            let freed = pool.cancel(id);
            shared.finished().unmark(freed);
        });
        Cancelled::Removed
    }

    /// Whether `id` currently owns a slot.
    #[inline]
    pub fn is_queued(&self, id: TaskId) -> bool {
        self.pool.contains(id)
    }

    /// Main-loop half of the scheduler: advance every chain the interrupt
    /// marked finished, then retarget the compare register.
    ///
    /// Returns how many slots were advanced.
    pub fn service(&mut self) -> usize {
        if !self.shared.has_finished() {
            return 0;
        }

        let table = self.table;
        let period = self.timer.period();
        self.masked(|pool, shared, _| {
            let mut done = shared.finished().drain();
            let mut advanced = 0;
            while done != 0 {
                let slot = done.trailing_zeros() as usize;
                done &= done - 1;
                pool.advance(slot, &table, period);
                advanced += 1;
            }
            advanced
        })
    }

    /// Consume the group bit `id` raises when it fires.
    ///
    /// Returns whether the bit was set. Consumers poll their own descriptors
    /// with this from the main loop.
    pub fn take_fired(&self, id: TaskId) -> bool {
        self.table
            .get(id)
            .and_then(|task| {
                self.shared
                    .group(task.group)
                    .map(|flags| flags.take(task.action))
            })
            .unwrap_or(false)
    }

    /// Enqueues rejected because the pool was full, wrapping.
    #[inline]
    pub fn dropped(&self) -> u16 {
        self.dropped
    }

    /// Head set as of the last recomputation.
    #[inline]
    pub fn head(&self) -> HeadSet {
        self.head
    }

    /// Whether `id` is among the tasks the next compare match will fire.
    pub fn in_head(&self, id: TaskId) -> bool {
        self.pool
            .find(id)
            .map_or(false, |slot| self.head.contains_slot(slot))
    }

    /// Tasks the next compare match will fire.
    pub fn head_tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        (0..SLOTS)
            .filter(move |&slot| self.head.contains_slot(slot))
            .filter_map(move |slot| self.pool.slot(slot).and_then(|s| s.task()))
    }

    /// Occupied slots, including fired ones awaiting [`service`](Self::service).
    #[inline]
    pub fn pending(&self) -> usize {
        self.pool.occupied()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        SLOTS
    }

    /// Flag word of one consumer group.
    #[inline]
    pub fn group(&self, group: GroupId) -> Option<&'a GroupFlags> {
        self.shared.group(group)
    }

    #[inline]
    pub fn table(&self) -> TaskTable<'a> {
        self.table
    }

    #[inline]
    pub fn timer(&self) -> &T {
        &self.timer
    }

    #[inline]
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// Run `f` on the pool with the compare interrupt masked, then rebuild
    /// the head set from one counter reading and rearm.
    fn masked<R>(&mut self, f: impl FnOnce(&mut SlotPool<SLOTS>, &Shared<SLOTS, GROUPS>, u16) -> R) -> R {
        self.timer.disable_compare();
        let now = self.timer.now();
        let result = f(&mut self.pool, self.shared, now);
        self.rearm(now);
        result
    }

    /// Must only run with the compare interrupt masked.
    fn rearm(&mut self, now: u16) {
        let head = self
            .pool
            .head_set(now, self.timer.period(), self.shared.finished().load());

        let mut pending = head.mask;
        while pending != 0 {
            let slot = pending.trailing_zeros() as usize;
            pending &= pending - 1;
            let task = self
                .pool
                .slot(slot)
                .and_then(|s| s.task())
                .and_then(|id| self.table.get(id));
            if let Some(task) = task {
                self.shared.set_tag(slot, task.group, task.action);
            }
        }
        self.shared.head().store(head.mask);
        self.head = head;

        if let Some(at) = head.compare {
            self.timer.set_compare(at);

            // The counter kept running since `now` was read. If it already
            // reached the target, the match would only come a full period
            // late, so fire the head set here instead.
            let period = self.timer.period();
            if wrap_sub(self.timer.now(), now, period) >= wrap_sub(at, now, period) {
                self.shared.on_compare_match();
                self.head = HeadSet::default();
                return;
            }
            self.timer.enable_compare();
        }
    }
}
