//! Fixed slot pool and the modular "soonest deadline" search over it

use super::task::{TaskId, TaskTable};

/// Smallest distance ever programmed into the compare register. A deadline
/// closer than this (or already missed) is pushed out to `now + MIN_LEAD`
/// so the match cannot slip past before the register is written.
pub const MIN_LEAD: u16 = 2;

/// Outcome of a successful enqueue.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Enqueued {
    Queued,
    /// The descriptor already owned a slot; nothing changed.
    AlreadyQueued,
}

/// Why an enqueue was dropped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rejected {
    /// Every slot is occupied.
    Full,
    /// The id does not name a descriptor in the table.
    UnknownTask,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cancelled {
    Removed,
    NotFound,
}

impl ufmt::uDisplay for Rejected {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        match self {
            Rejected::Full => f.write_str("pool full"),
            Rejected::UnknownTask => f.write_str("unknown task"),
        }
    }
}

#[inline]
pub(super) fn wrap_add(at: u16, ticks: u16, period: u32) -> u16 {
    ((u32::from(at) + u32::from(ticks)) % period) as u16
}

#[inline]
pub(super) fn wrap_sub(to: u16, from: u16, period: u32) -> u32 {
    (u32::from(to) + period - u32::from(from)) % period
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Slot {
    task: Option<TaskId>,
    /// Count the delay is measured from
    armed_at: u16,
    fire_time: u16,
}

impl Slot {
    const FREE: Slot = Slot {
        task: None,
        armed_at: 0,
        fire_time: 0,
    };

    pub fn task(&self) -> Option<TaskId> {
        self.task
    }

    pub fn fire_time(&self) -> u16 {
        self.fire_time
    }

    /// Ticks until the deadline, zero if it has already passed.
    ///
    /// A slot counts as passed once the time elapsed since arming reaches
    /// its delay, which stays correct across counter wraps as long as the
    /// slot is looked at least once per period.
    fn remaining(&self, now: u16, period: u32) -> u32 {
        let delay = wrap_sub(self.fire_time, self.armed_at, period);
        let elapsed = wrap_sub(now, self.armed_at, period);
        delay.saturating_sub(elapsed)
    }
}

/// Occupied slots sharing the nearest deadline, and where the compare
/// register was pointed for them.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HeadSet {
    pub mask: u8,
    pub compare: Option<u16>,
}

impl HeadSet {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mask.count_ones() as usize
    }

    #[inline]
    pub fn contains_slot(&self, slot: usize) -> bool {
        slot < 8 && self.mask & (1 << slot) != 0
    }
}

pub struct SlotPool<const N: usize> {
    slots: [Slot; N],
}

impl<const N: usize> SlotPool<N> {
    pub const fn new() -> Self {
        assert!(N > 0 && N <= 8, "slot masks are eight bits wide");
        Self {
            slots: [Slot::FREE; N],
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Index of the slot holding `id`.
    pub fn find(&self, id: TaskId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.task == Some(id))
    }

    #[inline]
    pub fn contains(&self, id: TaskId) -> bool {
        self.find(id).is_some()
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.task.is_some()).count()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.occupied() == N
    }

    /// Arm `id` to fire `delay` ticks after `now`.
    pub fn insert(&mut self, id: TaskId, delay: u16, now: u16, period: u32) -> Result<Enqueued, Rejected> {
        if self.contains(id) {
            return Ok(Enqueued::AlreadyQueued);
        }
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.task.is_none())
            .ok_or(Rejected::Full)?;

        *slot = Slot {
            task: Some(id),
            armed_at: now,
            fire_time: wrap_add(now, delay, period),
        };
        Ok(Enqueued::Queued)
    }

    /// Free every slot holding `id`; returns the freed slots as a mask.
    pub fn cancel(&mut self, id: TaskId) -> u8 {
        let mut freed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.task == Some(id) {
                *slot = Slot::FREE;
                freed |= 1 << index;
            }
        }
        freed
    }

    /// Move a fired slot to the next step of its chain, or free it.
    ///
    /// The next delay is counted from the deadline that just fired, so a
    /// cyclic chain keeps its cadence even when the main loop is slow.
    pub fn advance(&mut self, index: usize, table: &TaskTable<'_>, period: u32) -> Option<TaskId> {
        let slot = self.slots.get_mut(index)?;
        let next = slot
            .task
            .and_then(|id| table.get(id))
            .and_then(|task| task.next())
            .and_then(|id| table.get(id));

        match next {
            Some(task) => {
                let fired_at = slot.fire_time;
                *slot = Slot {
                    task: Some(task.id),
                    armed_at: fired_at,
                    fire_time: wrap_add(fired_at, task.delay, period),
                };
                Some(task.id)
            }
            None => {
                *slot = Slot::FREE;
                None
            }
        }
    }

    /// Find the slots due soonest as seen from `now`, skipping `exclude`.
    pub fn head_set(&self, now: u16, period: u32, exclude: u8) -> HeadSet {
        let mut soonest = u32::MAX;
        let mut mask = 0u8;

        for (index, slot) in self.slots.iter().enumerate() {
            let bit = 1u8 << index;
            if slot.task.is_none() || exclude & bit != 0 {
                continue;
            }
            let lead = slot.remaining(now, period).max(u32::from(MIN_LEAD));
            if lead < soonest {
                soonest = lead;
                mask = bit;
            } else if lead == soonest {
                mask |= bit;
            }
        }

        if mask == 0 {
            return HeadSet::default();
        }
        HeadSet {
            mask,
            compare: Some(((u32::from(now) + soonest) % period) as u16),
        }
    }
}

impl<const N: usize> Default for SlotPool<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtos::task::{ActionId, GroupId, TaskDescriptor};

    const G: GroupId = GroupId::new(0);
    const A: TaskId = TaskId::new(0);
    const B: TaskId = TaskId::new(1);
    const C: TaskId = TaskId::new(2);
    const D: TaskId = TaskId::new(3);

    static TASKS: [TaskDescriptor; 4] = [
        TaskDescriptor::new(A, 100, G, ActionId::new(0)).then(B),
        TaskDescriptor::new(B, 40, G, ActionId::new(1)),
        TaskDescriptor::new(C, 100, G, ActionId::new(2)).repeat(C),
        TaskDescriptor::new(D, 980, G, ActionId::new(3)),
    ];

    #[test]
    fn insert_is_idempotent_and_bounded() {
        let mut pool: SlotPool<2> = SlotPool::new();
        assert_eq!(pool.insert(A, 10, 0, 1000), Ok(Enqueued::Queued));
        assert_eq!(pool.insert(A, 10, 5, 1000), Ok(Enqueued::AlreadyQueued));
        assert_eq!(pool.occupied(), 1);
        // The duplicate did not re-arm the slot
        assert_eq!(pool.slot(0).unwrap().fire_time(), 10);

        assert_eq!(pool.insert(B, 10, 0, 1000), Ok(Enqueued::Queued));
        assert!(pool.is_full());
        assert_eq!(pool.insert(C, 10, 0, 1000), Err(Rejected::Full));
        assert!(pool.contains(A) && pool.contains(B) && !pool.contains(C));
    }

    #[test]
    fn cancel_frees_only_the_match() {
        let mut pool: SlotPool<3> = SlotPool::new();
        pool.insert(A, 10, 0, 1000).unwrap();
        pool.insert(B, 20, 0, 1000).unwrap();
        let before = *pool.slot(1).unwrap();

        assert_eq!(pool.cancel(A), 0b01);
        assert_eq!(pool.cancel(A), 0);
        assert_eq!(*pool.slot(1).unwrap(), before);
        assert_eq!(pool.occupied(), 1);
    }

    #[test]
    fn advance_follows_links() {
        let table = TaskTable::new(&TASKS, 1).unwrap();
        let mut pool: SlotPool<2> = SlotPool::new();
        pool.insert(A, 100, 900, 1000).unwrap();
        pool.insert(C, 100, 0, 1000).unwrap();

        assert_eq!(pool.advance(0, &table, 1000), Some(B));
        // Counted from A's deadline (0 after the wrap)
        assert_eq!(pool.slot(0).unwrap().fire_time(), 40);
        assert_eq!(pool.advance(0, &table, 1000), None);
        assert_eq!(pool.slot(0).unwrap().task(), None);

        assert_eq!(pool.advance(1, &table, 1000), Some(C));
        assert_eq!(pool.slot(1).unwrap().fire_time(), 200);
        assert_eq!(pool.occupied(), 1);
    }

    #[test]
    fn head_set_collects_ties() {
        let mut pool: SlotPool<4> = SlotPool::new();
        pool.insert(A, 50, 0, 1000).unwrap();
        pool.insert(B, 30, 20, 1000).unwrap();
        pool.insert(C, 80, 0, 1000).unwrap();

        let head = pool.head_set(20, 1000, 0);
        assert_eq!(head.mask, 0b011);
        assert_eq!(head.compare, Some(50));

        // Excluded slots are not candidates
        let head = pool.head_set(20, 1000, 0b011);
        assert_eq!(head.mask, 0b100);
        assert_eq!(head.compare, Some(80));

        assert!(SlotPool::<4>::new().head_set(0, 1000, 0).is_empty());
    }

    #[test]
    fn head_set_across_the_wrap() {
        let mut pool: SlotPool<4> = SlotPool::new();
        // Armed at 920 for 980 ticks: due at 900 on the next lap
        pool.insert(D, 980, 920, 1000).unwrap();
        // Armed at 950 for 100 ticks: wraps to 50
        pool.insert(A, 100, 950, 1000).unwrap();
        assert_eq!(pool.slot(1).unwrap().fire_time(), 50);

        let head = pool.head_set(950, 1000, 0);
        assert_eq!(head.mask, 0b10);
        assert_eq!(head.compare, Some(50));

        // Not-yet-wrapped 980 beats the wrapped 50
        pool.insert(B, 30, 950, 1000).unwrap();
        let head = pool.head_set(950, 1000, 0);
        assert_eq!(head.mask, 0b100);
        assert_eq!(head.compare, Some(980));
    }

    #[test]
    fn missed_deadline_fires_promptly() {
        let mut pool: SlotPool<2> = SlotPool::new();
        pool.insert(A, 10, 0, 1000).unwrap();
        pool.insert(B, 500, 0, 1000).unwrap();

        // Deadline at 10 passed while nobody looked
        let head = pool.head_set(15, 1000, 0);
        assert_eq!(head.mask, 0b01);
        assert_eq!(head.compare, Some(15 + MIN_LEAD));
    }

    #[test]
    #[should_panic(expected = "slot masks are eight bits wide")]
    fn more_than_eight_slots_is_refused() {
        let _ = SlotPool::<9>::new();
    }

}
