//! State shared between the compare-match interrupt and the main loop
//!
//! The interrupt handler is the only writer of raised group bits and finished
//! slot bits; consumers clear their own group bits and the main loop drains
//! the finished mask. Head set and slot tags are written by the main loop only
//! while the compare interrupt is masked. Everything is byte-wide so the
//! atomics map onto what the AVR core provides.

use core::sync::atomic::{AtomicU8, Ordering};

use super::task::{ActionId, GroupId};

/// 32 action bits for one consumer group.
pub struct GroupFlags {
    words: [AtomicU8; 4],
}

impl GroupFlags {
    pub const fn new() -> Self {
        Self {
            words: [
                AtomicU8::new(0),
                AtomicU8::new(0),
                AtomicU8::new(0),
                AtomicU8::new(0),
            ],
        }
    }

    #[inline]
    fn locate(action: ActionId) -> (usize, u8) {
        let bit = action.bit();
        debug_assert!(bit <= super::task::MAX_ACTION);
        (usize::from(bit / 8), 1 << (bit % 8))
    }

    /// Set by the interrupt handler when a descriptor fires.
    #[inline]
    pub fn raise(&self, action: ActionId) {
        let (word, mask) = Self::locate(action);
        self.words[word].fetch_or(mask, Ordering::Release);
    }

    /// Clear the bit and report whether it was set.
    #[inline]
    pub fn take(&self, action: ActionId) -> bool {
        let (word, mask) = Self::locate(action);
        self.words[word].fetch_and(!mask, Ordering::Acquire) & mask != 0
    }

    #[inline]
    pub fn is_raised(&self, action: ActionId) -> bool {
        let (word, mask) = Self::locate(action);
        self.words[word].load(Ordering::Acquire) & mask != 0
    }

    /// All raised bits, without clearing them.
    pub fn peek(&self) -> u32 {
        self.words
            .iter()
            .rev()
            .fold(0, |acc, word| (acc << 8) | u32::from(word.load(Ordering::Acquire)))
    }

    /// Clear and return every raised bit. Each byte is swapped atomically, so
    /// a bit raised concurrently is either returned here or left for next time.
    pub fn take_all(&self) -> u32 {
        self.words
            .iter()
            .rev()
            .fold(0, |acc, word| (acc << 8) | u32::from(word.swap(0, Ordering::Acquire)))
    }
}

impl Default for GroupFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// Bitmask over scheduler slots, at most eight.
pub struct SlotMask {
    bits: AtomicU8,
}

impl SlotMask {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
        }
    }

    #[inline]
    pub fn mark(&self, mask: u8) {
        self.bits.fetch_or(mask, Ordering::Release);
    }

    #[inline]
    pub fn unmark(&self, mask: u8) {
        self.bits.fetch_and(!mask, Ordering::Release);
    }

    #[inline]
    pub fn load(&self) -> u8 {
        self.bits.load(Ordering::Acquire)
    }

    #[inline]
    pub fn store(&self, mask: u8) {
        self.bits.store(mask, Ordering::Release);
    }

    /// Take every marked slot, leaving the mask empty.
    #[inline]
    pub fn drain(&self) -> u8 {
        self.bits.swap(0, Ordering::AcqRel)
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.load().count_ones()
    }
}

impl Default for SlotMask {
    fn default() -> Self {
        Self::new()
    }
}

const GROUP_SHIFT: u8 = 5;
const ACTION_MASK: u8 = (1 << GROUP_SHIFT) - 1;

/// Everything the compare-match interrupt reads or writes.
///
/// Lives in a `static` so the interrupt handler can reach it; the
/// [`Scheduler`](super::Scheduler) holds a shared reference to the same value.
pub struct Shared<const SLOTS: usize, const GROUPS: usize> {
    head: SlotMask,
    finished: SlotMask,
    tags: [AtomicU8; SLOTS],
    groups: [GroupFlags; GROUPS],
}

impl<const SLOTS: usize, const GROUPS: usize> Shared<SLOTS, GROUPS> {
    pub const fn new() -> Self {
        assert!(SLOTS > 0 && SLOTS <= 8, "slot masks are eight bits wide");
        assert!(GROUPS > 0 && GROUPS <= 8, "slot tags hold three group bits");
        Self {
            head: SlotMask::new(),
            finished: SlotMask::new(),
            tags: [const { AtomicU8::new(0) }; SLOTS],
            groups: [const { GroupFlags::new() }; GROUPS],
        }
    }

    /// Body of the compare-match interrupt.
    ///
    /// Raises the group bit of every head slot and reports the slots as
    /// finished. The head mask is consumed, so a second match before the main
    /// loop recomputes fires nothing. Returns the slots that fired.
    pub fn on_compare_match(&self) -> u8 {
        let fired = self.head.drain();
        let mut pending = fired;
        while pending != 0 {
            let slot = pending.trailing_zeros() as usize;
            pending &= pending - 1;

            let tag = self.tags[slot].load(Ordering::Acquire);
            let group = usize::from(tag >> GROUP_SHIFT);
            if let Some(flags) = self.groups.get(group) {
                flags.raise(ActionId::new(tag & ACTION_MASK));
            }
        }
        self.finished.mark(fired);
        fired
    }

    /// Flag word of one consumer group.
    #[inline]
    pub fn group(&self, group: GroupId) -> Option<&GroupFlags> {
        self.groups.get(group.index())
    }

    /// Whether fired slots are waiting for main-loop advancement.
    #[inline]
    pub fn has_finished(&self) -> bool {
        self.finished.load() != 0
    }

    #[inline]
    pub(crate) fn head(&self) -> &SlotMask {
        &self.head
    }

    #[inline]
    pub(crate) fn finished(&self) -> &SlotMask {
        &self.finished
    }

    #[inline]
    pub(crate) fn set_tag(&self, slot: usize, group: GroupId, action: ActionId) {
        let tag = (group.index() as u8) << GROUP_SHIFT | (action.bit() & ACTION_MASK);
        self.tags[slot].store(tag, Ordering::Release);
    }
}

impl<const SLOTS: usize, const GROUPS: usize> Default for Shared<SLOTS, GROUPS> {
    fn default() -> Self {
        Self::new()
    }
}
