//! Task descriptors and the static arena they live in

use ufmt::{uDisplay, uWrite, uwrite, Formatter};

/// Highest action id a group flag word can carry
pub const MAX_ACTION: u8 = 31;

/// Stable identity of a descriptor: its index in the [`TaskTable`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaskId(u8);

impl TaskId {
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Consumer group whose flag word receives a descriptor's action bit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GroupId(u8);

impl GroupId {
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Bit position inside a group flag word, 0..=31.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ActionId(u8);

impl ActionId {
    /// Panics above [`MAX_ACTION`]; in a `const` or `static` that is a
    /// compile error.
    pub const fn new(id: u8) -> Self {
        assert!(id <= MAX_ACTION, "action id out of range");
        Self(id)
    }

    pub const fn checked(id: u8) -> Option<Self> {
        if id <= MAX_ACTION {
            Some(Self(id))
        } else {
            None
        }
    }

    #[inline]
    pub const fn bit(self) -> u8 {
        self.0
    }
}

/// What happens after a descriptor fires.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Link {
    /// The chain ends and its slot is freed.
    End,
    /// Continue with a later descriptor.
    Next(TaskId),
    /// Loop back to this or an earlier descriptor, forever.
    Repeat(TaskId),
}

/// One delayed step of a chain. Authored once, never mutated.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TaskDescriptor {
    pub id: TaskId,
    /// Delay in timer ticks, measured from when the step is armed
    pub delay: u16,
    pub group: GroupId,
    pub action: ActionId,
    pub link: Link,
}

impl TaskDescriptor {
    pub const fn new(id: TaskId, delay: u16, group: GroupId, action: ActionId) -> Self {
        Self {
            id,
            delay,
            group,
            action,
            link: Link::End,
        }
    }

    pub const fn then(mut self, next: TaskId) -> Self {
        self.link = Link::Next(next);
        self
    }

    pub const fn repeat(mut self, first: TaskId) -> Self {
        self.link = Link::Repeat(first);
        self
    }

    pub const fn next(&self) -> Option<TaskId> {
        match self.link {
            Link::End => None,
            Link::Next(id) | Link::Repeat(id) => Some(id),
        }
    }
}

/// Reasons a task table is refused at construction time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TableError {
    TooManyTasks,
    IdMismatch { task: u8 },
    GroupOutOfRange { task: TaskId },
    DanglingLink { task: TaskId },
    BackwardNext { task: TaskId },
    ForwardRepeat { task: TaskId },
    DelayTooLong { task: TaskId },
    DuplicateAction { task: TaskId },
}

impl uDisplay for TaskId {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        uwrite!(f, "#{}", self.0)
    }
}

impl uDisplay for TableError {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match *self {
            TableError::TooManyTasks => f.write_str("too many tasks"),
            TableError::IdMismatch { task } => uwrite!(f, "descriptor at {} has wrong id", task),
            TableError::GroupOutOfRange { task } => uwrite!(f, "group out of range in {}", task),
            TableError::DanglingLink { task } => uwrite!(f, "dangling link in {}", task),
            TableError::BackwardNext { task } => uwrite!(f, "next points backwards in {}", task),
            TableError::ForwardRepeat { task } => uwrite!(f, "repeat points forwards in {}", task),
            TableError::DelayTooLong { task } => uwrite!(f, "delay exceeds timer period in {}", task),
            TableError::DuplicateAction { task } => uwrite!(f, "group bit reused by {}", task),
        }
    }
}

/// Validated arena of descriptors indexed by [`TaskId`].
///
/// `Next` links only point forwards and `Repeat` links only point backwards,
/// so following `Next` always terminates and every cycle is spelled out.
#[derive(Copy, Clone, Debug)]
pub struct TaskTable<'a> {
    tasks: &'a [TaskDescriptor],
}

impl<'a> TaskTable<'a> {
    pub fn new(tasks: &'a [TaskDescriptor], group_count: usize) -> Result<Self, TableError> {
        if tasks.len() > usize::from(u8::MAX) {
            return Err(TableError::TooManyTasks);
        }

        for (index, task) in tasks.iter().enumerate() {
            let here = task.id;
            if here.index() != index {
                return Err(TableError::IdMismatch { task: index as u8 });
            }
            if task.group.index() >= group_count {
                return Err(TableError::GroupOutOfRange { task: here });
            }
            // One group bit per descriptor, or consumers cannot tell them apart
            if tasks[..index]
                .iter()
                .any(|other| other.group == task.group && other.action == task.action)
            {
                return Err(TableError::DuplicateAction { task: here });
            }
            match task.link {
                Link::End => {}
                Link::Next(next) => {
                    if next.index() >= tasks.len() {
                        return Err(TableError::DanglingLink { task: here });
                    }
                    if next <= here {
                        return Err(TableError::BackwardNext { task: here });
                    }
                }
                Link::Repeat(first) => {
                    if first > here {
                        return Err(TableError::ForwardRepeat { task: here });
                    }
                }
            }
        }

        Ok(Self { tasks })
    }

    /// Reject any descriptor whose delay does not fit in one timer period.
    pub fn check_delays(&self, period: u32) -> Result<(), TableError> {
        match self.tasks.iter().find(|task| u32::from(task.delay) >= period) {
            Some(task) => Err(TableError::DelayTooLong { task: task.id }),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn get(&self, id: TaskId) -> Option<&'a TaskDescriptor> {
        self.tasks.get(id.index())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether the chain starting at `id` loops forever.
    pub fn repeats(&self, id: TaskId) -> bool {
        let mut current = id;
        // Next links strictly increase the index, so this walk is bounded
        while let Some(task) = self.get(current) {
            match task.link {
                Link::End => return false,
                Link::Repeat(_) => return true,
                Link::Next(next) => current = next,
            }
        }
        false
    }
}
