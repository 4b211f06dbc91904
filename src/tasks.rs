//! Every delayed step the firmware schedules, in one arena
//!
//! Each logical operation owns its descriptors; two buttons never share a
//! debounce step, so cancelling one cannot stop the other.

use crate::config::{
    ms_to_ticks, BEEP_MS, BLINK_MS, BUTTON_DEBOUNCE_MS, BUTTON_HOLD_MS, GROUP_COUNT,
    LIGHT_POLL_MS, LIGHT_WARMUP_MS,
};
use crate::rtos::{ActionId, GroupId, TableError, TaskDescriptor, TaskId, TaskTable};

pub const BUTTON: GroupId = GroupId::new(0);
pub const BLIND: GroupId = GroupId::new(1);
pub const LIGHT: GroupId = GroupId::new(2);

pub const UP_DEBOUNCE: TaskId = TaskId::new(0);
pub const UP_HOLD: TaskId = TaskId::new(1);
pub const DOWN_DEBOUNCE: TaskId = TaskId::new(2);
pub const DOWN_HOLD: TaskId = TaskId::new(3);
pub const LED_ON: TaskId = TaskId::new(4);
pub const LED_OFF: TaskId = TaskId::new(5);
pub const BEEP_ON: TaskId = TaskId::new(6);
pub const BEEP_OFF: TaskId = TaskId::new(7);
pub const LIGHT_POWER: TaskId = TaskId::new(8);
pub const LIGHT_SAMPLE: TaskId = TaskId::new(9);

pub static TASKS: [TaskDescriptor; 10] = [
    // Buttons: one-shot debounce window, one-shot hold timer
    TaskDescriptor::new(UP_DEBOUNCE, ms_to_ticks(BUTTON_DEBOUNCE_MS), BUTTON, ActionId::new(0)),
    TaskDescriptor::new(UP_HOLD, ms_to_ticks(BUTTON_HOLD_MS), BUTTON, ActionId::new(1)),
    TaskDescriptor::new(DOWN_DEBOUNCE, ms_to_ticks(BUTTON_DEBOUNCE_MS), BUTTON, ActionId::new(2)),
    TaskDescriptor::new(DOWN_HOLD, ms_to_ticks(BUTTON_HOLD_MS), BUTTON, ActionId::new(3)),
    // Status LED blinks until cancelled
    TaskDescriptor::new(LED_ON, ms_to_ticks(BLINK_MS), BLIND, ActionId::new(0)).then(LED_OFF),
    TaskDescriptor::new(LED_OFF, ms_to_ticks(BLINK_MS), BLIND, ActionId::new(1)).repeat(LED_ON),
    // Single beep
    TaskDescriptor::new(BEEP_ON, 1, BLIND, ActionId::new(2)).then(BEEP_OFF),
    TaskDescriptor::new(BEEP_OFF, ms_to_ticks(BEEP_MS), BLIND, ActionId::new(3)),
    // Ambient light: power the sensor, let it settle, sample, repeat
    TaskDescriptor::new(LIGHT_POWER, ms_to_ticks(LIGHT_POLL_MS), LIGHT, ActionId::new(0))
        .then(LIGHT_SAMPLE),
    TaskDescriptor::new(LIGHT_SAMPLE, ms_to_ticks(LIGHT_WARMUP_MS), LIGHT, ActionId::new(1))
        .repeat(LIGHT_POWER),
];

pub fn table() -> Result<TaskTable<'static>, TableError> {
    TaskTable::new(&TASKS, GROUP_COUNT)
}
