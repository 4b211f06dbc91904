//! Debounced push button with click/hold discrimination
//!
//! Timing comes entirely from the scheduler: an edge starts the debounce
//! task, a debounced press starts the hold task. Releasing while the hold task
//! is still pending is a click; the hold task firing first is a hold.

use embedded_hal::digital::v2::InputPin;

use crate::hal::timer::CompareTimer;
use crate::rtos::{Cancelled, Scheduler, TaskId};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed,
    Click,
    Hold,
    HoldReleased,
}

pub struct ButtonHandler<P> {
    pin: P,
    debounce: TaskId,
    hold: TaskId,
    pressed: bool,
    held: bool,
}

impl<P: InputPin> ButtonHandler<P> {
    /// `pin` is active low. `debounce` and `hold` must be one-shot
    /// descriptors owned by this button alone.
    pub fn new(pin: P, debounce: TaskId, hold: TaskId) -> Self {
        Self {
            pin,
            debounce,
            hold,
            pressed: false,
            held: false,
        }
    }

    /// Debounced state.
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn release(self) -> P {
        self.pin
    }

    /// Call once per main-loop pass, after [`Scheduler::service`].
    pub fn poll<T, const S: usize, const G: usize>(
        &mut self,
        sched: &mut Scheduler<'_, T, S, G>,
    ) -> Result<Option<ButtonEvent>, P::Error>
    where
        T: CompareTimer,
    {
        if sched.take_fired(self.hold) && self.pressed {
            self.held = true;
            return Ok(Some(ButtonEvent::Hold));
        }

        let raw = self.pin.is_low()?;

        if sched.take_fired(self.debounce) {
            if raw == self.pressed {
                // Bounced back before the window closed
                return Ok(None);
            }
            self.pressed = raw;
            let event = if raw {
                // A full pool only costs us the hold detection
                sched.enqueue(self.hold).ok();
                ButtonEvent::Pressed
            } else {
                self.on_release(sched)
            };
            return Ok(Some(event));
        }

        if raw != self.pressed && !sched.is_queued(self.debounce) {
            sched.enqueue(self.debounce).ok();
        }
        Ok(None)
    }

    fn on_release<T, const S: usize, const G: usize>(
        &mut self,
        sched: &mut Scheduler<'_, T, S, G>,
    ) -> ButtonEvent
    where
        T: CompareTimer,
    {
        if core::mem::take(&mut self.held) {
            return ButtonEvent::HoldReleased;
        }
        if sched.cancel(self.hold) == Cancelled::Removed {
            // The hold step may have fired after we looked; its bit is stale
            sched.take_fired(self.hold);
        }
        ButtonEvent::Click
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtos::{ActionId, GroupId, Shared, TaskDescriptor, TaskTable};
    use crate::testing::MockTimer;
    use embedded_hal_mock::pin::{Mock as PinMock, State, Transaction as PinTransaction};

    const BUTTON: GroupId = GroupId::new(0);
    const DEBOUNCE: TaskId = TaskId::new(0);
    const HOLD: TaskId = TaskId::new(1);

    static TASKS: [TaskDescriptor; 2] = [
        TaskDescriptor::new(DEBOUNCE, 5, BUTTON, ActionId::new(0)),
        TaskDescriptor::new(HOLD, 50, BUTTON, ActionId::new(1)),
    ];

    type Sched<'a> = Scheduler<'a, MockTimer, 4, 1>;

    fn scheduler(shared: &Shared<4, 1>) -> Sched<'_> {
        let table = TaskTable::new(&TASKS, 1).unwrap();
        Scheduler::new(MockTimer::new(1000), table, shared).unwrap()
    }

    /// Let the next deadline pass and run the main-loop half.
    fn elapse(sched: &mut Sched<'_>, shared: &Shared<4, 1>) {
        let at = sched.timer().compare().unwrap();
        sched.timer_mut().set_count(at);
        shared.on_compare_match();
        sched.service();
    }

    fn level(pressed: bool) -> PinTransaction {
        PinTransaction::get(if pressed { State::Low } else { State::High })
    }

    #[test]
    fn short_press_is_a_click() {
        let expectations = [
            level(true),  // edge, debounce starts
            level(true),  // window closed: pressed, hold starts
            level(false), // edge
            level(false), // window closed: released
        ];
        let mut pin = PinMock::new(&expectations);
        let shared = Shared::new();
        let mut sched = scheduler(&shared);
        let mut button = ButtonHandler::new(pin.clone(), DEBOUNCE, HOLD);

        assert_eq!(button.poll(&mut sched), Ok(None));
        assert!(sched.is_queued(DEBOUNCE));

        elapse(&mut sched, &shared);
        assert_eq!(button.poll(&mut sched), Ok(Some(ButtonEvent::Pressed)));
        assert!(sched.is_queued(HOLD));

        assert_eq!(button.poll(&mut sched), Ok(None));
        elapse(&mut sched, &shared);
        assert_eq!(button.poll(&mut sched), Ok(Some(ButtonEvent::Click)));
        assert!(!sched.is_queued(HOLD));
        assert_eq!(sched.pending(), 0);

        pin.done();
    }

    #[test]
    fn long_press_is_a_hold() {
        let expectations = [
            level(true),
            level(true),
            // Hold fires without a pin read
            level(false),
            level(false),
        ];
        let mut pin = PinMock::new(&expectations);
        let shared = Shared::new();
        let mut sched = scheduler(&shared);
        let mut button = ButtonHandler::new(pin.clone(), DEBOUNCE, HOLD);

        button.poll(&mut sched).unwrap();
        elapse(&mut sched, &shared);
        assert_eq!(button.poll(&mut sched), Ok(Some(ButtonEvent::Pressed)));

        elapse(&mut sched, &shared);
        assert_eq!(button.poll(&mut sched), Ok(Some(ButtonEvent::Hold)));

        assert_eq!(button.poll(&mut sched), Ok(None));
        elapse(&mut sched, &shared);
        assert_eq!(button.poll(&mut sched), Ok(Some(ButtonEvent::HoldReleased)));
        assert!(!button.is_pressed());

        pin.done();
    }

    #[test]
    fn bounce_does_not_restart_the_window() {
        let expectations = [
            level(true),
            level(false), // bounce while the window runs
            level(true),
            level(false), // window closes on the released level
        ];
        let mut pin = PinMock::new(&expectations);
        let shared = Shared::new();
        let mut sched = scheduler(&shared);
        let mut button = ButtonHandler::new(pin.clone(), DEBOUNCE, HOLD);

        button.poll(&mut sched).unwrap();
        let deadline = sched.timer().compare();
        sched.timer_mut().tick(2);
        button.poll(&mut sched).unwrap();
        button.poll(&mut sched).unwrap();
        assert_eq!(sched.timer().compare(), deadline);

        elapse(&mut sched, &shared);
        assert_eq!(button.poll(&mut sched), Ok(None));
        assert!(!button.is_pressed());
        assert_eq!(sched.pending(), 0);

        pin.done();
    }
}
