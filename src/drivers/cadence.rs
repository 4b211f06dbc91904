//! On/off output driven by a two-step chain
//!
//! The LED blinks from a cyclic chain (`on -> off -> on ...`); the buzzer
//! beeps from a finite one (`on -> off`). The driver only mirrors the fired
//! steps onto the pin.

use embedded_hal::digital::v2::OutputPin;

use crate::hal::timer::CompareTimer;
use crate::rtos::{Cancelled, Enqueued, Rejected, Scheduler, TaskId};

pub struct Cadence<P> {
    pin: P,
    on: TaskId,
    off: TaskId,
}

impl<P: OutputPin> Cadence<P> {
    pub fn new(pin: P, on: TaskId, off: TaskId) -> Self {
        Self { pin, on, off }
    }

    pub fn start<T, const S: usize, const G: usize>(
        &mut self,
        sched: &mut Scheduler<'_, T, S, G>,
    ) -> Result<Enqueued, Rejected>
    where
        T: CompareTimer,
    {
        if sched.is_queued(self.off) {
            // Mid-cycle; the chain comes back round to `on` by itself
            return Ok(Enqueued::AlreadyQueued);
        }
        sched.enqueue(self.on)
    }

    /// Stop the chain wherever it is and drive the pin low.
    ///
    /// Returns whether the cadence was running.
    pub fn stop<T, const S: usize, const G: usize>(
        &mut self,
        sched: &mut Scheduler<'_, T, S, G>,
    ) -> Result<bool, P::Error>
    where
        T: CompareTimer,
    {
        let on = sched.cancel(self.on);
        let off = sched.cancel(self.off);
        sched.take_fired(self.on);
        sched.take_fired(self.off);
        self.pin.set_low()?;
        Ok(on == Cancelled::Removed || off == Cancelled::Removed)
    }

    pub fn is_running<T, const S: usize, const G: usize>(&self, sched: &Scheduler<'_, T, S, G>) -> bool
    where
        T: CompareTimer,
    {
        sched.is_queued(self.on) || sched.is_queued(self.off)
    }

    /// Mirror fired steps onto the pin. `off` is applied last, so a cadence
    /// whose both steps fired since the previous poll ends up low.
    pub fn poll<T, const S: usize, const G: usize>(
        &mut self,
        sched: &Scheduler<'_, T, S, G>,
    ) -> Result<(), P::Error>
    where
        T: CompareTimer,
    {
        if sched.take_fired(self.on) {
            self.pin.set_high()?;
        }
        if sched.take_fired(self.off) {
            self.pin.set_low()?;
        }
        Ok(())
    }

    pub fn release(self) -> P {
        self.pin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtos::{ActionId, GroupId, Shared, TaskDescriptor, TaskTable};
    use crate::testing::MockTimer;
    use embedded_hal_mock::pin::{Mock as PinMock, State, Transaction as PinTransaction};

    const BLIND: GroupId = GroupId::new(0);
    const BLINK_ON: TaskId = TaskId::new(0);
    const BLINK_OFF: TaskId = TaskId::new(1);
    const BEEP_ON: TaskId = TaskId::new(2);
    const BEEP_OFF: TaskId = TaskId::new(3);

    static TASKS: [TaskDescriptor; 4] = [
        TaskDescriptor::new(BLINK_ON, 20, BLIND, ActionId::new(0)).then(BLINK_OFF),
        TaskDescriptor::new(BLINK_OFF, 20, BLIND, ActionId::new(1)).repeat(BLINK_ON),
        TaskDescriptor::new(BEEP_ON, 1, BLIND, ActionId::new(2)).then(BEEP_OFF),
        TaskDescriptor::new(BEEP_OFF, 8, BLIND, ActionId::new(3)),
    ];

    type Sched<'a> = Scheduler<'a, MockTimer, 4, 1>;

    fn scheduler(shared: &Shared<4, 1>) -> Sched<'_> {
        let table = TaskTable::new(&TASKS, 1).unwrap();
        Scheduler::new(MockTimer::new(1000), table, shared).unwrap()
    }

    fn elapse(sched: &mut Sched<'_>, shared: &Shared<4, 1>) {
        let at = sched.timer().compare().unwrap();
        sched.timer_mut().set_count(at);
        shared.on_compare_match();
        sched.service();
    }

    #[test]
    fn blink_toggles_until_stopped() {
        let expectations = [
            PinTransaction::set(State::High),
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
            PinTransaction::set(State::Low),
        ];
        let mut pin = PinMock::new(&expectations);
        let shared = Shared::new();
        let mut sched = scheduler(&shared);
        let mut led = Cadence::new(pin.clone(), BLINK_ON, BLINK_OFF);

        assert_eq!(led.start(&mut sched), Ok(Enqueued::Queued));
        for _ in 0..3 {
            elapse(&mut sched, &shared);
            led.poll(&sched).unwrap();
        }
        assert!(led.is_running(&sched));
        assert_eq!(sched.pending(), 1);

        // Starting again mid-cycle is a no-op
        assert_eq!(led.start(&mut sched), Ok(Enqueued::AlreadyQueued));
        assert_eq!(sched.pending(), 1);

        assert_eq!(led.stop(&mut sched), Ok(true));
        assert!(!led.is_running(&sched));
        assert!(!sched.timer().compare_enabled());

        pin.done();
    }

    #[test]
    fn beep_runs_once() {
        let expectations = [
            PinTransaction::set(State::High),
            PinTransaction::set(State::Low),
            PinTransaction::set(State::Low),
        ];
        let mut pin = PinMock::new(&expectations);
        let shared = Shared::new();
        let mut sched = scheduler(&shared);
        let mut buzzer = Cadence::new(pin.clone(), BEEP_ON, BEEP_OFF);

        buzzer.start(&mut sched).unwrap();
        elapse(&mut sched, &shared);
        buzzer.poll(&sched).unwrap();
        assert_eq!(sched.timer().compare(), Some(9));

        elapse(&mut sched, &shared);
        buzzer.poll(&sched).unwrap();
        assert!(!buzzer.is_running(&sched));

        // Nothing was running any more
        assert_eq!(buzzer.stop(&mut sched), Ok(false));

        pin.done();
    }
}
