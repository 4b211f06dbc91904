#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]

#[cfg(target_arch = "avr")]
mod firmware {
    use panic_halt as _;

    use blind_controller::config::{GROUP_COUNT, LOG_LEVEL, SLOT_COUNT};
    use blind_controller::drivers::{AmbientLight, ButtonEvent, ButtonHandler, Cadence, LightLevel, SerialConsole};
    use blind_controller::hal::{board, Adc, AdcPin, CompareTimer, Prescaler, Timer1};
    use blind_controller::logger::Logger;
    use blind_controller::rtos::{Scheduler, Shared};
    use blind_controller::{log_error, log_info, log_warn, tasks};
    use embedded_hal::digital::v2::{InputPin, OutputPin};

    // Everything the compare-match interrupt touches
    static SHARED: Shared<SLOT_COUNT, GROUP_COUNT> = Shared::new();

    #[avr_device::interrupt(atmega128)]
    fn TIMER1_COMPA() {
        SHARED.on_compare_match();
    }

    type Sched = Scheduler<'static, Timer1, SLOT_COUNT, GROUP_COUNT>;
    type Console = Logger<SerialConsole>;

    fn halt() -> ! {
        loop {
            avr_device::asm::nop();
        }
    }

    fn button_event(log: &mut Console, name: &str, event: ButtonEvent) {
        let what = match event {
            ButtonEvent::Pressed => "pressed",
            ButtonEvent::Click => "click",
            ButtonEvent::Hold => "hold",
            ButtonEvent::HoldReleased => "hold released",
        };
        log_info!(log, "{} {}", name, what);
    }

    /// Click beeps, holding blinks the LED until release.
    fn react<P: OutputPin, Q: OutputPin>(
        sched: &mut Sched,
        log: &mut Console,
        led: &mut Cadence<P>,
        buzzer: &mut Cadence<Q>,
        event: ButtonEvent,
    ) {
        let started = match event {
            ButtonEvent::Click => buzzer.start(sched),
            ButtonEvent::Hold => led.start(sched),
            ButtonEvent::HoldReleased => {
                led.stop(sched).ok();
                return;
            }
            ButtonEvent::Pressed => return,
        };
        if let Err(rejected) = started {
            log_warn!(log, "feedback dropped: {}", rejected);
        }
    }

    fn poll_button<P: InputPin, L: OutputPin, B: OutputPin>(
        sched: &mut Sched,
        log: &mut Console,
        name: &str,
        button: &mut ButtonHandler<P>,
        led: &mut Cadence<L>,
        buzzer: &mut Cadence<B>,
    ) {
        if let Ok(Some(event)) = button.poll(sched) {
            button_event(log, name, event);
            react(sched, log, led, buzzer, event);
        }
    }

    #[avr_device::entry]
    fn main() -> ! {
        let mut log = Logger::new(SerialConsole::new(), LOG_LEVEL);
        log_info!(log, "blind controller v0.1.0");

        let table = match tasks::table() {
            Ok(table) => table,
            Err(err) => {
                log_error!(log, "task table: {}", err);
                halt();
            }
        };
        let timer = Timer1::new(Prescaler::Div1024);
        let period = timer.period();
        let mut sched: Sched = match Scheduler::new(timer, table, &SHARED) {
            Ok(sched) => sched,
            Err(err) => {
                log_error!(log, "task table: {}", err);
                halt();
            }
        };

        let mut up = ButtonHandler::new(
            board::BtnUp::new().into_pull_up_input(),
            tasks::UP_DEBOUNCE,
            tasks::UP_HOLD,
        );
        let mut down = ButtonHandler::new(
            board::BtnDown::new().into_pull_up_input(),
            tasks::DOWN_DEBOUNCE,
            tasks::DOWN_HOLD,
        );
        let mut led = Cadence::new(board::Led::new().into_output(), tasks::LED_ON, tasks::LED_OFF);
        let mut buzzer = Cadence::new(board::Buzzer::new().into_output(), tasks::BEEP_ON, tasks::BEEP_OFF);
        let mut light = AmbientLight::new(
            Adc::new(),
            AdcPin::<{ board::LIGHT_ADC_CHANNEL }>,
            board::LightEnable::new().into_output(),
            tasks::LIGHT_POWER,
            tasks::LIGHT_SAMPLE,
        );

        // Enable interrupts globally
        unsafe { avr_device::interrupt::enable() };

        // The light sensor chain runs for the life of the firmware
        if let Err(rejected) = light.start(&mut sched) {
            log_error!(log, "light polling not started: {}", rejected);
        }
        log_info!(log, "ready, {} slots, timer period {}", sched.capacity(), period);

        let mut dropped = 0u16;
        loop {
            sched.service();

            poll_button(&mut sched, &mut log, "up", &mut up, &mut led, &mut buzzer);
            poll_button(&mut sched, &mut log, "down", &mut down, &mut led, &mut buzzer);
            led.poll(&sched).ok();
            buzzer.poll(&sched).ok();

            match light.poll(&sched) {
                Ok(Some(reading)) if reading.changed => {
                    let level = match reading.level {
                        LightLevel::Dark => "dark",
                        LightLevel::Bright => "bright",
                    };
                    log_info!(log, "light {} ({})", level, reading.raw);
                }
                Ok(_) => {}
                Err(_) => log_warn!(log, "light sensor read failed"),
            }

            if sched.dropped() != dropped {
                dropped = sched.dropped();
                log_warn!(log, "scheduler full, {} requests dropped", dropped);
            }
        }
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {}
