use std::{cell::RefCell, convert::Infallible, rc::Rc};

use embedded_hal::{
    delay::DelayNs,
    pwm::{ErrorType, SetDutyCycle},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Duty { pin: u8, duty: u16 },
    Wait { ms: u32 },
}

/// Ordered record of every duty write and wait, shared by all mocks of one test.
pub type Timeline = Rc<RefCell<Vec<Event>>>;

pub fn timeline() -> Timeline {
    Rc::new(RefCell::new(Vec::new()))
}

pub struct MockPwm {
    pub pin: u8,
    pub timeline: Timeline,
}

impl ErrorType for MockPwm {
    type Error = Infallible;
}

impl SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.timeline.borrow_mut().push(Event::Duty {
            pin: self.pin,
            duty,
        });
        Ok(())
    }
}

pub struct MockDelay {
    pub timeline: Timeline,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.timeline.borrow_mut().push(Event::Wait {
            ms: ns / 1_000_000,
        });
    }

    fn delay_ms(&mut self, ms: u32) {
        self.timeline.borrow_mut().push(Event::Wait { ms });
    }
}

pub fn pwm_bank<const N: usize>(timeline: &Timeline) -> [MockPwm; N] {
    core::array::from_fn(|pin| MockPwm {
        pin: pin as u8,
        timeline: timeline.clone(),
    })
}

/// Total virtual time spent waiting.
pub fn waited_ms(timeline: &Timeline) -> u32 {
    timeline
        .borrow()
        .iter()
        .map(|event| match event {
            Event::Wait { ms } => *ms,
            Event::Duty { .. } => 0,
        })
        .sum()
}
