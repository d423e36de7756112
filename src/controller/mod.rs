//! Controller deciding when to nudge the radiator valve.

use crate::thermometer::Reading;

pub mod predictive;

/// Which way the valve motor should move this regulation cycle.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorDirection {
    #[default]
    Idle,
    Opening,
    Closing,
}

impl MotorDirection {
    /// Code sent to the host in diagnostic replies.
    pub const fn code(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Opening => 1,
            Self::Closing => 2,
        }
    }
}

/// The target is fixed at construction.
pub trait Controller {
    /// Run the controller for a single regulation cycle
    fn run(&mut self, reading: Reading) -> MotorDirection;
}
