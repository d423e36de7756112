//! Bang-bang control with a trend check.
//!
//! A radiator takes minutes to react to a valve move, far longer than a sampling cycle. Moving the
//! valve every time the reading leaves the band overshoots badly, so a move is only made while the
//! reading is still heading away from the target. Once the trend has turned the system coasts back
//! on its own.

use crate::{
    config::Config,
    controller::{Controller, MotorDirection},
    thermometer::Reading,
};

pub struct PredictiveController {
    target: u16,
    hysteresis: u16,
    /// Last genuine reading seen by a regulation cycle
    previous: Option<Reading>,
}

impl PredictiveController {
    pub const fn new(target: u16, hysteresis: u16) -> Self {
        Self {
            target,
            hysteresis,
            previous: None,
        }
    }

    pub const fn from_config(config: &Config) -> Self {
        Self::new(config.target, config.hysteresis)
    }

    /// Seed the trend with a known reading.
    #[must_use]
    pub const fn with_previous(mut self, previous: Reading) -> Self {
        if !previous.is_none() {
            self.previous = Some(previous);
        }
        self
    }

    pub const fn previous(&self) -> Option<Reading> {
        self.previous
    }

    /// Decide on a move from the current and the previous reading.
    ///
    /// Below the band (too hot) the valve closes only while readings keep falling. Above the band
    /// (too cold) it opens only while readings keep rising. Inside the band, band edges included,
    /// nothing moves.
    pub const fn regulate(&self, current: u16, previous: u16) -> MotorDirection {
        let low = self.target.saturating_sub(self.hysteresis);
        let high = self.target.saturating_add(self.hysteresis);

        if current < low {
            if current < previous {
                MotorDirection::Closing
            } else {
                MotorDirection::Idle
            }
        } else if current > high {
            if current > previous {
                MotorDirection::Opening
            } else {
                MotorDirection::Idle
            }
        } else {
            MotorDirection::Idle
        }
    }
}

impl Controller for PredictiveController {
    #[cfg_attr(feature = "sizing", inline(never))]
    fn run(&mut self, reading: Reading) -> MotorDirection {
        let Some(current) = reading.get() else {
            // Keep the trend anchored on the last genuine reading
            debug!("no reading, skipping regulation");
            return MotorDirection::Idle;
        };

        let direction = match self.previous {
            Some(previous) => self.regulate(current, previous.raw()),
            None => {
                debug!("first reading {=u16}, no trend yet", current);
                MotorDirection::Idle
            }
        };
        self.previous = Some(reading);

        direction
    }
}
