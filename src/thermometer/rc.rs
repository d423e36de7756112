//! Thermometer measuring the charge time of an RC network.
//!
//! The thermistor charges a capacitor through the charge pin. A comparator trips once the
//! capacitor crosses its threshold and the interrupt handler latches the free-running counter into
//! a [`CaptureCell`]. Charge time grows with resistance, and the thermistor's resistance drops as
//! it heats, so the counter value is an inverse temperature.

use embedded_hal::{blocking::delay::DelayUs, digital::v2::OutputPin};
use fugit::MillisDurationU32;

use crate::{
    config::Config,
    delay::PollingDelay,
    error::Result,
    thermometer::{capture::CaptureCell, Reading, Thermometer},
    usb::UsbStack,
};

/// Free-running hardware counter the comparator interrupt samples.
pub trait Counter {
    /// Restart counting from zero.
    fn reset(&mut self);
}

pub struct RcThermometer<CH, C> {
    charge: CH,
    counter: C,
    capture: &'static CaptureCell,
    charge_window: MillisDurationU32,
    discharge: MillisDurationU32,
}

impl<CH: OutputPin, C: Counter> RcThermometer<CH, C> {
    pub fn new(charge: CH, counter: C, capture: &'static CaptureCell, config: &Config) -> Self {
        Self {
            charge,
            counter,
            capture,
            charge_window: config.charge_window,
            discharge: config.discharge,
        }
    }
}

impl<CH: OutputPin, C: Counter> Thermometer for RcThermometer<CH, C> {
    type Error = CH::Error;

    #[cfg_attr(feature = "sizing", inline(never))]
    fn read<D, U>(&mut self, delay: &mut PollingDelay<D, U>) -> Result<Reading, Self::Error>
    where
        D: DelayUs<u32>,
        U: UsbStack,
    {
        self.counter.reset();
        self.capture.arm();
        if let Err(e) = self.charge.set_high() {
            self.capture.finish();
            return Err(e.into());
        }

        delay.wait(self.charge_window);

        // Discharge starts right away, the reading is collected afterwards
        let released = self.charge.set_low();
        let reading = self.capture.finish();

        if reading.is_none() {
            warn!("comparator did not trip within {} ms", self.charge_window.ticks());
        } else {
            trace!("captured {}", reading);
        }

        delay.wait(self.discharge);
        released?;

        Ok(reading)
    }
}
