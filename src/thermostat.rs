//! Main control loop
//!
//! Runs one sampling cycle after another and, every `response_interval` cycles, a regulation cycle
//! that may pulse the valve. All waiting happens inside [`PollingDelay`], so the USB stack is
//! serviced throughout.

use embedded_hal::blocking::delay::DelayUs;
use fugit::MillisDurationU32;

use crate::{
    config::Config,
    controller::{Controller, MotorDirection},
    delay::PollingDelay,
    diagnostics::Diagnostics,
    thermometer::{Reading, Thermometer},
    usb::UsbStack,
    valve::Valve,
};

pub struct Thermostat<T, C, V, D, U> {
    thermometer: T,
    controller: C,
    valve: V,
    delay: PollingDelay<D, U>,
    response_interval: u16,
    reconnect_delay: MillisDurationU32,
    /// Sampling cycles since the last regulation
    cycles: u16,
}

impl<T, C, V, D, U> Thermostat<T, C, V, D, U>
where
    T: Thermometer,
    C: Controller,
    V: Valve,
    D: DelayUs<u32>,
    U: UsbStack,
{
    pub fn new(config: &Config, thermometer: T, controller: C, valve: V, delay: D, usb: U) -> Self {
        let diagnostics = Diagnostics::new(config.reply_mode);
        Self {
            thermometer,
            controller,
            valve,
            delay: PollingDelay::new(delay, usb, diagnostics, config.poll_interval),
            response_interval: config.response_interval,
            reconnect_delay: config.reconnect_delay,
            cycles: 0,
        }
    }

    /// Release the motor and force the host to enumerate the device again.
    pub fn boot(&mut self) {
        if let Err(e) = self.valve.stop() {
            error!("Failed to release valve: {}", e.as_str());
        }

        info!("USB disconnect for {} ms", self.reconnect_delay.ticks());
        self.delay.usb_mut().disconnect();
        self.delay.hold(self.reconnect_delay);
        self.delay.usb_mut().connect();
        info!("USB connected");
    }

    /// Run one sampling cycle.
    ///
    /// Returns the regulation decision if this cycle completed a response interval.
    #[cfg_attr(feature = "sizing", inline(never))]
    pub fn step(&mut self) -> Option<MotorDirection> {
        trace!("sampling cycle {=u16}", self.cycles);

        let reading = self.thermometer.read(&mut self.delay).unwrap_or_else(|e| {
            error!("Error reading thermometer: {}", e.as_str());
            Reading::NONE
        });
        self.delay.diagnostics_mut().publish(reading);

        self.cycles += 1;
        if self.cycles < self.response_interval {
            return None;
        }
        self.cycles = 0;

        let direction = self.controller.run(reading);
        debug!("Reading: {}, Motor: {}", reading, direction);

        self.delay.diagnostics_mut().record(direction);
        if let Err(e) = self.valve.actuate(direction, &mut self.delay) {
            error!("Error driving valve: {}", e.as_str());
        }

        Some(direction)
    }

    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.delay.diagnostics()
    }

    pub fn delay_mut(&mut self) -> &mut PollingDelay<D, U> {
        &mut self.delay
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }
}
