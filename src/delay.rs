//! Delays that keep the USB stack alive.
//!
//! The USB stack only makes progress when polled, and a low-speed host drops a device that stays
//! quiet for too long. Every wait in the sampler and the valve driver therefore goes through
//! [`PollingDelay::wait`], which slices the delay into `step`-sized pieces with a poll after each.

use embedded_hal::blocking::delay::DelayUs;
use fugit::{MicrosDurationU32, MillisDurationU32};

use crate::{diagnostics::Diagnostics, usb::UsbStack};

pub struct PollingDelay<D, U> {
    delay: D,
    usb: U,
    diagnostics: Diagnostics,
    step: MicrosDurationU32,
}

impl<D: DelayUs<u32>, U: UsbStack> PollingDelay<D, U> {
    pub fn new(delay: D, usb: U, diagnostics: Diagnostics, step: MicrosDurationU32) -> Self {
        Self {
            delay,
            usb,
            diagnostics,
            step,
        }
    }

    /// Let the USB stack make progress once.
    #[inline]
    pub fn poll(&mut self) {
        self.usb.poll(&mut self.diagnostics);
    }

    /// Wait for `duration`, polling the USB stack at least every `step`.
    #[cfg_attr(feature = "sizing", inline(never))]
    pub fn wait(&mut self, duration: MillisDurationU32) {
        let step = self.step.ticks().max(1);
        let mut remaining = duration.to_micros();

        while remaining > 0 {
            let slice = remaining.min(step);
            self.delay.delay_us(slice);
            self.poll();
            remaining -= slice;
        }
    }

    /// Wait for `duration` without polling. Only for boot, while the device is detached.
    pub fn hold(&mut self, duration: MillisDurationU32) {
        self.delay.delay_us(duration.to_micros());
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn usb(&self) -> &U {
        &self.usb
    }

    pub fn usb_mut(&mut self) -> &mut U {
        &mut self.usb
    }
}
