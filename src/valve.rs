//! Radiator valve motor driver.

use embedded_hal::{blocking::delay::DelayUs, digital::v2::StatefulOutputPin};
use fugit::MillisDurationU32;

use crate::{
    config::Config,
    controller::MotorDirection,
    delay::PollingDelay,
    error::{Error, Result},
    usb::UsbStack,
};

/// Valve motor that moves in fixed-length pulses.
pub trait Valve {
    type Error;

    /// Pulse the motor in `direction`. [`MotorDirection::Idle`] does nothing.
    fn actuate<D, U>(
        &mut self,
        direction: MotorDirection,
        delay: &mut PollingDelay<D, U>,
    ) -> Result<(), Self::Error>
    where
        D: DelayUs<u32>,
        U: UsbStack;

    /// Release both motor outputs.
    fn stop(&mut self) -> Result<(), Self::Error>;
}

/// A valve motor behind two GPIO pins, one per direction.
///
/// The pins feed an H-bridge, so asserting both shorts the driver. A pin is only ever driven high
/// after the other one reads back low.
pub struct PinValve<OPEN, CLOSE> {
    open: OPEN,
    close: CLOSE,
    open_pulse: MillisDurationU32,
    close_pulse: MillisDurationU32,
}

impl<OPEN, CLOSE> PinValve<OPEN, CLOSE>
where
    OPEN: StatefulOutputPin,
    CLOSE: StatefulOutputPin<Error = OPEN::Error>,
{
    pub fn new(open: OPEN, close: CLOSE, config: &Config) -> Self {
        Self {
            open,
            close,
            open_pulse: config.open_pulse,
            close_pulse: config.close_pulse,
        }
    }

    pub fn release(self) -> (OPEN, CLOSE) {
        (self.open, self.close)
    }
}

/// Drive `pin` high for `pulse` once `other` is confirmed low.
fn pulse<P, Q, D, U>(
    pin: &mut P,
    other: &mut Q,
    pulse: MillisDurationU32,
    delay: &mut PollingDelay<D, U>,
) -> Result<(), P::Error>
where
    P: StatefulOutputPin,
    Q: StatefulOutputPin<Error = P::Error>,
    D: DelayUs<u32>,
    U: UsbStack,
{
    other.set_low()?;
    if other.is_set_high()? {
        return Err(Error::MotorConflict);
    }

    pin.set_high()?;
    delay.wait(pulse);
    pin.set_low()?;

    Ok(())
}

impl<OPEN, CLOSE> Valve for PinValve<OPEN, CLOSE>
where
    OPEN: StatefulOutputPin,
    CLOSE: StatefulOutputPin<Error = OPEN::Error>,
{
    type Error = OPEN::Error;

    #[cfg_attr(feature = "sizing", inline(never))]
    fn actuate<D, U>(
        &mut self,
        direction: MotorDirection,
        delay: &mut PollingDelay<D, U>,
    ) -> Result<(), Self::Error>
    where
        D: DelayUs<u32>,
        U: UsbStack,
    {
        let result = match direction {
            MotorDirection::Idle => return Ok(()),
            MotorDirection::Opening => {
                info!("opening valve for {} ms", self.open_pulse.ticks());
                pulse(&mut self.open, &mut self.close, self.open_pulse, delay)
            }
            MotorDirection::Closing => {
                info!("closing valve for {} ms", self.close_pulse.ticks());
                pulse(&mut self.close, &mut self.open, self.close_pulse, delay)
            }
        };

        if result.is_err() {
            // Never leave the motor running on a failed pulse
            if let Err(e) = self.stop() {
                error!("Failed to release valve: {}", e.as_str());
            }
        }
        result
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        let open = self.open.set_low();
        let close = self.close.set_low();
        open?;
        close?;
        Ok(())
    }
}
