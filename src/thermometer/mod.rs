//! Temperature sensor interface

pub mod capture;
pub mod rc;

use embedded_hal::blocking::delay::DelayUs;

use crate::{delay::PollingDelay, error::Result, usb::UsbStack};

/// Raw thermometer reading.
///
/// The value is the counter state at the moment the RC network tripped the comparator, so it grows
/// with sensor resistance: a lower reading means a hotter sensor. Zero is reserved for "no
/// measurement" and must never be treated as the hottest possible value.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reading(u16);

impl Reading {
    /// The comparator never tripped during the charge window.
    pub const NONE: Self = Self(0);

    #[inline]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// The reading, unless it is the timeout sentinel.
    #[inline]
    pub const fn get(self) -> Option<u16> {
        if self.is_none() {
            None
        } else {
            Some(self.0)
        }
    }

    #[inline]
    pub const fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

impl From<u16> for Reading {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl core::fmt::Debug for Reading {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.get() {
            Some(raw) => write!(f, "Reading({raw})"),
            None => f.write_str("Reading(<none>)"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Reading {
    fn format(&self, f: defmt::Formatter<'_>) {
        match self.get() {
            Some(raw) => defmt::write!(f, "{=u16}", raw),
            None => defmt::write!(f, "<none>"),
        }
    }
}

pub trait Thermometer {
    type Error;

    /// Take one reading.
    ///
    /// Blocks for a full sampling cycle while keeping the USB stack serviced through `delay`. A
    /// sensor that never trips yields [`Reading::NONE`], not an error.
    fn read<D, U>(&mut self, delay: &mut PollingDelay<D, U>) -> Result<Reading, Self::Error>
    where
        D: DelayUs<u32>,
        U: UsbStack;
}
