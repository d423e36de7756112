//! Radiator valve controller.
//!
//! An RC-timing thermometer feeds a bang-bang controller with a trend check, which pulses a valve
//! motor open or closed. The latest reading is served to the host over vendor USB control
//! requests. Hardware is reached only through `embedded-hal` traits, [`usb::UsbStack`] and
//! [`thermometer::rc::Counter`], so everything here also runs on the host.
#![cfg_attr(not(test), no_std)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

#[macro_use]
mod fmt;

pub mod config;
pub mod controller;
pub mod delay;
pub mod diagnostics;
pub mod error;
pub mod thermometer;
pub mod thermostat;
pub mod usb;
pub mod valve;

pub use self::{
    config::{Config, ConfigError, ReplyMode},
    controller::{predictive::PredictiveController, Controller, MotorDirection},
    delay::PollingDelay,
    diagnostics::Diagnostics,
    error::Error,
    thermometer::{
        capture::{CaptureCell, ConversionState},
        rc::{Counter, RcThermometer},
        Reading, Thermometer,
    },
    thermostat::Thermostat,
    usb::{DiagnosticClass, UsbStack},
    valve::{PinValve, Valve},
};
