//! Tuning constants for the valve controller.
//!
//! Everything here is fixed at build time. [`Config::validate`] runs once at boot and the firmware
//! refuses to start with a configuration that would make the controller oscillate or starve the
//! USB host.

use fugit::{ExtU32, MicrosDurationU32, MillisDurationU32};

/// Longest a motor pulse may run. Hosts give up on a silent low-speed device after about a second.
pub const MAX_PULSE: MillisDurationU32 = MillisDurationU32::from_ticks(1_000);

/// Discharge time must be at least this many charge windows so no residual charge biases the
/// next reading.
pub const MIN_DISCHARGE_RATIO: u32 = 3;

/// What the diagnostic responder answers to requests it does not recognize.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReplyMode {
    /// Unknown requests get a zero-length reply.
    Production,
    /// `'h'` answers `Hello`, anything else a short ASCII error token.
    BringUp,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Reading the controller steers towards. Lower readings are hotter.
    pub target: u16,
    /// Half-width of the dead band around `target`.
    pub hysteresis: u16,
    /// Sampling cycles between two regulation decisions. Must exceed the time the radiator needs
    /// to show the effect of a valve move.
    pub response_interval: u16,
    /// How long the open output is held per opening move.
    pub open_pulse: MillisDurationU32,
    /// How long the close output is held per closing move. Usually longer than `open_pulse` so the
    /// valve closes faster than it opens.
    pub close_pulse: MillisDurationU32,
    /// Charge window. Long enough for the RC network to trip the comparator at the highest
    /// expected sensor resistance.
    pub charge_window: MillisDurationU32,
    /// Time the capacitor gets to discharge after the charge window.
    pub discharge: MillisDurationU32,
    /// Longest stretch without polling the USB stack during a wait.
    pub poll_interval: MicrosDurationU32,
    /// How long the device stays disconnected at boot to force re-enumeration.
    pub reconnect_delay: MillisDurationU32,
    /// Tick rate of the capture counter.
    pub counter_hz: u32,
    pub reply_mode: ReplyMode,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Hysteresis is zero or so wide the band reaches a rail of the reading range.
    Hysteresis,
    /// Response interval is zero.
    ResponseInterval,
    /// A motor pulse is zero or longer than [`MAX_PULSE`].
    Pulse,
    /// Discharge is shorter than [`MIN_DISCHARGE_RATIO`] charge windows.
    Discharge,
    /// Poll interval is zero or longer than the charge window.
    PollInterval,
    /// The charge window overflows the 16-bit capture counter.
    CounterOverflow,
}

impl ConfigError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hysteresis => "Hysteresis out of range",
            Self::ResponseInterval => "Response interval is zero",
            Self::Pulse => "Motor pulse out of range",
            Self::Discharge => "Discharge too short",
            Self::PollInterval => "Poll interval out of range",
            Self::CounterOverflow => "Charge window overflows counter",
        }
    }
}

impl Config {
    pub const DEFAULT: Self = Self {
        target: 5700,
        hysteresis: 30,
        response_interval: 120,
        open_pulse: MillisDurationU32::from_ticks(300),
        close_pulse: MillisDurationU32::from_ticks(500),
        charge_window: MillisDurationU32::from_ticks(100),
        discharge: MillisDurationU32::from_ticks(900),
        poll_interval: MicrosDurationU32::from_ticks(1_000),
        reconnect_delay: MillisDurationU32::from_ticks(300),
        counter_hz: 500_000,
        reply_mode: ReplyMode::Production,
    };

    pub fn validate(&self) -> Result<(), ConfigError> {
        let band = u32::from(self.hysteresis) * 2;
        let headroom = u32::from(self.target).min(u32::from(u16::MAX - self.target));
        if self.hysteresis == 0 || band >= headroom {
            return Err(ConfigError::Hysteresis);
        }

        if self.response_interval == 0 {
            return Err(ConfigError::ResponseInterval);
        }

        for pulse in [self.open_pulse, self.close_pulse] {
            if pulse.ticks() == 0 || pulse > MAX_PULSE {
                return Err(ConfigError::Pulse);
            }
        }

        if self.discharge.ticks() < self.charge_window.ticks().saturating_mul(MIN_DISCHARGE_RATIO) {
            return Err(ConfigError::Discharge);
        }

        if self.poll_interval.ticks() == 0
            || self.poll_interval.ticks() > self.charge_window.to_micros()
        {
            return Err(ConfigError::PollInterval);
        }

        if self.window_ticks() > u64::from(u16::MAX) {
            return Err(ConfigError::CounterOverflow);
        }

        Ok(())
    }

    /// Counter ticks elapsed over a full charge window.
    pub fn window_ticks(&self) -> u64 {
        u64::from(self.charge_window.ticks()) * u64::from(self.counter_hz) / 1_000
    }

    /// Wall-clock length of one sampling cycle.
    pub fn cycle(&self) -> MillisDurationU32 {
        (self.charge_window.ticks() + self.discharge.ticks()).millis()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}
