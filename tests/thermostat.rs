//! Drives a complete [`Thermostat`] on the host.
//!
//! The RC network, the capture counter, the motor pins and the USB host are simulated against one
//! shared microsecond clock. The comparator "interrupt" fires from inside the delay provider, the
//! only place time passes, exactly like it preempts the busy-wait on hardware.

use std::{cell::Cell, cell::RefCell, convert::Infallible, rc::Rc};

use embedded_hal::{
    blocking::delay::DelayUs,
    digital::v2::{OutputPin, StatefulOutputPin},
};
use istatrol::{
    CaptureCell, Config, Counter, Diagnostics, MotorDirection, PinValve, PredictiveController,
    RcThermometer, Reading, Thermostat, UsbStack,
};

/// State shared by every simulated peripheral.
#[derive(Default)]
struct World {
    now_us: Cell<u64>,
    counter_origin_us: Cell<u64>,
    charging: Cell<bool>,
    /// Counter value at which the comparator trips, `None` for an open sensor
    sensor: Cell<Option<u16>>,
    /// Extra comparator events after the first one
    ringing: Cell<u16>,
    open: Cell<bool>,
    close: Cell<bool>,
    /// Both motor outputs were high at the same time
    short: Cell<bool>,
    motor_log: RefCell<Vec<MotorDirection>>,
    last_poll_us: Cell<u64>,
    longest_poll_gap_us: Cell<u64>,
}

impl World {
    /// Counter runs at 500 kHz
    fn count(&self) -> u16 {
        ((self.now_us.get() - self.counter_origin_us.get()) / 2) as u16
    }

    fn check_motor(&self) {
        if self.open.get() && self.close.get() {
            self.short.set(true);
        }
    }
}

type Shared = Rc<World>;

static CAPTURE: CaptureCell = CaptureCell::new();

struct Clock {
    world: Shared,
    charged_us: u64,
}

impl DelayUs<u32> for Clock {
    fn delay_us(&mut self, us: u32) {
        let world = &self.world;
        let start = world.now_us.get();
        world.now_us.set(start + u64::from(us));

        if !world.charging.get() {
            self.charged_us = 0;
            return;
        }

        let before = self.charged_us;
        self.charged_us += u64::from(us);
        if let Some(trip) = world.sensor.get() {
            let trip_us = u64::from(trip) * 2;
            if before < trip_us && self.charged_us >= trip_us {
                // The counter was reset when charging started
                for n in 0..=world.ringing.get() {
                    CAPTURE.latch(trip + n * 3);
                }
            }
        }
    }
}

struct SimCounter(Shared);

impl Counter for SimCounter {
    fn reset(&mut self) {
        self.0.counter_origin_us.set(self.0.now_us.get());
    }
}

struct ChargePin(Shared);

impl OutputPin for ChargePin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.charging.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.charging.set(true);
        Ok(())
    }
}

#[derive(Copy, Clone)]
enum Side {
    Open,
    Close,
}

struct MotorPin(Shared, Side);

impl MotorPin {
    fn level(&self) -> &Cell<bool> {
        match self.1 {
            Side::Open => &self.0.open,
            Side::Close => &self.0.close,
        }
    }
}

impl OutputPin for MotorPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level().set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level().set(true);
        self.0.check_motor();
        let direction = match self.1 {
            Side::Open => MotorDirection::Opening,
            Side::Close => MotorDirection::Closing,
        };
        self.0.motor_log.borrow_mut().push(direction);
        Ok(())
    }
}

impl StatefulOutputPin for MotorPin {
    fn is_set_high(&self) -> Result<bool, Self::Error> {
        Ok(self.level().get())
    }

    fn is_set_low(&self) -> Result<bool, Self::Error> {
        Ok(!self.level().get())
    }
}

/// Host that reads the diagnostic reading on every poll once attached.
struct Host {
    world: Shared,
    attached: bool,
    replies: Vec<Vec<u8>>,
}

impl UsbStack for Host {
    fn poll(&mut self, diagnostics: &mut Diagnostics) {
        let now = self.world.now_us.get();
        let gap = now - self.world.last_poll_us.get();
        self.world.last_poll_us.set(now);
        self.world
            .longest_poll_gap_us
            .set(self.world.longest_poll_gap_us.get().max(gap));

        if self.attached {
            let reply = diagnostics.respond(b'c');
            if self.replies.last() != Some(&reply.to_vec()) {
                self.replies.push(reply.to_vec());
            }
        }
    }

    fn disconnect(&mut self) {
        self.attached = false;
    }

    fn connect(&mut self) {
        self.attached = true;
        self.world.last_poll_us.set(self.world.now_us.get());
    }
}

type Bench = Thermostat<
    RcThermometer<ChargePin, SimCounter>,
    PredictiveController,
    PinValve<MotorPin, MotorPin>,
    Clock,
    Host,
>;

fn bench(config: &Config, controller: PredictiveController) -> (Bench, Shared) {
    let world = Shared::default();
    let thermostat = Thermostat::new(
        config,
        RcThermometer::new(
            ChargePin(world.clone()),
            SimCounter(world.clone()),
            &CAPTURE,
            config,
        ),
        controller,
        PinValve::new(
            MotorPin(world.clone(), Side::Open),
            MotorPin(world.clone(), Side::Close),
            config,
        ),
        Clock {
            world: world.clone(),
            charged_us: 0,
        },
        Host {
            world: world.clone(),
            attached: false,
            replies: Vec::new(),
        },
    );
    (thermostat, world)
}

const CONFIG: Config = Config {
    response_interval: 5,
    ..Config::DEFAULT
};

/// Step until the next regulation and return its decision.
fn regulate(thermostat: &mut Bench) -> MotorDirection {
    loop {
        if let Some(direction) = thermostat.step() {
            return direction;
        }
    }
}

// The capture cell is a process-wide static like on the target, so every scenario runs inside
// this one test to keep them from sharing it concurrently.
#[test]
fn thermostat_scenarios() {
    cold_room_opens_valve();
    hot_room_closes_until_trend_turns();
    dead_sensor_does_not_poison_trend();
    ringing_comparator_reads_first_trip();
    host_reads_direction_once();
}

fn cold_room_opens_valve() {
    let controller = PredictiveController::from_config(&CONFIG).with_previous(Reading::new(5900));
    let (mut t, world) = bench(&CONFIG, controller);
    t.boot();

    world.sensor.set(Some(5900));
    assert_eq!(regulate(&mut t), MotorDirection::Idle);
    assert_eq!(t.diagnostics().reading(), Reading::new(5900));

    world.sensor.set(Some(5950));
    assert_eq!(regulate(&mut t), MotorDirection::Opening);
    assert_eq!(*world.motor_log.borrow(), [MotorDirection::Opening]);

    assert!(!world.short.get());
    assert!(!world.open.get() && !world.close.get());
    assert!(world.longest_poll_gap_us.get() <= 1_000);
}

fn hot_room_closes_until_trend_turns() {
    let (mut t, world) = bench(&CONFIG, PredictiveController::from_config(&CONFIG));
    t.boot();

    // Heating up past the band, then cooling back down on its own
    for (raw, expected) in [
        (5690, MotorDirection::Idle),
        (5660, MotorDirection::Closing),
        (5620, MotorDirection::Closing),
        (5640, MotorDirection::Idle),
        (5668, MotorDirection::Idle),
        (5700, MotorDirection::Idle),
    ] {
        world.sensor.set(Some(raw));
        assert_eq!(regulate(&mut t), expected, "reading {raw}");
    }

    assert_eq!(
        *world.motor_log.borrow(),
        [MotorDirection::Closing, MotorDirection::Closing]
    );
    assert!(!world.short.get());
}

fn dead_sensor_does_not_poison_trend() {
    let (mut t, world) = bench(&CONFIG, PredictiveController::from_config(&CONFIG));
    t.boot();

    world.sensor.set(Some(5800));
    assert_eq!(regulate(&mut t), MotorDirection::Idle);

    world.sensor.set(None);
    assert_eq!(regulate(&mut t), MotorDirection::Idle);
    assert_eq!(t.diagnostics().reading(), Reading::NONE);
    assert_eq!(t.controller().previous(), Some(Reading::new(5800)));

    // Against 0 this would look like "falling"; against 5800 it is still rising
    world.sensor.set(Some(5810));
    assert_eq!(regulate(&mut t), MotorDirection::Opening);
}

fn ringing_comparator_reads_first_trip() {
    let (mut t, world) = bench(&CONFIG, PredictiveController::from_config(&CONFIG));
    t.boot();

    for ringing in 0..4 {
        world.ringing.set(ringing);
        world.sensor.set(Some(4_321));
        t.step();
        assert_eq!(t.diagnostics().reading(), Reading::new(4_321));
    }
}

fn host_reads_direction_once() {
    let controller = PredictiveController::from_config(&CONFIG).with_previous(Reading::new(5600));
    let (mut t, world) = bench(&CONFIG, controller);
    t.boot();

    world.sensor.set(Some(5500));
    assert_eq!(regulate(&mut t), MotorDirection::Closing);

    let replies = &t.delay_mut().usb().replies;
    let closing = [0x7c, 0x15, MotorDirection::Closing.code()];
    let idle = [0x7c, 0x15, MotorDirection::Idle.code()];
    let seen = replies.iter().position(|r| r[..] == closing).unwrap();
    assert_eq!(replies[seen + 1][..], idle);
}
