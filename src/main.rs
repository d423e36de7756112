#![no_std]
#![no_main]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::wildcard_imports)]

mod board;

use defmt_rtt as _;
use istatrol::{CaptureCell, Config};
use panic_probe as _;

/// Tuning used by this build
const CONFIG: Config = Config::DEFAULT;

/// Hand-off from the comparator interrupt to the sampler
static CAPTURE: CaptureCell = CaptureCell::new();

#[rtic::app(device = stm32f0xx_hal::pac)]
mod app {
    use defmt::{panic, *};
    use istatrol::{PinValve, PredictiveController, RcThermometer, Thermostat};
    use rtic_monotonics::{
        stm32::{Tim2 as Mono, *},
        Monotonic,
    };
    use stm32f0xx_hal::{
        delay::Delay,
        gpio::{Output, Pin, PushPull},
        pac::EXTI,
        prelude::*,
        usb::{Peripheral, UsbBus, UsbBusType},
    };
    use usb_device::bus::UsbBusAllocator;

    use crate::{
        board::{Tim3Counter, UsbLink},
        CAPTURE, CONFIG,
    };

    /// System and timer clock
    const SYSCLK_HZ: u32 = 48_000_000;
    /// EXTI line of the comparator input
    const LINE0: u32 = 1 << 0;

    type Thermo = RcThermometer<Pin<Output<PushPull>>, Tim3Counter>;
    type Motor = PinValve<Pin<Output<PushPull>>, Pin<Output<PushPull>>>;
    type Board = Thermostat<Thermo, PredictiveController, Motor, Delay, UsbLink>;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        thermostat: Board,
        exti: EXTI,
    }

    #[init(local = [usb_bus: Option<UsbBusAllocator<UsbBusType>> = None])]
    fn init(mut cx: init::Context) -> (Shared, Local) {
        if let Err(e) = CONFIG.validate() {
            panic!("Invalid configuration: {}", e.as_str());
        }

        // USB needs the 48 MHz HSI trimmed by the clock recovery system
        let mut rcc = cx
            .device
            .RCC
            .configure()
            .hsi48()
            .enable_crs(cx.device.CRS)
            .sysclk(48.mhz())
            .pclk(48.mhz())
            .hclk(48.mhz())
            .freeze(&mut cx.device.FLASH);

        trace!("sysclk: {}", rcc.clocks.sysclk().0);
        trace!("hclk: {}", rcc.clocks.hclk().0);
        trace!("pclk: {}", rcc.clocks.pclk().0);

        // Enable tim2 monotonic
        let token = rtic_monotonics::create_stm32_tim2_monotonic_token!();
        Mono::start(SYSCLK_HZ, token);

        // Setup systick delay
        let delay = Delay::new(cx.core.SYST, &rcc);

        // Setup GPIO
        let gpioa = cx.device.GPIOA.split(&mut rcc);
        let gpiob = cx.device.GPIOB.split(&mut rcc);

        // Comparator output on PA0, EXTI line 0 rising edge. SYSCFG routes line 0 to port A after
        // reset.
        let _comparator = gpioa.pa0.into_floating_input(&cx.cs);
        let exti = cx.device.EXTI;
        // SAFETY: only line 0 is touched
        exti.imr.modify(|r, w| unsafe { w.bits(r.bits() | LINE0) });
        exti.rtsr.modify(|r, w| unsafe { w.bits(r.bits() | LINE0) });

        let mut charge = gpioa.pa1.into_push_pull_output(&cx.cs).downgrade();
        unwrap!(charge.set_low());
        let mut open = gpiob.pb0.into_push_pull_output(&cx.cs).downgrade();
        let mut close = gpiob.pb1.into_push_pull_output(&cx.cs).downgrade();
        unwrap!(open.set_low());
        unwrap!(close.set_low());

        // Capture counter
        let prescaler = SYSCLK_HZ / CONFIG.counter_hz - 1;
        let counter = Tim3Counter::new(cx.device.TIM3, prescaler as u16);

        // Setup USB
        let usb = Peripheral {
            usb: cx.device.USB,
            pin_dm: gpioa.pa11,
            pin_dp: gpioa.pa12,
        };
        let bus: &'static UsbBusAllocator<UsbBusType> = cx.local.usb_bus.insert(UsbBus::new(usb));
        let usb = UsbLink::new(bus);

        let thermostat = Thermostat::new(
            &CONFIG,
            RcThermometer::new(charge, counter, &CAPTURE, &CONFIG),
            PredictiveController::from_config(&CONFIG),
            PinValve::new(open, close, &CONFIG),
            delay,
            usb,
        );

        info!(
            "target: {=u16}, hysteresis: {=u16}, regulating every {=u16} cycles",
            CONFIG.target,
            CONFIG.hysteresis,
            CONFIG.response_interval
        );

        (Shared {}, Local { thermostat, exti })
    }

    #[idle(local = [thermostat])]
    fn idle(cx: idle::Context) -> ! {
        let thermostat = cx.local.thermostat;
        thermostat.boot();
        thermostat.run()
    }

    #[task(binds = EXTI0_1, priority = 2, local = [exti, trips: u32 = 0])]
    fn comparator(cx: comparator::Context) {
        let count = Tim3Counter::snapshot();
        // SAFETY: writing 1 clears the pending bit of line 0 only
        cx.local.exti.pr.write(|w| unsafe { w.bits(LINE0) });
        *cx.local.trips += 1;

        if CAPTURE.latch(count) {
            trace!("comparator tripped at {=u16}", count);
        } else {
            trace!("comparator ringing: {}", *cx.local.trips);
        }
    }

    timestamp!("{=u64:us}", {
        Mono::now().duration_since_epoch().to_micros()
    });
}
