//! STM32F042 glue: capture counter and USB device.

use istatrol::{Counter, DiagnosticClass, Diagnostics, UsbStack};
use stm32f0xx_hal::{
    pac::{RCC, TIM3, USB},
    usb::UsbBusType,
};
use usb_device::{
    class_prelude::UsbClass,
    device::{UsbDevice, UsbDeviceBuilder, UsbVidPid},
};

/// D+ pull-up enable in USB_BCDR
const DPPU: u32 = 1 << 15;

/// VID/PID pair the host terminal looks for
pub const VID_PID: UsbVidPid = UsbVidPid(0x16c0, 0x05e1);

/// TIM3 as a free-running 16-bit up-counter.
pub struct Tim3Counter {
    tim: TIM3,
}

impl Tim3Counter {
    /// Start TIM3 counting at `timer_hz / (prescaler + 1)`.
    pub fn new(tim: TIM3, prescaler: u16) -> Self {
        // SAFETY: only the TIM3 enable bit is touched, the HAL is done configuring RCC
        let rcc = unsafe { &*RCC::ptr() };
        rcc.apb1enr.modify(|_, w| w.tim3en().set_bit());

        // SAFETY: any prescaler and reload value is valid
        tim.psc.write(|w| unsafe { w.bits(u32::from(prescaler)) });
        tim.arr.write(|w| unsafe { w.bits(0xFFFF) });
        // Load the prescaler now rather than at the first overflow
        tim.egr.write(|w| w.ug().set_bit());
        tim.cr1.modify(|_, w| w.cen().set_bit());

        Self { tim }
    }

    /// Counter value, readable from the comparator interrupt while the sampler owns the timer.
    #[inline]
    pub fn snapshot() -> u16 {
        // SAFETY: reading CNT has no side effects
        unsafe { (*TIM3::ptr()).cnt.read().bits() as u16 }
    }
}

impl Counter for Tim3Counter {
    fn reset(&mut self) {
        // SAFETY: zero is a valid counter value
        self.tim.cnt.write(|w| unsafe { w.bits(0) });
    }
}

/// The on-chip USB device, answering diagnostic requests.
pub struct UsbLink {
    device: UsbDevice<'static, UsbBusType>,
}

impl UsbLink {
    pub fn new(bus: &'static usb_device::bus::UsbBusAllocator<UsbBusType>) -> Self {
        let device = UsbDeviceBuilder::new(bus, VID_PID)
            .manufacturer("jump-ing.de")
            .product("ISTAtrol")
            .serial_number("0001")
            .device_class(0xFF)
            .max_packet_size_0(8)
            .build();

        Self { device }
    }

    fn set_pullup(connected: bool) {
        // SAFETY: DPPU only switches the internal D+ pull-up, the USB driver never clears it
        // after enabling the peripheral
        let usb = unsafe { &*USB::ptr() };
        usb.bcdr.modify(|r, w| unsafe {
            if connected {
                w.bits(r.bits() | DPPU)
            } else {
                w.bits(r.bits() & !DPPU)
            }
        });
    }
}

impl UsbStack for UsbLink {
    fn poll(&mut self, diagnostics: &mut Diagnostics) {
        let mut class = DiagnosticClass::new(diagnostics);
        let mut classes: [&mut dyn UsbClass<UsbBusType>; 1] = [&mut class];
        self.device.poll(&mut classes);
    }

    fn disconnect(&mut self) {
        Self::set_pullup(false);
    }

    fn connect(&mut self) {
        Self::set_pullup(true);
    }
}
