//! Seam between the control loop and the USB device stack.

use usb_device::{class_prelude::*, UsbDirection};

use crate::diagnostics::{Diagnostics, Reply};

/// The parts of a USB device stack the control loop drives.
pub trait UsbStack {
    /// Let the stack make progress. Never blocks. Control requests arriving during the call are
    /// answered from `diagnostics`.
    fn poll(&mut self, diagnostics: &mut Diagnostics);

    /// Detach from the bus.
    fn disconnect(&mut self);

    /// Attach to the bus, making the host enumerate the device again.
    fn connect(&mut self);
}

/// Answers vendor IN requests addressed to the device from the diagnostic state.
///
/// Lives only for the duration of one poll, so the state stays owned by the control loop.
pub struct DiagnosticClass<'a> {
    diagnostics: &'a mut Diagnostics,
}

impl<'a> DiagnosticClass<'a> {
    pub fn new(diagnostics: &'a mut Diagnostics) -> Self {
        Self { diagnostics }
    }
}

/// Reply to a control request, or `None` if it is not a vendor IN request addressed to the device
/// (`bmRequestType` 0xC0) and belongs to another class.
pub fn answer(diagnostics: &mut Diagnostics, req: &control::Request) -> Option<Reply> {
    if req.direction != UsbDirection::In
        || req.request_type != control::RequestType::Vendor
        || req.recipient != control::Recipient::Device
    {
        return None;
    }
    Some(diagnostics.respond(req.request))
}

impl<B: UsbBus> UsbClass<B> for DiagnosticClass<'_> {
    fn control_in(&mut self, xfer: ControlIn<B>) {
        let req = *xfer.request();
        let Some(reply) = answer(self.diagnostics, &req) else {
            return;
        };

        if xfer.accept_with(&reply).is_err() {
            warn!("failed to send reply to request {=u8:#x}", req.request);
        }
    }
}
