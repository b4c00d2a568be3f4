//! The USB device stack that sits beside the serial port

use crate::line::{ControlLines, LineCoding};

/// A USB device stack that enumerates the CDC-ACM interface
///
/// The device stack handles the bus reset, descriptor requests, and CDC class
/// requests. It's expected to update its configured and suspended flags, and
/// the line state, from its own interrupt handlers. The serial port only
/// reads them.
pub trait DeviceStack {
    /// Initialize the USB controller and attach to the bus.
    ///
    /// This should return promptly; enumeration happens later, driven by
    /// the host.
    ///
    /// `init()` runs inside the serial port's critical section, with the
    /// port borrowed. It may enable the controller's interrupt sources, but
    /// it must not globally unmask interrupts. A USB interrupt that fires
    /// during `init()` and calls back into the serial port would panic.
    fn init(&mut self);

    /// Detach from the bus and turn off the USB controller.
    fn shutdown(&mut self);

    /// Indicates if the host has selected a configuration.
    fn is_configured(&self) -> bool;

    /// Indicates if the bus is suspended.
    fn is_suspended(&self) -> bool;

    /// Returns the most recent line coding set by the host.
    fn line_coding(&self) -> LineCoding {
        LineCoding::POWER_ON
    }

    /// Returns the most recent control line state set by the host.
    fn control_lines(&self) -> ControlLines {
        ControlLines::empty()
    }
}

impl<D: DeviceStack + ?Sized> DeviceStack for &'_ mut D {
    fn init(&mut self) {
        (**self).init()
    }
    fn shutdown(&mut self) {
        (**self).shutdown()
    }
    fn is_configured(&self) -> bool {
        (**self).is_configured()
    }
    fn is_suspended(&self) -> bool {
        (**self).is_suspended()
    }
    fn line_coding(&self) -> LineCoding {
        (**self).line_coding()
    }
    fn control_lines(&self) -> ControlLines {
        (**self).control_lines()
    }
}
