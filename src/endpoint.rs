//! Endpoint-level access to the USB controller

use usb_device::{endpoint::EndpointAddress, UsbDirection};

bitflags::bitflags! {
    /// Status of the currently-selected endpoint bank.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EndpointStatus : u8 {
        /// The bank can be read (OUT) or written (IN).
        ///
        /// For an OUT endpoint, this is set while unread bytes remain in the
        /// bank. For an IN endpoint, this is set while the bank has room.
        const READY = 1 << 0;
        /// A packet is complete.
        ///
        /// For an OUT endpoint, a packet arrived from the host and has not
        /// been released. For an IN endpoint, a bank was freed by the host.
        const COMPLETE = 1 << 1;
    }
}

#[cfg(feature = "defmt-03")]
impl defmt_03::Format for EndpointStatus {
    fn format(&self, fmt: defmt_03::Formatter) {
        defmt_03::write!(fmt, "EndpointStatus({=u8:#04x})", self.bits())
    }
}

/// Endpoint primitives exposed by the USB controller
///
/// The controller has a single, global endpoint selection. Every other method
/// acts on whichever endpoint was last [`select`](EndpointIo::select)ed. The
/// serial port only calls these methods while it holds a critical section,
/// so an interrupt handler cannot change the selection mid-operation.
///
/// Implementations are not expected to perform any enumeration or control
/// endpoint handling; that's the job of the [`DeviceStack`](crate::DeviceStack).
pub trait EndpointIo {
    /// Select the endpoint that following calls act upon.
    fn select(&mut self, address: EndpointAddress);

    /// Returns the status of the selected endpoint's current bank.
    fn status(&self) -> EndpointStatus;

    /// Returns the number of bytes in the selected endpoint's current bank.
    ///
    /// For OUT endpoints, this is the number of unread bytes. For IN
    /// endpoints, this is the number of bytes written so far.
    fn byte_count(&self) -> usize;

    /// Pop the next byte from the selected OUT endpoint bank.
    fn read_byte(&mut self) -> u8;

    /// Push a byte into the selected IN endpoint bank.
    fn write_byte(&mut self, byte: u8);

    /// Hand the current bank back to the hardware.
    ///
    /// For an OUT endpoint, this acknowledges the packet so that the next one
    /// can be received. For an IN endpoint, this queues the bank for
    /// transmission, even if it's not full.
    fn release(&mut self, direction: UsbDirection);

    /// Returns the low byte of the current USB frame number.
    ///
    /// The frame number advances once per millisecond while the bus is
    /// active. It's only used as a coarse timeout clock.
    fn frame_number(&self) -> u8;
}

impl<E: EndpointIo + ?Sized> EndpointIo for &'_ mut E {
    fn select(&mut self, address: EndpointAddress) {
        (**self).select(address)
    }
    fn status(&self) -> EndpointStatus {
        (**self).status()
    }
    fn byte_count(&self) -> usize {
        (**self).byte_count()
    }
    fn read_byte(&mut self) -> u8 {
        (**self).read_byte()
    }
    fn write_byte(&mut self, byte: u8) {
        (**self).write_byte(byte)
    }
    fn release(&mut self, direction: UsbDirection) {
        (**self).release(direction)
    }
    fn frame_number(&self) -> u8 {
        (**self).frame_number()
    }
}

/// A frame-counter deadline
///
/// The frame counter is only eight bits wide, so deadlines are compared with
/// wrapping arithmetic. Budgets must stay below 128 frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Deadline {
    at: u8,
}

impl Deadline {
    /// A deadline `budget` frames after `now`.
    pub(crate) const fn after(now: u8, budget: u8) -> Self {
        Deadline {
            at: now.wrapping_add(budget),
        }
    }

    /// Indicates if `now` is at, or beyond, the deadline.
    pub(crate) fn is_reached(&self, now: u8) -> bool {
        (now.wrapping_sub(self.at) as i8) >= 0
    }
}

#[cfg(test)]
mod tests {
    use super::Deadline;

    #[test]
    fn deadline_reached() {
        let deadline = Deadline::after(10, 15);
        assert!(!deadline.is_reached(10));
        assert!(!deadline.is_reached(24));
        assert!(deadline.is_reached(25));
        assert!(deadline.is_reached(30));
    }

    #[test]
    fn deadline_wraps() {
        let deadline = Deadline::after(250, 15);
        assert!(!deadline.is_reached(250));
        assert!(!deadline.is_reached(255));
        assert!(!deadline.is_reached(8));
        assert!(deadline.is_reached(9));
        assert!(deadline.is_reached(12));
    }
}
