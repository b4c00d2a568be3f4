//! State shared between main-line code and interrupt handlers

use crate::{DeviceStack, EndpointIo};
use usb_device::endpoint::EndpointAddress;

/// Transmit state that persists across writes
///
/// Written by main-line writes, and by the periodic tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct TransmitSession {
    /// A prior write gave up waiting for the host. Cleared once the IN
    /// endpoint has room again.
    pub(crate) previous_timeout: bool,
    /// Ticks remaining before a partially-filled IN bank is released. Zero
    /// when nothing is held back.
    pub(crate) flush_timer: u8,
}

impl TransmitSession {
    pub(crate) const fn new() -> Self {
        TransmitSession {
            previous_timeout: false,
            flush_timer: 0,
        }
    }
}

/// Everything that's guarded by the port's critical section
pub(crate) struct Port<D, E> {
    pub(crate) device: D,
    pub(crate) endpoints: E,
    pub(crate) tx: TransmitSession,
}

impl<D: DeviceStack, E: EndpointIo> Port<D, E> {
    /// Select `address`, but only if the device is configured.
    ///
    /// Returns `false` if the device isn't configured, leaving the selection
    /// untouched.
    pub(crate) fn select_configured(&mut self, address: EndpointAddress) -> bool {
        if self.device.is_configured() {
            self.endpoints.select(address);
            true
        } else {
            false
        }
    }
}
