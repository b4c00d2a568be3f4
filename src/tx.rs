//! Transmit path, and the flush timer
//!
//! Writes copy bytes straight into the IN endpoint bank. A bank that fills
//! up is released immediately. A partially-filled bank is held back, hoping
//! for more data, until either the flush timer expires or the user calls
//! [`send_now()`](UsbSerial::send_now).
//!
//! If the host isn't reading, a write waits for a bank to free up, but only
//! for the transmit timeout. After a timeout, writes return immediately until
//! the endpoint has room again; this keeps a program that's printing to a
//! closed terminal from slowing to a crawl.

use core::{ffi::CStr, fmt, slice};

use usb_device::UsbDirection;

use crate::{
    endpoint::{Deadline, EndpointStatus},
    guard::Guard,
    DeviceStack, EndpointIo, UsbSerial,
};

/// Why a write stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt_03::Format))]
pub enum Error {
    /// The host hasn't configured the device. Nothing was sent.
    NotConfigured,
    /// The host didn't free a bank within the transmit timeout, or a
    /// previous write timed out and there's still no room.
    TimedOut,
    /// The device was deconfigured while waiting for the host.
    Disconnected,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotConfigured => f.write_str("USB device not configured"),
            Error::TimedOut => f.write_str("host is not reading"),
            Error::Disconnected => f.write_str("USB device deconfigured during write"),
        }
    }
}

/// The outcome of a write
///
/// Like a UART, a USB serial port drops data when nobody is listening. You're
/// free to ignore this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt_03::Format))]
pub struct Written {
    /// Number of bytes copied into the endpoint.
    pub count: usize,
    /// Set if the write stopped before `count` reached the input length.
    pub error: Option<Error>,
}

impl Written {
    const fn complete(count: usize) -> Self {
        Written { count, error: None }
    }

    const fn stopped(count: usize, error: Error) -> Self {
        Written {
            count,
            error: Some(error),
        }
    }

    /// Indicates if every byte was accepted.
    pub const fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

impl<D: DeviceStack, E: EndpointIo> UsbSerial<D, E> {
    /// Write a single byte.
    pub fn write_byte(&self, byte: u8) -> Written {
        self.transmit(slice::from_ref(&byte))
    }

    /// Write a block of bytes.
    ///
    /// Blocks while the host is reading, but never longer than the transmit
    /// timeout per packet. See [`Written`] for what happens when the host
    /// isn't reading.
    pub fn write(&self, data: &[u8]) -> Written {
        self.transmit(data)
    }

    /// Write a nul-terminated string, without the terminator.
    pub fn write_cstr(&self, string: &CStr) -> Written {
        self.transmit(string.to_bytes())
    }

    pub(crate) fn transmit(&self, data: &[u8]) -> Written {
        let address = self.config.tx_address();
        let packet_size = self.config.tx_packet_size();

        let mut guard = Guard::acquire();
        {
            let mut port = self.lock(&guard);
            if !port.select_configured(address) {
                return Written::stopped(0, Error::NotConfigured);
            }
            if port.tx.previous_timeout {
                if !port.endpoints.status().contains(EndpointStatus::READY) {
                    trace!("TX still blocked");
                    return Written::stopped(0, Error::TimedOut);
                }
                port.tx.previous_timeout = false;
            }
        }

        let mut sent = 0;
        while sent < data.len() {
            let deadline = Deadline::after(
                self.lock(&guard).endpoints.frame_number(),
                self.config.transmit_timeout,
            );

            loop {
                if self.lock(&guard).endpoints.status().contains(EndpointStatus::READY) {
                    break;
                }

                // Let interrupt handlers run while we wait.
                drop(guard);
                (self.config.relax)();

                let (now, configured) = self.with_port(|port| {
                    (port.endpoints.frame_number(), port.device.is_configured())
                });
                if deadline.is_reached(now) {
                    self.with_port(|port| port.tx.previous_timeout = true);
                    warn!("TX timeout after {} of {} bytes", sent, data.len());
                    return Written::stopped(sent, Error::TimedOut);
                }
                if !configured {
                    warn!("TX disconnected after {} of {} bytes", sent, data.len());
                    return Written::stopped(sent, Error::Disconnected);
                }

                guard = Guard::acquire();
                self.lock(&guard).endpoints.select(address);
            }

            let mut port = self.lock(&guard);
            let room = packet_size.saturating_sub(port.endpoints.byte_count());
            let chunk = &data[sent..sent + room.min(data.len() - sent)];
            for &byte in chunk {
                port.endpoints.write_byte(byte);
            }
            sent += chunk.len();

            if chunk.is_empty() || !port.endpoints.status().contains(EndpointStatus::READY) {
                port.endpoints.release(UsbDirection::In);
                port.tx.flush_timer = 0;
            } else {
                port.tx.flush_timer = self.config.flush_timeout;
            }
        }

        Written::complete(sent)
    }

    /// Release any partially-filled packet now, rather than waiting for the
    /// flush timer.
    ///
    /// This doesn't wait for the host to read the packet. USB devices only
    /// transmit when the host asks.
    pub fn send_now(&self) {
        let address = self.config.tx_address();
        self.with_port(|port| {
            if port.tx.flush_timer != 0 && port.select_configured(address) {
                port.endpoints.release(UsbDirection::In);
                port.tx.flush_timer = 0;
            }
        })
    }

    /// Advance the flush timer.
    ///
    /// Call this about once per millisecond, typically from the start-of-frame
    /// interrupt. When the flush timer expires, a partially-filled packet is
    /// released to the host.
    pub fn tick(&self) {
        let address = self.config.tx_address();
        self.with_port(|port| {
            if port.tx.flush_timer == 0 || !port.device.is_configured() {
                return;
            }
            port.tx.flush_timer -= 1;
            if port.tx.flush_timer == 0 {
                port.endpoints.select(address);
                port.endpoints.release(UsbDirection::In);
                trace!("TX flush timer expired");
            }
        })
    }

    /// Indicates if a partially-filled packet is waiting on the flush timer.
    pub fn is_flush_pending(&self) -> bool {
        self.with_port(|port| port.tx.flush_timer != 0)
    }

    /// Indicates if a write would make progress without waiting.
    pub fn is_write_ready(&self) -> bool {
        let address = self.config.tx_address();
        self.with_port(|port| {
            port.select_configured(address)
                && port.endpoints.status().contains(EndpointStatus::READY)
        })
    }
}
