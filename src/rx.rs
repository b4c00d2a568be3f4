//! Receive path
//!
//! Bytes are read straight out of the OUT endpoint bank. There's no other
//! buffering; a bank is released back to the hardware as soon as it's
//! drained, so the host can send the next packet.

use usb_device::UsbDirection;

use crate::{endpoint::EndpointStatus, state::Port, DeviceStack, EndpointIo, UsbSerial};

/// Banks per OUT endpoint.
const BANKS: usize = 2;

impl<D: DeviceStack, E: EndpointIo> Port<D, E> {
    /// Release drained banks on the selected OUT endpoint until the current
    /// bank has data, or there's nothing left to release.
    ///
    /// Zero length packets can occupy both banks, so this may release up to
    /// [`BANKS`] banks. Returns the status of the current bank.
    fn skip_drained(&mut self) -> EndpointStatus {
        let mut status = self.endpoints.status();
        for _ in 0..BANKS {
            if status.contains(EndpointStatus::READY)
                || !status.contains(EndpointStatus::COMPLETE)
            {
                break;
            }
            self.endpoints.release(UsbDirection::Out);
            status = self.endpoints.status();
        }
        status
    }

    /// Take the next byte from the selected OUT endpoint.
    fn next_byte(&mut self) -> Option<u8> {
        if !self.skip_drained().contains(EndpointStatus::READY) {
            return None;
        }

        let byte = self.endpoints.read_byte();
        if !self.endpoints.status().contains(EndpointStatus::READY) {
            self.endpoints.release(UsbDirection::Out);
        }
        Some(byte)
    }
}

impl<D: DeviceStack, E: EndpointIo> UsbSerial<D, E> {
    /// Returns the number of bytes that can be read without waiting.
    ///
    /// This only counts bytes in the current packet; more may follow. Returns
    /// zero if the device isn't configured.
    pub fn available(&self) -> usize {
        let address = self.config.rx_address();
        self.with_port(|port| {
            if !port.select_configured(address) {
                return 0;
            }
            // A drained packet that's still held would stall the next one.
            port.skip_drained();
            port.endpoints.byte_count()
        })
    }

    /// Returns the next received byte, or `None` if nothing is available.
    ///
    /// Never blocks. Returns `None` if the device isn't configured.
    pub fn read(&self) -> Option<u8> {
        let address = self.config.rx_address();
        self.with_port(|port| {
            if !port.select_configured(address) {
                return None;
            }
            port.next_byte()
        })
    }

    /// Read as many received bytes as possible into `buffer`, returning the
    /// number of bytes read.
    ///
    /// Never blocks. Returns zero if the device isn't configured.
    pub fn read_into(&self, buffer: &mut [u8]) -> usize {
        let address = self.config.rx_address();
        self.with_port(|port| {
            if buffer.is_empty() || !port.select_configured(address) {
                return 0;
            }
            let mut count = 0;
            for slot in buffer.iter_mut() {
                match port.next_byte() {
                    Some(byte) => *slot = byte,
                    None => break,
                }
                count += 1;
            }
            count
        })
    }

    /// Discard all received input.
    ///
    /// Unlike a UART flush, this does not send pending output; see
    /// [`send_now()`](UsbSerial::send_now) for that.
    pub fn flush(&self) {
        let address = self.config.rx_address();
        self.with_port(|port| {
            if !port.select_configured(address) {
                return;
            }
            while port
                .endpoints
                .status()
                .intersects(EndpointStatus::READY | EndpointStatus::COMPLETE)
            {
                port.endpoints.release(UsbDirection::Out);
            }
        })
    }
}
