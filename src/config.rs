//! Serial port configuration

use usb_device::{endpoint::EndpointAddress, UsbDirection};

/// Serial port configuration
///
/// The defaults match a full-speed CDC-ACM interface with double-buffered,
/// 64 byte bulk endpoints on endpoint 3 (OUT) and endpoint 4 (IN).
///
/// ```
/// use usbd_uart::Config;
///
/// const CONFIG: Config = Config::new()
///     .with_endpoints(2, 3)
///     .with_packet_sizes(32, 32)
///     .with_flush_timeout(5);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub(crate) rx_endpoint: u8,
    pub(crate) tx_endpoint: u8,
    pub(crate) rx_size: u8,
    pub(crate) tx_size: u8,
    pub(crate) transmit_timeout: u8,
    pub(crate) flush_timeout: u8,
    pub(crate) settle_ms: u32,
    pub(crate) end_settle_ms: u32,
    pub(crate) suspend_window_ms: u32,
    pub(crate) enumeration_timeout_ms: u32,
    pub(crate) relax: fn(),
}

impl Config {
    /// The default configuration.
    pub const fn new() -> Self {
        Config {
            rx_endpoint: 3,
            tx_endpoint: 4,
            rx_size: 64,
            tx_size: 64,
            transmit_timeout: 15,
            flush_timeout: 3,
            settle_ms: 200,
            end_settle_ms: 25,
            suspend_window_ms: 500,
            enumeration_timeout_ms: 5_000,
            relax: core::hint::spin_loop,
        }
    }

    /// Set the OUT (receive) and IN (transmit) endpoint numbers.
    pub const fn with_endpoints(mut self, rx: u8, tx: u8) -> Self {
        self.rx_endpoint = rx;
        self.tx_endpoint = tx;
        self
    }

    /// Set the max packet sizes of the OUT and IN endpoints.
    ///
    /// These must match the sizes in the configuration descriptor.
    pub const fn with_packet_sizes(mut self, rx: u8, tx: u8) -> Self {
        self.rx_size = rx;
        self.tx_size = tx;
        self
    }

    /// Set how many frames (roughly milliseconds) a write waits for the
    /// host to free a bank before giving up.
    ///
    /// Clamped to 127 frames, the most that an eight bit frame counter can
    /// measure.
    pub const fn with_transmit_timeout(mut self, frames: u8) -> Self {
        self.transmit_timeout = if frames > 127 { 127 } else { frames };
        self
    }

    /// Set how many ticks a partially-filled packet is held back before
    /// it's sent anyway.
    pub const fn with_flush_timeout(mut self, ticks: u8) -> Self {
        self.flush_timeout = ticks;
        self
    }

    /// Set how long `begin()` waits after the device is configured, giving
    /// the host time to load a driver.
    pub const fn with_settle_ms(mut self, ms: u32) -> Self {
        self.settle_ms = ms;
        self
    }

    /// Set how long `end()` waits after shutting down the device stack.
    pub const fn with_end_settle_ms(mut self, ms: u32) -> Self {
        self.end_settle_ms = ms;
        self
    }

    /// Set how long the bus must stay suspended before `begin()` gives up
    /// waiting for enumeration.
    pub const fn with_suspend_window_ms(mut self, ms: u32) -> Self {
        self.suspend_window_ms = ms;
        self
    }

    /// Set the longest `begin()` waits for enumeration when the bus is not
    /// suspended.
    pub const fn with_enumeration_timeout_ms(mut self, ms: u32) -> Self {
        self.enumeration_timeout_ms = ms;
        self
    }

    /// Set the step that runs, outside of any critical section, each time a
    /// write polls a busy endpoint.
    ///
    /// The default is a spin loop hint.
    pub const fn with_relax(mut self, relax: fn()) -> Self {
        self.relax = relax;
        self
    }

    /// Returns the max packet size of the IN endpoint.
    pub const fn tx_packet_size(&self) -> usize {
        self.tx_size as usize
    }

    /// Returns the max packet size of the OUT endpoint.
    pub const fn rx_packet_size(&self) -> usize {
        self.rx_size as usize
    }

    /// Returns the flush timeout, in ticks.
    pub const fn flush_timeout(&self) -> u8 {
        self.flush_timeout
    }

    pub(crate) fn rx_address(&self) -> EndpointAddress {
        EndpointAddress::from_parts(self.rx_endpoint as usize, UsbDirection::Out)
    }

    pub(crate) fn tx_address(&self) -> EndpointAddress {
        EndpointAddress::from_parts(self.tx_endpoint as usize, UsbDirection::In)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
