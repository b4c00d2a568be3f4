//! The serial port, and its connection management

use core::cell::{RefCell, RefMut};

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;

use crate::{
    config::Config,
    guard::Guard,
    line::{ControlLines, LineCoding, Parity, StopBits},
    state::{Port, TransmitSession},
    DeviceStack, EndpointIo,
};

/// How [`begin()`](UsbSerial::begin) stopped waiting for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt_03::Format))]
pub enum Link {
    /// The host configured the device.
    Configured,
    /// The bus stayed suspended; there's probably no host.
    Suspended,
    /// The host never finished enumeration.
    TimedOut,
}

/// A UART-like serial port over a USB CDC-ACM interface
///
/// `UsbSerial` drives the bulk OUT and IN endpoints of a CDC-ACM interface
/// that's enumerated by a separate [`DeviceStack`]. Endpoint access goes
/// through an [`EndpointIo`] implementation.
///
/// All methods take `&self`, and are safe to call from both main-line code
/// and interrupt handlers. Each endpoint access happens in a critical
/// section. Allocate the port in a `static` to share it with your USB
/// interrupt handler.
///
/// # Timing
///
/// Call [`tick()`](UsbSerial::tick) about once per millisecond (the USB
/// start-of-frame interrupt is a good choice). The tick releases partially
/// filled packets after the flush timeout.
///
/// # Example
///
/// ```no_run
/// use usbd_uart::{avr, Config, DeviceStack, UsbSerial};
///
/// struct Stack;
/// impl DeviceStack for Stack {
///     fn init(&mut self) { /* Attach, enable USB interrupt sources... */ }
///     fn shutdown(&mut self) { /* Detach... */ }
///     fn is_configured(&self) -> bool { true }
///     fn is_suspended(&self) -> bool { false }
/// }
///
/// static SERIAL: UsbSerial<Stack, avr::Controller<'static>> = UsbSerial::new(
///     Stack,
///     // Safety: nothing else touches the endpoint registers.
///     unsafe { avr::Controller::steal() },
///     Config::new(),
/// );
///
/// // In the start-of-frame interrupt handler:
/// SERIAL.tick();
///
/// // In main-line code:
/// # struct Delay;
/// # impl embedded_hal::delay::DelayNs for Delay { fn delay_ns(&mut self, _: u32) {} }
/// # let mut delay = Delay;
/// SERIAL.begin(115_200, &mut delay);
/// SERIAL.write(b"hello world\r\n");
/// while let Some(byte) = SERIAL.read() {
///     SERIAL.write_byte(byte);
/// }
/// ```
pub struct UsbSerial<D, E> {
    port: Mutex<RefCell<Port<D, E>>>,
    pub(crate) config: Config,
}

impl<D, E> UsbSerial<D, E> {
    /// Create a serial port from a device stack, endpoint I/O, and a
    /// configuration.
    pub const fn new(device: D, endpoints: E, config: Config) -> Self {
        UsbSerial {
            port: Mutex::new(RefCell::new(Port {
                device,
                endpoints,
                tx: TransmitSession::new(),
            })),
            config,
        }
    }

    /// Returns the serial port configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl<D: DeviceStack, E: EndpointIo> UsbSerial<D, E> {
    /// Interrupt-safe access to the port
    pub(crate) fn with_port<R>(&self, func: impl FnOnce(&mut Port<D, E>) -> R) -> R {
        critical_section::with(|cs| {
            let mut port = self.port.borrow_ref_mut(cs);
            func(&mut port)
        })
    }

    /// Access the port for as long as `guard` is held
    pub(crate) fn lock<'a>(&'a self, guard: &'a Guard) -> RefMut<'a, Port<D, E>> {
        self.port.borrow_ref_mut(guard.token())
    }

    /// Interrupt-safe access to the device stack.
    ///
    /// Use this from your control request handler if the device stack keeps
    /// its state inside the serial port.
    ///
    /// # Panics
    ///
    /// Panics if `func` calls back into this serial port.
    pub fn with_device<R>(&self, func: impl FnOnce(&mut D) -> R) -> R {
        self.with_port(|port| func(&mut port.device))
    }

    /// Interrupt-safe access to the endpoint I/O.
    ///
    /// The endpoint selection is undefined when `func` is called.
    ///
    /// # Panics
    ///
    /// Panics if `func` calls back into this serial port.
    pub fn with_endpoints<R>(&self, func: impl FnOnce(&mut E) -> R) -> R {
        self.with_port(|port| func(&mut port.endpoints))
    }

    /// Indicates if the host has configured the device.
    pub fn is_configured(&self) -> bool {
        self.with_port(|port| port.device.is_configured())
    }

    /// Start the device stack, and wait for the host to configure it
    ///
    /// Waits until either
    ///
    /// - the host configures the device, then waits a little longer so that
    ///   the host can load a driver,
    /// - the bus stays suspended for the suspend window, since there's
    ///   probably no host, or
    /// - the enumeration timeout elapses.
    ///
    /// This blocks, and cannot be cancelled. Only call it during startup.
    /// `baud` is ignored; the host picks the line coding.
    pub fn begin<T: DelayNs>(&self, _baud: u32, delay: &mut T) -> Link {
        self.with_port(|port| {
            port.device.init();
            port.tx = TransmitSession::new();
        });

        let mut waited_ms: u32 = 0;
        let mut suspended_ms: u32 = 0;
        loop {
            let (configured, suspended) = self.with_port(|port| {
                (port.device.is_configured(), port.device.is_suspended())
            });

            if configured {
                debug!("CONFIGURED after {} ms", waited_ms);
                delay.delay_ms(self.config.settle_ms);
                return Link::Configured;
            }

            if !suspended {
                suspended_ms = 0;
            } else if suspended_ms >= self.config.suspend_window_ms {
                debug!("SUSPENDED for {} ms; giving up", suspended_ms);
                return Link::Suspended;
            }

            if waited_ms >= self.config.enumeration_timeout_ms {
                warn!("Not configured after {} ms", waited_ms);
                return Link::TimedOut;
            }

            delay.delay_ms(1);
            waited_ms = waited_ms.saturating_add(1);
            if suspended {
                suspended_ms = suspended_ms.saturating_add(1);
            }
        }
    }

    /// Shut down the device stack, then wait for the bus to settle.
    pub fn end<T: DelayNs>(&self, delay: &mut T) {
        self.with_port(|port| {
            port.device.shutdown();
            port.tx = TransmitSession::new();
        });
        debug!("SHUTDOWN");
        delay.delay_ms(self.config.end_settle_ms);
    }

    /// Returns the line coding requested by the host.
    pub fn line_coding(&self) -> LineCoding {
        self.with_port(|port| port.device.line_coding())
    }

    /// Returns the baud rate requested by the host.
    pub fn baud(&self) -> u32 {
        self.line_coding().baud
    }

    /// Returns the stop bits requested by the host.
    pub fn stop_bits(&self) -> StopBits {
        self.line_coding().stop_bits
    }

    /// Returns the parity requested by the host.
    pub fn parity(&self) -> Parity {
        self.line_coding().parity
    }

    /// Returns the number of data bits requested by the host.
    pub fn data_bits(&self) -> u8 {
        self.line_coding().data_bits
    }

    /// Returns the control line state set by the host.
    pub fn control_lines(&self) -> ControlLines {
        self.with_port(|port| port.device.control_lines())
    }

    /// Indicates if the host asserted DTR (data terminal ready).
    ///
    /// Most terminal programs assert DTR while the port is open.
    pub fn dtr(&self) -> bool {
        self.control_lines().contains(ControlLines::DTR)
    }

    /// Indicates if the host asserted RTS (request to send).
    pub fn rts(&self) -> bool {
        self.control_lines().contains(ControlLines::RTS)
    }
}
