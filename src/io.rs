//! `embedded-io` and `core::fmt` adapters
//!
//! These let the serial port plug into code that's generic over byte
//! streams. Implementations are provided for both `UsbSerial` and
//! `&UsbSerial`, so a port in a `static` can be used directly.

use core::fmt;

use crate::{DeviceStack, EndpointIo, Error, UsbSerial};

impl embedded_io::Error for Error {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Error::NotConfigured | Error::Disconnected => embedded_io::ErrorKind::NotConnected,
            Error::TimedOut => embedded_io::ErrorKind::TimedOut,
        }
    }
}

impl<D: DeviceStack, E: EndpointIo> UsbSerial<D, E> {
    fn blocking_read(&self, buffer: &mut [u8]) -> Result<usize, Error> {
        if buffer.is_empty() {
            return Ok(0);
        }
        loop {
            // We are required by `embedded-io` to continue reading until at
            // least one byte is read.
            match self.read_into(buffer) {
                0 if !self.is_configured() => return Err(Error::NotConfigured),
                0 => (self.config.relax)(),
                count => return Ok(count),
            }
        }
    }

    fn blocking_write(&self, data: &[u8]) -> Result<usize, Error> {
        if data.is_empty() {
            return Ok(0);
        }
        match self.transmit(data) {
            written if written.count > 0 => Ok(written.count),
            written => Err(written.error.unwrap_or(Error::TimedOut)),
        }
    }
}

macro_rules! impl_io {
    ($($ty:ty),*) => {
        $(
            impl<D: DeviceStack, E: EndpointIo> embedded_io::ErrorType for $ty {
                type Error = Error;
            }

            /// Unlike the rest of the serial port, `read()` has no time limit.
            /// `embedded-io` requires it to block until at least one byte
            /// arrives, so it waits for as long as the device stays
            /// configured. Use [`ReadReady`](embedded_io::ReadReady) or
            /// [`UsbSerial::read_into()`] to avoid waiting.
            impl<D: DeviceStack, E: EndpointIo> embedded_io::Read for $ty {
                fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
                    UsbSerial::<D, E>::blocking_read(self, buf)
                }
            }

            impl<D: DeviceStack, E: EndpointIo> embedded_io::ReadReady for $ty {
                fn read_ready(&mut self) -> Result<bool, Self::Error> {
                    Ok(UsbSerial::<D, E>::available(self) != 0)
                }
            }

            impl<D: DeviceStack, E: EndpointIo> embedded_io::Write for $ty {
                fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
                    UsbSerial::<D, E>::blocking_write(self, buf)
                }

                fn flush(&mut self) -> Result<(), Self::Error> {
                    UsbSerial::<D, E>::send_now(self);
                    Ok(())
                }
            }

            impl<D: DeviceStack, E: EndpointIo> embedded_io::WriteReady for $ty {
                fn write_ready(&mut self) -> Result<bool, Self::Error> {
                    Ok(UsbSerial::<D, E>::is_write_ready(self))
                }
            }

            /// Output is dropped when the host isn't listening, and formatting
            /// carries on.
            impl<D: DeviceStack, E: EndpointIo> fmt::Write for $ty {
                fn write_str(&mut self, s: &str) -> fmt::Result {
                    UsbSerial::<D, E>::transmit(self, s.as_bytes());
                    Ok(())
                }
            }
        )*
    };
}

impl_io!(UsbSerial<D, E>, &UsbSerial<D, E>);

#[cfg(test)]
mod tests {
    use core::fmt;

    use embedded_io::{Error as _, ErrorKind, Read, ReadReady, Write, WriteReady};

    use crate::{mock, Config, Error};

    #[test]
    fn error_kinds() {
        assert_eq!(Error::NotConfigured.kind(), ErrorKind::NotConnected);
        assert_eq!(Error::Disconnected.kind(), ErrorKind::NotConnected);
        assert_eq!(Error::TimedOut.kind(), ErrorKind::TimedOut);
    }

    #[test]
    fn read_waits_for_a_byte() {
        let mut serial = mock::serial(Config::new());
        serial.with_endpoints(|ep| ep.host_send(b"hi"));

        assert!(serial.read_ready().unwrap());
        let mut buffer = [0; 8];
        assert_eq!(Read::read(&mut serial, &mut buffer).unwrap(), 2);
        assert_eq!(&buffer[..2], b"hi");
        assert!(!serial.read_ready().unwrap());
    }

    #[test]
    fn read_fails_when_unconfigured() {
        let mut serial = mock::serial(Config::new());
        serial.with_device(|device| device.configured = false);
        let error = Read::read(&mut serial, &mut [0; 4]).unwrap_err();
        assert_eq!(error, Error::NotConfigured);
    }

    #[test]
    fn write_through_a_shared_reference() {
        let serial = mock::serial(Config::new());
        let mut port = &serial;
        assert!(port.write_ready().unwrap());
        assert_eq!(Write::write(&mut port, b"abc").unwrap(), 3);
        Write::flush(&mut port).unwrap();
        serial.with_endpoints(|ep| assert_eq!(ep.tx.delivered, [b"abc".to_vec()]));
    }

    #[test]
    fn write_reports_errors_only_without_progress() {
        let mut serial = mock::serial(Config::new());
        serial.with_endpoints(|ep| ep.tx.host_reading = false);

        assert_eq!(Write::write(&mut serial, &[0; 200]).unwrap(), 128);
        assert_eq!(Write::write(&mut serial, b"x").unwrap_err(), Error::TimedOut);
        assert!(!serial.write_ready().unwrap());
        assert_eq!(Write::write(&mut serial, &[]).unwrap(), 0);
    }

    #[test]
    fn formatted_output() {
        let mut serial = mock::serial(Config::new());
        fmt::Write::write_fmt(&mut serial, format_args!("{}-{:02x}", 7, 0xa)).unwrap();
        serial.send_now();
        serial.with_endpoints(|ep| assert_eq!(ep.tx.delivered, [b"7-0a".to_vec()]));

        serial.with_device(|device| device.configured = false);
        assert!(fmt::Write::write_str(&mut serial, "dropped").is_ok());
    }
}
