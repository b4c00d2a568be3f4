//! A UART-like serial port over USB CDC-ACM
//!
//! `usbd-uart` moves bytes through the bulk endpoints of a CDC-ACM
//! interface, and makes them look like a plain serial port. There are no
//! software buffers; bytes are read from, and written to, the endpoint banks
//! directly. Partially-filled packets are released by a periodic tick, so
//! that small writes reach the host promptly without wasting bus time.
//!
//! The crate does not enumerate the device. Bring your own [`DeviceStack`]
//! to handle descriptors and CDC class requests, and an [`EndpointIo`]
//! implementation for your USB controller. The [`avr`] module provides one
//! for the AVR USB device controller.
//!
//! All [`UsbSerial`] methods take `&self`. Put the serial port in a `static`
//! to share it with your interrupt handlers. You'll need a
//! [`critical-section`](https://crates.io/crates/critical-section)
//! implementation; on single-core Cortex-M systems, enable this crate's
//! `cortex-m` feature. Users of the [`avr`] backend must link an AVR
//! `critical-section` implementation, such as the one provided by
//! `avr-device` with its `critical-section-impl` feature.
//!
//! # Features
//!
//! - `cortex-m`: use `cortex-m`'s single-core critical section.
//! - `defmt-03`: log through `defmt` 0.3.
//! - `log`: log through the `log` facade.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;

mod config;
mod device;
mod endpoint;
mod guard;
mod io;
mod line;
mod rx;
mod serial;
mod state;
mod tx;

pub mod avr;

#[cfg(test)]
mod mock;

pub use config::Config;
pub use device::DeviceStack;
pub use endpoint::{EndpointIo, EndpointStatus};
pub use line::{ControlLines, InvalidLineCoding, LineCoding, Parity, SerialState, StopBits};
pub use serial::{Link, UsbSerial};
pub use tx::{Error, Written};

pub use embedded_io;
