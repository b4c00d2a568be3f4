//! Endpoint I/O for the AVR USB device controller
//!
//! This is the endpoint FIFO interface found on the ATmega32U4 and its
//! relatives. The module implements a RAL-compatible interface for the
//! controller's registers, and an [`EndpointIo`] implementation on top.
//!
//! The controller must be set up by a [`DeviceStack`](crate::DeviceStack)
//! that configures the serial endpoints as double-buffered bulk endpoints.

#![allow(non_snake_case, non_upper_case_globals)]

use core::{cell::UnsafeCell, marker::PhantomData};

use ral_registers::{read_reg, write_reg};
use usb_device::{endpoint::EndpointAddress, UsbDirection};

use crate::{EndpointIo, EndpointStatus};

/// Address of the first device controller register (UDCON).
const ADDRESS: usize = 0xE0;

/// Written to UEINTX to release an OUT bank.
///
/// Clears FIFOCON, NAKOUTI and RXOUTI. Every other flag is written as one,
/// which leaves it unchanged.
const RELEASE_OUT: u8 = 0x6B;
/// Written to UEINTX to release an IN bank.
///
/// Clears FIFOCON, NAKINI, RXOUTI and TXINI.
const RELEASE_IN: u8 = 0x3A;

/// An eight bit memory-mapped register
#[repr(transparent)]
pub struct Reg(UnsafeCell<u8>);

impl Reg {
    pub const fn new(val: u8) -> Self {
        Reg(UnsafeCell::new(val))
    }

    pub fn read(&self) -> u8 {
        unsafe { self.0.get().read_volatile() }
    }

    pub fn write(&self, val: u8) {
        unsafe { self.0.get().write_volatile(val) }
    }
}

/// USB device controller registers, starting at UDCON
#[repr(C)]
pub struct RegisterBlock {
    pub UDCON: Reg,
    pub UDINT: Reg,
    pub UDIEN: Reg,
    pub UDADDR: Reg,
    pub UDFNUML: Reg,
    pub UDFNUMH: Reg,
    pub UDMFN: Reg,
    _reserved0: [u8; 1],
    pub UEINTX: Reg,
    pub UENUM: Reg,
    pub UERST: Reg,
    pub UECONX: Reg,
    pub UECFG0X: Reg,
    pub UECFG1X: Reg,
    pub UESTA0X: Reg,
    pub UESTA1X: Reg,
    pub UEIENX: Reg,
    pub UEDATX: Reg,
    pub UEBCLX: Reg,
    pub UEBCHX: Reg,
    pub UEINT: Reg,
}

impl RegisterBlock {
    /// A register block in ordinary memory, with every register cleared.
    pub const fn new() -> Self {
        RegisterBlock {
            UDCON: Reg::new(0),
            UDINT: Reg::new(0),
            UDIEN: Reg::new(0),
            UDADDR: Reg::new(0),
            UDFNUML: Reg::new(0),
            UDFNUMH: Reg::new(0),
            UDMFN: Reg::new(0),
            _reserved0: [0; 1],
            UEINTX: Reg::new(0),
            UENUM: Reg::new(0),
            UERST: Reg::new(0),
            UECONX: Reg::new(0),
            UECFG0X: Reg::new(0),
            UECFG1X: Reg::new(0),
            UESTA0X: Reg::new(0),
            UESTA1X: Reg::new(0),
            UEIENX: Reg::new(0),
            UEDATX: Reg::new(0),
            UEBCLX: Reg::new(0),
            UEBCHX: Reg::new(0),
            UEINT: Reg::new(0),
        }
    }
}

impl Default for RegisterBlock {
    fn default() -> Self {
        Self::new()
    }
}

/// Register fields used by the endpoint interface
pub mod regs {
    pub mod UENUM {
        pub mod EPNUM {
            pub const offset: u8 = 0;
            pub const mask: u8 = 0x07 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
    }

    pub mod UEINTX {
        pub mod FIFOCON {
            pub const offset: u8 = 7;
            pub const mask: u8 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod NAKINI {
            pub const offset: u8 = 6;
            pub const mask: u8 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod RWAL {
            pub const offset: u8 = 5;
            pub const mask: u8 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod NAKOUTI {
            pub const offset: u8 = 4;
            pub const mask: u8 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod RXSTPI {
            pub const offset: u8 = 3;
            pub const mask: u8 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod RXOUTI {
            pub const offset: u8 = 2;
            pub const mask: u8 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod STALLEDI {
            pub const offset: u8 = 1;
            pub const mask: u8 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
        pub mod TXINI {
            pub const offset: u8 = 0;
            pub const mask: u8 = 1 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
    }

    pub mod UEBCHX {
        pub mod BYCT {
            pub const offset: u8 = 0;
            pub const mask: u8 = 0x07 << offset;
            pub mod RW {}
            pub mod R {}
            pub mod W {}
        }
    }
}

/// Endpoint access through the controller's registers
///
/// The controller remembers the direction of the selected endpoint, since
/// the hardware flags that mark a complete packet differ by direction.
pub struct Controller<'a> {
    block: *const RegisterBlock,
    direction: UsbDirection,
    _block: PhantomData<&'a RegisterBlock>,
}

// Safety: the controller is the only user of the register block. The
// serial port only touches it from within a critical section.
unsafe impl Send for Controller<'_> {}

impl<'a> Controller<'a> {
    /// Use the register block at `block`.
    ///
    /// This is typically an in-memory block for testing. See
    /// [`steal()`](Controller::steal) for the hardware registers.
    pub fn new(block: &'a RegisterBlock) -> Self {
        Controller {
            block,
            direction: UsbDirection::Out,
            _block: PhantomData,
        }
    }

    fn regs(&self) -> &RegisterBlock {
        // Safety: the pointer is either a reference that lives for 'a, or
        // the hardware registers.
        unsafe { &*self.block }
    }
}

impl Controller<'static> {
    /// Use the device controller registers.
    ///
    /// # Safety
    ///
    /// The caller must make sure that nothing else selects endpoints, or
    /// reads or writes the endpoint FIFOs, while the controller exists. The
    /// device stack may still use the controller registers from within a
    /// critical section.
    pub const unsafe fn steal() -> Self {
        Controller {
            block: ADDRESS as *const RegisterBlock,
            direction: UsbDirection::Out,
            _block: PhantomData,
        }
    }
}

impl EndpointIo for Controller<'_> {
    fn select(&mut self, address: EndpointAddress) {
        write_reg!(regs, self.regs(), UENUM, EPNUM: address.index() as u8);
        self.direction = address.direction();
    }

    fn status(&self) -> EndpointStatus {
        let flags = read_reg!(regs, self.regs(), UEINTX);
        let complete = match self.direction {
            UsbDirection::Out => regs::UEINTX::RXOUTI::mask,
            UsbDirection::In => regs::UEINTX::TXINI::mask,
        };

        let mut status = EndpointStatus::empty();
        status.set(
            EndpointStatus::READY,
            flags & regs::UEINTX::RWAL::mask != 0,
        );
        status.set(EndpointStatus::COMPLETE, flags & complete != 0);
        status
    }

    fn byte_count(&self) -> usize {
        let high = read_reg!(regs, self.regs(), UEBCHX, BYCT) as usize;
        let low = read_reg!(regs, self.regs(), UEBCLX) as usize;
        (high << 8) | low
    }

    fn read_byte(&mut self) -> u8 {
        read_reg!(regs, self.regs(), UEDATX)
    }

    fn write_byte(&mut self, byte: u8) {
        write_reg!(regs, self.regs(), UEDATX, byte);
    }

    fn release(&mut self, direction: UsbDirection) {
        let release = match direction {
            UsbDirection::Out => RELEASE_OUT,
            UsbDirection::In => RELEASE_IN,
        };
        write_reg!(regs, self.regs(), UEINTX, release);
    }

    fn frame_number(&self) -> u8 {
        read_reg!(regs, self.regs(), UDFNUML)
    }
}


const _: [(); 1] = [(); (core::mem::size_of::<RegisterBlock>() == 21) as usize];
