//! Host-negotiated serial line state
//!
//! A USB serial port has no physical line, so these values have no effect on
//! the data path. The host sets them with CDC class requests, and the device
//! stack is expected to store them. They're exposed so that applications can
//! act on them (for instance, bridging to a real UART at the same rate).

use core::fmt;

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt_03::Format))]
#[repr(u8)]
pub enum StopBits {
    /// 1 stop bit.
    #[default]
    One = 0,
    /// 1.5 stop bits.
    OnePointFive = 1,
    /// 2 stop bits.
    Two = 2,
}

impl StopBits {
    /// Decode the CDC `bCharFormat` field.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(StopBits::One),
            1 => Some(StopBits::OnePointFive),
            2 => Some(StopBits::Two),
            _ => None,
        }
    }
}

/// Parity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt_03::Format))]
#[repr(u8)]
pub enum Parity {
    /// No parity bit.
    #[default]
    None = 0,
    /// Odd parity.
    Odd = 1,
    /// Even parity.
    Even = 2,
    /// Parity bit always set.
    Mark = 3,
    /// Parity bit always clear.
    Space = 4,
}

impl Parity {
    /// Decode the CDC `bParityType` field.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Parity::None),
            1 => Some(Parity::Odd),
            2 => Some(Parity::Even),
            3 => Some(Parity::Mark),
            4 => Some(Parity::Space),
            _ => None,
        }
    }
}

/// The virtual line coding requested by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt_03::Format))]
pub struct LineCoding {
    /// Data terminal rate, in bits per second.
    pub baud: u32,
    /// Number of stop bits.
    pub stop_bits: StopBits,
    /// Parity type.
    pub parity: Parity,
    /// Number of data bits (5, 6, 7, 8 or 16).
    pub data_bits: u8,
}

impl LineCoding {
    /// Size of the line coding structure on the wire.
    pub const WIRE_SIZE: usize = 7;

    /// The line coding that's in effect before the host sends one.
    pub const POWER_ON: Self = LineCoding {
        baud: 57_600,
        stop_bits: StopBits::One,
        parity: Parity::None,
        data_bits: 8,
    };

    /// Decode the payload of a `SET_LINE_CODING` request.
    pub fn from_bytes(bytes: &[u8; Self::WIRE_SIZE]) -> Result<Self, InvalidLineCoding> {
        let baud = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let stop_bits = StopBits::from_raw(bytes[4]).ok_or(InvalidLineCoding::StopBits(bytes[4]))?;
        let parity = Parity::from_raw(bytes[5]).ok_or(InvalidLineCoding::Parity(bytes[5]))?;
        Ok(LineCoding {
            baud,
            stop_bits,
            parity,
            data_bits: bytes[6],
        })
    }

    /// Encode the payload of a `GET_LINE_CODING` response.
    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let baud = self.baud.to_le_bytes();
        [
            baud[0],
            baud[1],
            baud[2],
            baud[3],
            self.stop_bits as u8,
            self.parity as u8,
            self.data_bits,
        ]
    }
}

impl Default for LineCoding {
    fn default() -> Self {
        Self::POWER_ON
    }
}

/// A `SET_LINE_CODING` payload had an unknown field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt_03::Format))]
pub enum InvalidLineCoding {
    /// The stop bits code (`bCharFormat`) was unknown.
    StopBits(u8),
    /// The parity code (`bParityType`) was unknown.
    Parity(u8),
}

impl fmt::Display for InvalidLineCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidLineCoding::StopBits(raw) => write!(f, "invalid stop bits code {raw}"),
            InvalidLineCoding::Parity(raw) => write!(f, "invalid parity code {raw}"),
        }
    }
}

bitflags::bitflags! {
    /// Control signals set by the host with `SET_CONTROL_LINE_STATE`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ControlLines : u8 {
        /// Data terminal ready.
        const DTR = 0x01;
        /// Request to send.
        const RTS = 0x02;
    }
}

bitflags::bitflags! {
    /// Line status bits reported to the host in a CDC `SERIAL_STATE`
    /// notification.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SerialState : u8 {
        /// Data carrier detect.
        const DCD = 0x01;
        /// Data set ready.
        const DSR = 0x02;
        const BREAK = 0x04;
        /// Ring indicator.
        const RI = 0x08;
        const FRAMING_ERROR = 0x10;
        const PARITY_ERROR = 0x20;
        const OVERRUN_ERROR = 0x40;
    }
}

impl SerialState {
    /// Size of a `SERIAL_STATE` notification, header included.
    pub const NOTIFICATION_SIZE: usize = 10;

    /// Build the `SERIAL_STATE` notification for the communication
    /// interface `interface`.
    ///
    /// The device stack sends this on the CDC interrupt endpoint.
    pub fn notification(&self, interface: u16) -> [u8; Self::NOTIFICATION_SIZE] {
        let [index_lo, index_hi] = interface.to_le_bytes();
        [
            0xA1, // Class, interface, device to host
            0x20, // SERIAL_STATE
            0,
            0,
            index_lo,
            index_hi,
            2,
            0,
            self.bits(),
            0,
        ]
    }
}

#[cfg(feature = "defmt-03")]
impl defmt_03::Format for ControlLines {
    fn format(&self, fmt: defmt_03::Formatter) {
        defmt_03::write!(fmt, "ControlLines({=u8:#04x})", self.bits())
    }
}

#[cfg(feature = "defmt-03")]
impl defmt_03::Format for SerialState {
    fn format(&self, fmt: defmt_03::Formatter) {
        defmt_03::write!(fmt, "SerialState({=u8:#04x})", self.bits())
    }
}
