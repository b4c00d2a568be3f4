//! Test doubles for the device stack, endpoints, and delays
//!
//! Endpoints are modelled as double-buffered banks. The host side of each
//! endpoint is driven directly by tests. Time is a shared millisecond clock;
//! it advances once per frame number read, and by every mock delay.

use std::{cell::Cell, collections::VecDeque, rc::Rc, vec::Vec};

use embedded_hal::delay::DelayNs;
use usb_device::{endpoint::EndpointAddress, UsbDirection};

use crate::{
    line::{ControlLines, LineCoding},
    Config, DeviceStack, EndpointIo, EndpointStatus, UsbSerial,
};

/// Banks per endpoint.
const BANKS: usize = 2;

pub type Serial = UsbSerial<MockDevice, MockEndpoints>;

/// A configured serial port, with a host that's reading.
pub fn serial(config: Config) -> Serial {
    let clock = Clock::default();
    let mut device = MockDevice::new(clock.clone());
    device.configured = true;
    let endpoints = MockEndpoints::new(&config, clock);
    UsbSerial::new(device, endpoints, config)
}

#[derive(Debug, Clone, Default)]
pub struct Clock(Rc<Cell<u32>>);

impl Clock {
    pub fn now(&self) -> u32 {
        self.0.get()
    }

    pub fn advance(&self, ms: u32) {
        self.0.set(self.0.get().wrapping_add(ms));
    }

    fn reached(&self, at: Option<u32>) -> bool {
        at.map_or(false, |at| self.now() >= at)
    }
}

pub struct MockDevice {
    pub configured: bool,
    pub suspended: bool,
    /// Become configured at this time.
    pub configure_at: Option<u32>,
    /// Lose the configuration at this time.
    pub disconnect_at: Option<u32>,
    pub resume_at: Option<u32>,
    pub suspend_again_at: Option<u32>,
    pub line_coding: LineCoding,
    pub control_lines: ControlLines,
    pub init_calls: usize,
    pub shutdown_calls: usize,
    pub clock: Clock,
}

impl MockDevice {
    fn new(clock: Clock) -> Self {
        MockDevice {
            configured: false,
            suspended: false,
            configure_at: None,
            disconnect_at: None,
            resume_at: None,
            suspend_again_at: None,
            line_coding: LineCoding::POWER_ON,
            control_lines: ControlLines::empty(),
            init_calls: 0,
            shutdown_calls: 0,
            clock,
        }
    }
}

impl DeviceStack for MockDevice {
    fn init(&mut self) {
        self.init_calls += 1;
    }

    fn shutdown(&mut self) {
        self.shutdown_calls += 1;
        self.configured = false;
        self.configure_at = None;
        self.disconnect_at = None;
    }

    fn is_configured(&self) -> bool {
        if self.clock.reached(self.disconnect_at) {
            return false;
        }
        self.configured || self.clock.reached(self.configure_at)
    }

    fn is_suspended(&self) -> bool {
        if self.clock.reached(self.suspend_again_at) {
            true
        } else if self.clock.reached(self.resume_at) {
            false
        } else {
            self.suspended
        }
    }

    fn line_coding(&self) -> LineCoding {
        self.line_coding
    }

    fn control_lines(&self) -> ControlLines {
        self.control_lines
    }
}

/// The bulk OUT endpoint, from the device's point of view.
#[derive(Debug, Default)]
pub struct OutEndpoint {
    pub size: usize,
    /// Packets visible to the device. The front is the current bank.
    pub banks: VecDeque<Vec<u8>>,
    /// Read position in the current bank.
    pub cursor: usize,
    /// Packets the host is holding until a bank frees up.
    pub pending: VecDeque<Vec<u8>>,
    pub releases: usize,
}

impl OutEndpoint {
    fn status(&self) -> EndpointStatus {
        match self.banks.front() {
            Some(bank) if self.cursor < bank.len() => {
                EndpointStatus::READY | EndpointStatus::COMPLETE
            }
            Some(_) => EndpointStatus::COMPLETE,
            None => EndpointStatus::empty(),
        }
    }

    fn release(&mut self) {
        self.releases += 1;
        self.cursor = 0;
        self.banks.pop_front();
        while self.banks.len() < BANKS {
            match self.pending.pop_front() {
                Some(packet) => self.banks.push_back(packet),
                None => break,
            }
        }
    }
}

/// The bulk IN endpoint, from the device's point of view.
#[derive(Debug, Default)]
pub struct InEndpoint {
    pub size: usize,
    /// The bank being written by the device.
    pub filling: Vec<u8>,
    /// Released banks the host hasn't read.
    pub queued: VecDeque<Vec<u8>>,
    /// Packets the host has read, oldest first.
    pub delivered: Vec<Vec<u8>>,
    /// The host reads released banks as soon as they're queued.
    pub host_reading: bool,
    pub releases: usize,
}

impl InEndpoint {
    fn has_free_bank(&self) -> bool {
        self.queued.len() < BANKS
    }

    fn status(&self) -> EndpointStatus {
        if !self.has_free_bank() {
            EndpointStatus::empty()
        } else if self.filling.len() < self.size {
            EndpointStatus::READY | EndpointStatus::COMPLETE
        } else {
            EndpointStatus::COMPLETE
        }
    }

    fn release(&mut self) {
        assert!(self.has_free_bank(), "released an IN bank the host owns");
        self.releases += 1;
        let packet = core::mem::take(&mut self.filling);
        if self.host_reading {
            self.delivered.push(packet);
        } else {
            self.queued.push_back(packet);
        }
    }

    /// Occupy every bank with a packet the host hasn't read.
    pub fn stall(&mut self) {
        while self.has_free_bank() {
            self.queued.push_back(vec![0; self.size]);
        }
    }

    /// The host reads all queued packets.
    pub fn host_drain(&mut self) {
        self.delivered.extend(self.queued.drain(..));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selected {
    Rx,
    Tx,
}

pub struct MockEndpoints {
    rx_address: EndpointAddress,
    tx_address: EndpointAddress,
    selected: Option<Selected>,
    /// Number of select() calls.
    pub selects: usize,
    pub rx: OutEndpoint,
    pub tx: InEndpoint,
    /// Number of status() calls while the IN endpoint is selected.
    pub tx_status_polls: Cell<usize>,
    clock: Clock,
}

impl MockEndpoints {
    fn new(config: &Config, clock: Clock) -> Self {
        MockEndpoints {
            rx_address: config.rx_address(),
            tx_address: config.tx_address(),
            selected: None,
            selects: 0,
            rx: OutEndpoint {
                size: config.rx_packet_size(),
                ..Default::default()
            },
            tx: InEndpoint {
                size: config.tx_packet_size(),
                host_reading: true,
                ..Default::default()
            },
            tx_status_polls: Cell::new(0),
            clock,
        }
    }

    fn selected(&self) -> Selected {
        self.selected.expect("no endpoint selected")
    }

    /// The host sends `data`, split into packets. An empty slice sends a
    /// zero length packet.
    pub fn host_send(&mut self, data: &[u8]) {
        let packets: Vec<Vec<u8>> = if data.is_empty() {
            vec![Vec::new()]
        } else {
            data.chunks(self.rx.size).map(<[u8]>::to_vec).collect()
        };
        for packet in packets {
            if self.rx.banks.len() < BANKS && self.rx.pending.is_empty() {
                self.rx.banks.push_back(packet);
            } else {
                self.rx.pending.push_back(packet);
            }
        }
    }
}

impl EndpointIo for MockEndpoints {
    fn select(&mut self, address: EndpointAddress) {
        self.selects += 1;
        self.selected = if address == self.rx_address {
            Some(Selected::Rx)
        } else if address == self.tx_address {
            Some(Selected::Tx)
        } else {
            panic!("unexpected endpoint {address:?}")
        };
    }

    fn status(&self) -> EndpointStatus {
        match self.selected() {
            Selected::Rx => self.rx.status(),
            Selected::Tx => {
                self.tx_status_polls.set(self.tx_status_polls.get() + 1);
                self.tx.status()
            }
        }
    }

    fn byte_count(&self) -> usize {
        match self.selected() {
            Selected::Rx => self
                .rx
                .banks
                .front()
                .map_or(0, |bank| bank.len() - self.rx.cursor),
            Selected::Tx => self.tx.filling.len(),
        }
    }

    fn read_byte(&mut self) -> u8 {
        assert_eq!(self.selected(), Selected::Rx);
        let byte = self.rx.banks.front().expect("no OUT bank")[self.rx.cursor];
        self.rx.cursor += 1;
        byte
    }

    fn write_byte(&mut self, byte: u8) {
        assert_eq!(self.selected(), Selected::Tx);
        assert!(
            self.tx.status().contains(EndpointStatus::READY),
            "wrote to a full IN bank"
        );
        self.tx.filling.push(byte);
    }

    fn release(&mut self, direction: UsbDirection) {
        match (self.selected(), direction) {
            (Selected::Rx, UsbDirection::Out) => self.rx.release(),
            (Selected::Tx, UsbDirection::In) => self.tx.release(),
            (selected, direction) => panic!("released {direction:?} with {selected:?} selected"),
        }
    }

    fn frame_number(&self) -> u8 {
        self.clock.advance(1);
        self.clock.now() as u8
    }
}

/// Counts delayed milliseconds, and advances the clock.
pub struct MockDelay {
    clock: Clock,
    nanos: u32,
    pub elapsed_ms: u32,
}

impl MockDelay {
    pub fn new(serial: &Serial) -> Self {
        MockDelay {
            clock: serial.with_device(|device| device.clock.clone()),
            nanos: 0,
            elapsed_ms: 0,
        }
    }

    fn elapse(&mut self, ms: u32) {
        self.elapsed_ms += ms;
        self.clock.advance(ms);
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.nanos += ns % 1_000_000;
        let ms = ns / 1_000_000 + self.nanos / 1_000_000;
        self.nanos %= 1_000_000;
        self.elapse(ms);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapse(ms);
    }
}

#[test]
fn mock_out_endpoint_banks() {
    let serial = serial(Config::new().with_packet_sizes(2, 64));
    serial.with_endpoints(|ep| {
        ep.host_send(b"abcde");
        assert_eq!(ep.rx.banks.len(), 2);
        assert_eq!(ep.rx.pending.len(), 1);
        ep.select(Config::new().rx_address());
        assert_eq!(ep.byte_count(), 2);
        ep.release(UsbDirection::Out);
        assert_eq!(ep.rx.banks, [b"cd".to_vec(), b"e".to_vec()]);
    });
}

#[test]
fn mock_delay_accumulates() {
    let serial = serial(Config::new());
    let mut delay = MockDelay::new(&serial);
    delay.delay_ms(3);
    delay.delay_us(600);
    delay.delay_us(600);
    assert_eq!(delay.elapsed_ms, 4);
    assert_eq!(serial.with_device(|device| device.clock.now()), 4);
}
