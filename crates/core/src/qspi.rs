//! Quad-SPI flash controller.
//!
//! The high-throughput alternative to the bit-serial bus: four data lanes
//! move a nibble per serial-clock cycle. One transaction walks
//!
//! ```text
//! IDLE → SEND_COMMAND → SEND_ADDRESS → SEND_DATA    → IDLE   (write)
//!                                    → RECEIVE_DATA → IDLE   (read)
//! ```
//!
//! Reads issue the quad-read command byte 0xEB one bit per cycle on lane 0
//! (8 cycles); writes issue quad-write 0x32 across all four lanes
//! (2 cycles). The address follows at 4 bits per cycle — 16 or 24 bits per
//! the external width mode — then 32 bits of payload move at 4 bits per
//! cycle (8 cycles), most significant nibble first. Both command bytes are
//! the standard SPI-NOR quad encodings and must stay bit-exact for flash
//! compatibility.
//!
//! `cs` is asserted (low) for exactly the duration of the transaction;
//! `busy` is true in every state except IDLE. Lanes change on the falling
//! sclk edge and are sampled on the rising edge; state leaves a phase on
//! the falling edge after that phase's last bit.

use crate::devices::{QuadPins, QUAD_READ_COMMAND, QUAD_WRITE_COMMAND};

/// Protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QspiState {
    Idle,
    SendCommand,
    SendAddress,
    SendData,
    ReceiveData,
}

/// The quad-SPI controller.
pub struct QspiController {
    /// 24-bit address mode (external mode signal).
    pub addr24: bool,
    pub state: QspiState,

    write: bool,
    address: u32,
    data_w: u32,
    sclk: bool,
    cs_n: bool,
    io_out: u8,
    cycle: u8,
    data_in: u32,

    /// True in every state except IDLE.
    pub busy: bool,
    /// One-cycle completion pulse.
    pub done: bool,
    /// Received word, valid once a read returns to IDLE.
    pub data_out: u32,
}

impl QspiController {
    pub fn new() -> Self {
        QspiController {
            addr24: false,
            state: QspiState::Idle,
            write: false,
            address: 0,
            data_w: 0,
            sclk: false,
            cs_n: true,
            io_out: 0,
            cycle: 0,
            data_in: 0,
            busy: false,
            done: false,
            data_out: 0,
        }
    }

    pub fn reset(&mut self) {
        let addr24 = self.addr24;
        *self = QspiController::new();
        self.addr24 = addr24;
    }

    #[inline(always)]
    pub fn pins(&self) -> QuadPins {
        QuadPins { sclk: self.sclk, cs_n: self.cs_n, io: self.io_out }
    }

    fn cmd_cycles(&self) -> u8 {
        if self.write { 2 } else { 8 }
    }

    fn addr_cycles(&self) -> u8 {
        if self.addr24 { 6 } else { 4 }
    }

    fn addr_mask(&self) -> u32 {
        if self.addr24 { 0xFF_FFFF } else { 0xFFFF }
    }

    fn command_lanes(&self, cycle: u8) -> u8 {
        if self.write {
            (QUAD_WRITE_COMMAND >> (4 * (1 - cycle))) & 0xF
        } else {
            // Command bit on lane 0 only, MSB first.
            (QUAD_READ_COMMAND >> (7 - cycle)) & 1
        }
    }

    fn addr_lanes(&self, cycle: u8) -> u8 {
        ((self.address >> (4 * (self.addr_cycles() - 1 - cycle))) & 0xF) as u8
    }

    fn data_lanes(&self, cycle: u8) -> u8 {
        ((self.data_w >> (4 * (7 - cycle))) & 0xF) as u8
    }

    /// Begin a transaction. Ignored while busy.
    pub fn start(&mut self, write: bool, address: u32, data: u32) -> bool {
        if self.busy {
            return false;
        }
        self.write = write;
        self.address = address & self.addr_mask();
        self.data_w = data;
        self.state = QspiState::SendCommand;
        self.cs_n = false;
        self.sclk = false;
        self.cycle = 0;
        self.data_in = 0;
        self.io_out = self.command_lanes(0);
        self.busy = true;
        self.done = false;
        true
    }

    fn finish(&mut self) {
        self.state = QspiState::Idle;
        self.cs_n = true;
        self.io_out = 0;
        self.busy = false;
        self.done = true;
    }

    /// Advance one core clock (one sclk edge). `io_in` carries the four
    /// lanes as driven by the flash, sampled on rising edges while
    /// receiving.
    pub fn tick(&mut self, io_in: u8) {
        self.done = false;
        if !self.busy {
            return;
        }

        self.sclk = !self.sclk;
        if self.sclk {
            // Rising edge: current lanes consumed, or incoming nibble sampled.
            if self.state == QspiState::ReceiveData {
                self.data_in = (self.data_in << 4) | u32::from(io_in & 0xF);
            }
            self.cycle += 1;
        } else {
            // Falling edge: phase transitions happen here, after the last
            // bit of the phase; otherwise drive the next lanes.
            match self.state {
                QspiState::SendCommand => {
                    if self.cycle >= self.cmd_cycles() {
                        self.state = QspiState::SendAddress;
                        self.cycle = 0;
                        self.io_out = self.addr_lanes(0);
                    } else {
                        self.io_out = self.command_lanes(self.cycle);
                    }
                }
                QspiState::SendAddress => {
                    if self.cycle >= self.addr_cycles() {
                        self.cycle = 0;
                        if self.write {
                            self.state = QspiState::SendData;
                            self.io_out = self.data_lanes(0);
                        } else {
                            self.state = QspiState::ReceiveData;
                            self.io_out = 0;
                        }
                    } else {
                        self.io_out = self.addr_lanes(self.cycle);
                    }
                }
                QspiState::SendData => {
                    if self.cycle >= 8 {
                        self.finish();
                    } else {
                        self.io_out = self.data_lanes(self.cycle);
                    }
                }
                QspiState::ReceiveData => {
                    if self.cycle >= 8 {
                        self.data_out = self.data_in;
                        self.finish();
                    }
                }
                QspiState::Idle => {}
            }
        }
    }
}

impl Default for QspiController {
    fn default() -> Self {
        Self::new()
    }
}
