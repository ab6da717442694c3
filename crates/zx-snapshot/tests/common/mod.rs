#![allow(dead_code)]

use std::io::{self, Cursor, Read, Write};
use std::time::Duration;

use zx_snapshot::{
    BlockStorage, CpuState, ScreenDevice, SnapshotSource, SnapshotTarget, Z80Header,
    ATTRIBUTE_COUNT, EXTENDED_BLOCK_TAIL_LEN, PAGE_SIZE, PIXEL_COUNT, RAM_LEN,
};

/// Device attribute encoding used by the tests: the Spectrum byte with ink and paper swapped,
/// widened to `u16` and tagged so an untranslated value is easy to spot.
pub fn device_color(spectrum: u8) -> u16 {
    let ink = spectrum & 0x07;
    let paper = (spectrum >> 3) & 0x07;
    let rest = spectrum & 0xC0;
    0xA500 | u16::from(rest | (ink << 3) | paper)
}

pub fn spectrum_color(device: u16) -> u8 {
    let low = device as u8;
    let paper = low & 0x07;
    let ink = (low >> 3) & 0x07;
    (low & 0xC0) | (paper << 3) | ink
}

#[derive(Debug, Clone)]
pub struct TestScreen {
    pub pixels: Vec<u8>,
    pub attributes: Vec<u16>,
    pub border: u8,
    pub shown: Vec<Vec<u8>>,
}

impl TestScreen {
    pub fn new() -> Self {
        Self {
            pixels: vec![0; PIXEL_COUNT],
            attributes: vec![device_color(0); ATTRIBUTE_COUNT],
            border: 0,
            shown: Vec::new(),
        }
    }
}

impl ScreenDevice for TestScreen {
    type Attribute = u16;

    fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    fn attributes(&self) -> &[u16] {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut [u16] {
        &mut self.attributes
    }

    fn to_spectrum_color(&self, attribute: u16) -> u8 {
        spectrum_color(attribute)
    }

    fn from_spectrum_color(&self, attribute: u8) -> u16 {
        device_color(attribute)
    }

    fn border_color(&self) -> u8 {
        self.border
    }

    fn set_border_color(&mut self, color: u8) {
        self.border = color;
    }

    fn show_screenshot(&mut self, screen: &[u8]) {
        self.shown.push(screen.to_vec());
    }
}

#[derive(Debug, Clone)]
pub struct TestMachine {
    pub cpu: CpuState,
    pub screen: TestScreen,
    pub ram: Vec<u8>,
}

impl TestMachine {
    pub fn new() -> Self {
        Self {
            cpu: CpuState::default(),
            screen: TestScreen::new(),
            ram: vec![0; RAM_LEN],
        }
    }

    /// A machine with every register and memory byte set to something recognisable.
    pub fn patterned() -> Self {
        let mut machine = Self::new();
        machine.cpu = sample_cpu();
        machine.screen.border = 6;
        for (idx, b) in machine.screen.pixels.iter_mut().enumerate() {
            *b = (idx % 251) as u8;
        }
        for (idx, a) in machine.screen.attributes.iter_mut().enumerate() {
            *a = device_color((idx * 7) as u8);
        }
        for (idx, b) in machine.ram.iter_mut().enumerate() {
            // Long runs so compression has something to fold, plus escape bytes.
            *b = match (idx / 64) % 4 {
                0 => 0x00,
                1 => 0xED,
                2 => (idx % 13) as u8,
                _ => (idx >> 8) as u8,
            };
        }
        machine
    }
}

impl SnapshotSource for TestMachine {
    type Screen = TestScreen;

    fn cpu_state(&self) -> CpuState {
        self.cpu
    }

    fn screen(&self) -> &TestScreen {
        &self.screen
    }

    fn ram(&self) -> &[u8] {
        &self.ram
    }
}

impl SnapshotTarget for TestMachine {
    type Screen = TestScreen;

    fn restore_cpu_state(&mut self, state: CpuState) {
        self.cpu = state;
    }

    fn screen_mut(&mut self) -> &mut TestScreen {
        &mut self.screen
    }

    fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }
}

pub fn sample_cpu() -> CpuState {
    CpuState {
        af: 0x1234,
        bc: 0x5678,
        de: 0x9ABC,
        hl: 0xDEF0,
        af_alt: 0x1122,
        bc_alt: 0x3344,
        de_alt: 0x5566,
        hl_alt: 0x7788,
        ix: 0x99AA,
        iy: 0xBBCC,
        sp: 0xFF00,
        pc: 0x8000,
        i: 0x3F,
        r: 0xC5,
        iff1: true,
        iff2: true,
        im: 1,
    }
}

/// Header plus zeroed extended block for `cpu`.
pub fn header_bytes(cpu: &CpuState, border: u8) -> Vec<u8> {
    let mut out = Vec::new();
    Z80Header::pack(cpu, border).encode(&mut out).unwrap();
    out.resize(out.len() + EXTENDED_BLOCK_TAIL_LEN, 0);
    out
}

pub fn raw_page(id: u8, payload: &[u8]) -> Vec<u8> {
    assert_eq!(payload.len(), PAGE_SIZE);
    let mut out = vec![0xFF, 0xFF, id];
    out.extend_from_slice(payload);
    out
}

pub fn compressed_page(id: u8, payload: &[u8]) -> Vec<u8> {
    let len = payload.len() as u16;
    let mut out = vec![len as u8, (len >> 8) as u8, id];
    out.extend_from_slice(payload);
    out
}

pub fn pattern(seed: u8) -> Vec<u8> {
    (0..PAGE_SIZE)
        .map(|idx| (idx as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

/// In-memory storage that records every transfer and can be told to fail.
pub struct RecordingStorage {
    pub data: Cursor<Vec<u8>>,
    pub reads: usize,
    pub writes: usize,
    /// Transfer index (reads and writes counted together) that moves one byte less than asked.
    pub short_at: Option<usize>,
    /// Transfer index that reports a device error.
    pub fail_at: Option<usize>,
    pub busy_polls_per_transfer: u32,
    busy_left: u32,
    pub delays: usize,
    pub issued_while_busy: bool,
}

impl RecordingStorage {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Cursor::new(data),
            reads: 0,
            writes: 0,
            short_at: None,
            fail_at: None,
            busy_polls_per_transfer: 0,
            busy_left: 0,
            delays: 0,
            issued_while_busy: false,
        }
    }

    pub fn transfers(&self) -> usize {
        self.reads + self.writes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data.into_inner()
    }

    fn begin_transfer(&mut self) -> io::Result<Option<usize>> {
        if self.busy_left > 0 {
            self.issued_while_busy = true;
        }
        self.busy_left = self.busy_polls_per_transfer;
        let idx = self.transfers();
        if self.fail_at == Some(idx) {
            return Err(io::Error::new(io::ErrorKind::Other, "card error"));
        }
        Ok((self.short_at == Some(idx)).then_some(idx))
    }
}

impl BlockStorage for RecordingStorage {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let short = self.begin_transfer()?;
        self.reads += 1;
        let want = if short.is_some() {
            buf.len().saturating_sub(1)
        } else {
            buf.len()
        };
        let mut filled = 0;
        while filled < want {
            let n = self.data.read(&mut buf[filled..want])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let short = self.begin_transfer()?;
        self.writes += 1;
        let len = if short.is_some() {
            buf.len().saturating_sub(1)
        } else {
            buf.len()
        };
        self.data.write_all(&buf[..len])?;
        Ok(len)
    }

    fn is_busy(&mut self) -> bool {
        if self.busy_left > 0 {
            self.busy_left -= 1;
            true
        } else {
            false
        }
    }

    fn delay(&mut self, _interval: Duration) {
        self.delays += 1;
    }
}
