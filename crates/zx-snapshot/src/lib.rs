//! Reader and writer for 48K `.z80` snapshots.
//!
//! A snapshot is a fixed register header followed by length-prefixed 16 KiB memory pages, each
//! stored raw or run-length compressed. Loading streams pages through two caller-owned 16 KiB
//! buffers into a [`SnapshotTarget`]; saving reads a [`SnapshotSource`] and writes the same layout.
//! All transfers go through a [`BlockStorage`] in bounded chunks, waiting for the device to go idle
//! after each one.

mod error;
mod format;
mod header;
mod io;
mod page;
pub mod rle;
mod screen;
mod storage;
mod types;

pub use crate::error::{Result, SnapshotError};
pub use crate::format::{
    PageHeader, PageId, PageRegion, ATTRIBUTE_COUNT, EXTENDED_BLOCK_TAIL_LEN, EXTENDED_HEADER_LEN,
    HEADER_LEN, PAGE_HEADER_LEN, PAGE_SIZE, PIXEL_COUNT, RAM_BASE, RAM_LEN, RAW_PAGE_LEN,
    SCREEN_LEN, SCREEN_PAGE_RAM_LEN,
};
pub use crate::header::Z80Header;
pub use crate::page::{capture_page, restore_page};
pub use crate::screen::ScreenDevice;
pub use crate::storage::{BlockStorage, StreamStorage};
pub use crate::types::CpuState;

use std::io::Cursor;
use std::time::Duration;

use tracing::{debug, warn};

use crate::storage::{read_chunked, read_chunks, read_page_header, skip_chunked, write_chunked};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Rle,
}

#[derive(Debug, Clone, Copy)]
pub struct SnapshotOptions {
    /// Largest single storage transfer, in bytes.
    pub transfer_unit: usize,
    /// How long to wait between device-busy polls.
    pub busy_poll_interval: Duration,
    /// Page encoding used on save. Loading accepts both.
    pub compression: Compression,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            transfer_unit: 512,
            busy_poll_interval: Duration::from_millis(10),
            compression: Compression::None,
        }
    }
}

impl SnapshotOptions {
    fn validate(&self) -> Result<()> {
        if self.transfer_unit == 0 {
            return Err(SnapshotError::InvalidOptions("transfer unit must be non-zero"));
        }
        Ok(())
    }
}

pub trait SnapshotSource {
    type Screen: ScreenDevice;

    fn cpu_state(&self) -> CpuState;
    fn screen(&self) -> &Self::Screen;

    /// Machine RAM from `0x5B00` to the top of memory ([`RAM_LEN`] bytes).
    fn ram(&self) -> &[u8];
}

pub trait SnapshotTarget {
    type Screen: ScreenDevice;

    fn restore_cpu_state(&mut self, state: CpuState);
    fn screen_mut(&mut self) -> &mut Self::Screen;

    /// Machine RAM from `0x5B00` to the top of memory ([`RAM_LEN`] bytes).
    fn ram_mut(&mut self) -> &mut [u8];
}

/// Header and page table of a snapshot, as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub header: Z80Header,
    pub pages: Vec<PageHeader>,
}

pub fn load_snapshot<S: BlockStorage + ?Sized, T: SnapshotTarget + ?Sized>(
    storage: &mut S,
    target: &mut T,
    options: &SnapshotOptions,
    page_buf: &mut [u8; PAGE_SIZE],
    image_buf: &mut [u8; PAGE_SIZE],
) -> Result<()> {
    options.validate()?;
    let found = target.ram_mut().len();
    if found != RAM_LEN {
        return Err(SnapshotError::RamLenMismatch {
            expected: RAM_LEN,
            found,
        });
    }

    let header = read_header(storage, options, page_buf)?;
    target.restore_cpu_state(header.cpu_state());
    target
        .screen_mut()
        .set_border_color(header.border_color());
    debug!(pc = header.pc, border = header.border_color(), "restored cpu state");

    while let Some(page) = read_page_header(storage, options)? {
        let len = page.payload_len();
        if page.id.region().is_none() {
            warn!(page = %page.id, len, "skipping unknown page");
            skip_chunked(storage, len, &mut page_buf[..], options)?;
            continue;
        }

        // Compressed payloads may exceed a page; the decoder caps output at PAGE_SIZE.
        let mut decoder = rle::Decoder::new(&mut image_buf[..], page.is_compressed(), None);
        read_chunks(storage, len, &mut page_buf[..], options, |piece| decoder.feed(piece))?;
        let decoded = decoder.finish();
        restore_page(page.id, &image_buf[..decoded], target);
        debug!(
            page = %page.id,
            stored_len = page.stored_len,
            compressed = page.is_compressed(),
            decoded,
            "restored page"
        );
    }
    Ok(())
}

pub fn save_snapshot<S: BlockStorage + ?Sized, Src: SnapshotSource + ?Sized>(
    storage: &mut S,
    source: &Src,
    options: &SnapshotOptions,
    page_buf: &mut [u8; PAGE_SIZE],
    image_buf: &mut [u8; PAGE_SIZE],
) -> Result<()> {
    options.validate()?;
    let found = source.ram().len();
    if found != RAM_LEN {
        return Err(SnapshotError::RamLenMismatch {
            expected: RAM_LEN,
            found,
        });
    }

    let header = Z80Header::pack(&source.cpu_state(), source.screen().border_color());
    let header_bytes = &mut page_buf[..HEADER_LEN + EXTENDED_BLOCK_TAIL_LEN];
    header_bytes.fill(0);
    header.encode(&mut Cursor::new(&mut header_bytes[..HEADER_LEN]))?;
    write_chunked(storage, header_bytes, options)?;

    for id in PageId::SAVE_ORDER {
        let data = capture_page(id, source, image_buf).ok_or(SnapshotError::RamLenMismatch {
            expected: RAM_LEN,
            found,
        })?;
        write_page(storage, id, data, options, page_buf)?;
    }
    Ok(())
}

fn write_page<S: BlockStorage + ?Sized>(
    storage: &mut S,
    id: PageId,
    data: &[u8],
    options: &SnapshotOptions,
    encode_buf: &mut [u8; PAGE_SIZE],
) -> Result<()> {
    let encoded_len = match options.compression {
        Compression::None => None,
        // Fall back to a raw page when RLE does not shrink it below the sentinel length.
        Compression::Rle => rle::encode(data, &mut encode_buf[..])
            .ok()
            .filter(|&len| len < PAGE_SIZE),
    };

    let (header, payload) = match encoded_len {
        Some(len) => (
            PageHeader {
                stored_len: len as u16,
                id,
            },
            &encode_buf[..len],
        ),
        None => (PageHeader::raw(id), data),
    };

    write_chunked(storage, &header.to_bytes(), options)?;
    write_chunked(storage, payload, options)?;
    debug!(
        page = %id,
        stored_len = header.stored_len,
        compressed = header.is_compressed(),
        "saved page"
    );
    Ok(())
}

/// Reads only the screen page and hands it to [`ScreenDevice::show_screenshot`], leaving the
/// emulated machine untouched. Stops after the screen page; returns `false` if the page list ended
/// without one.
pub fn load_screen_from_snapshot<S: BlockStorage + ?Sized, V: ScreenDevice + ?Sized>(
    storage: &mut S,
    screen: &mut V,
    options: &SnapshotOptions,
    buf: &mut [u8; PAGE_SIZE],
) -> Result<bool> {
    options.validate()?;
    read_header(storage, options, buf)?;

    while let Some(page) = read_page_header(storage, options)? {
        if page.id != PageId::SCREEN {
            skip_chunked(storage, page.payload_len(), &mut buf[..], options)?;
            continue;
        }

        let (output, scratch) = buf.split_at_mut(SCREEN_LEN);
        let mut decoder = rle::Decoder::new(output, page.is_compressed(), Some(SCREEN_LEN));
        read_chunks(storage, page.payload_len(), scratch, options, |piece| decoder.feed(piece))?;
        let decoded = decoder.finish();
        screen.show_screenshot(&buf[..decoded]);
        debug!(stored_len = page.stored_len, decoded, "showed snapshot screen");
        return Ok(true);
    }
    Ok(false)
}

/// Reads a bare [`SCREEN_LEN`]-byte screen image (no header, no paging) and shows it.
pub fn load_screenshot<S: BlockStorage + ?Sized, V: ScreenDevice + ?Sized>(
    storage: &mut S,
    screen: &mut V,
    options: &SnapshotOptions,
    buf: &mut [u8; PAGE_SIZE],
) -> Result<()> {
    options.validate()?;
    let image = &mut buf[..SCREEN_LEN];
    read_chunked(storage, image, options)?;
    screen.show_screenshot(image);
    Ok(())
}

/// Reads the header and page table without decoding any page.
pub fn inspect_snapshot<S: BlockStorage + ?Sized>(
    storage: &mut S,
    options: &SnapshotOptions,
    buf: &mut [u8; PAGE_SIZE],
) -> Result<SnapshotInfo> {
    options.validate()?;
    let header = read_header(storage, options, buf)?;
    let mut pages = Vec::new();
    while let Some(page) = read_page_header(storage, options)? {
        skip_chunked(storage, page.payload_len(), &mut buf[..], options)?;
        pages.push(page);
    }
    Ok(SnapshotInfo { header, pages })
}

/// Reads and validates the fixed header, then consumes the rest of the extended block.
fn read_header<S: BlockStorage + ?Sized>(
    storage: &mut S,
    options: &SnapshotOptions,
    buf: &mut [u8; PAGE_SIZE],
) -> Result<Z80Header> {
    let raw = &mut buf[..HEADER_LEN];
    read_chunked(storage, raw, options)?;
    let header = Z80Header::decode(&mut Cursor::new(&raw[..]))?;
    header.validate()?;
    read_chunked(storage, &mut buf[..EXTENDED_BLOCK_TAIL_LEN], options)?;
    Ok(header)
}
