/// Bytes in the fixed header, through the program counter.
pub const HEADER_LEN: usize = 34;
/// Extended header length of the 48K-only variant. The field counts the program counter, so
/// `EXTENDED_HEADER_LEN - 2` further bytes follow [`HEADER_LEN`].
pub const EXTENDED_HEADER_LEN: u16 = 54;
pub const EXTENDED_BLOCK_TAIL_LEN: usize = EXTENDED_HEADER_LEN as usize - 2;

pub const PAGE_SIZE: usize = 0x4000;
/// Page length sentinel for a raw (uncompressed) 16 KiB payload.
pub const RAW_PAGE_LEN: u16 = 0xFFFF;
pub const PAGE_HEADER_LEN: usize = 3;

pub const PIXEL_COUNT: usize = 6144;
pub const ATTRIBUTE_COUNT: usize = 768;
pub const SCREEN_LEN: usize = PIXEL_COUNT + ATTRIBUTE_COUNT;

/// Address of the first machine RAM byte that is not screen memory.
pub const RAM_BASE: usize = 0x5B00;
pub const RAM_LEN: usize = 0x1_0000 - RAM_BASE;
/// Bytes of the screen page that belong to general RAM (`0x5B00..0x8000`).
pub const SCREEN_PAGE_RAM_LEN: usize = PAGE_SIZE - SCREEN_LEN;

/// Marks the end of a compressed stream regardless of its declared length.
pub const RLE_TERMINATOR: [u8; 4] = [0x00, 0xED, 0xED, 0x00];
pub const RLE_ESCAPE: u8 = 0xED;

/// Where a page lands in the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRegion {
    /// Pixels, attributes, then RAM from `0x5B00`.
    Screen,
    /// A 16 KiB bank starting at `offset` within the machine RAM slice.
    Ram { offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId(pub u8);

impl PageId {
    /// `0x4000..0x8000`: screen memory plus the start of general RAM.
    pub const SCREEN: PageId = PageId(8);
    /// `0x8000..0xC000`.
    pub const LOW_RAM: PageId = PageId(4);
    /// `0xC000..0x10000`.
    pub const HIGH_RAM: PageId = PageId(5);

    /// Order in which pages are written on save.
    pub const SAVE_ORDER: [PageId; 3] = [PageId::SCREEN, PageId::LOW_RAM, PageId::HIGH_RAM];

    pub fn name(self) -> Option<&'static str> {
        match self {
            PageId::SCREEN => Some("SCREEN"),
            PageId::LOW_RAM => Some("LOW_RAM"),
            PageId::HIGH_RAM => Some("HIGH_RAM"),
            _ => None,
        }
    }

    pub fn region(self) -> Option<PageRegion> {
        match self {
            PageId::SCREEN => Some(PageRegion::Screen),
            PageId::LOW_RAM => Some(PageRegion::Ram {
                offset: 0x8000 - RAM_BASE,
            }),
            PageId::HIGH_RAM => Some(PageRegion::Ram {
                offset: 0xC000 - RAM_BASE,
            }),
            _ => None,
        }
    }
}

impl core::fmt::Display for PageId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(name) = self.name() {
            write!(f, "{name}({})", self.0)
        } else {
            write!(f, "PageId({})", self.0)
        }
    }
}

/// Length-prefixed page record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub stored_len: u16,
    pub id: PageId,
}

impl PageHeader {
    pub fn raw(id: PageId) -> Self {
        Self {
            stored_len: RAW_PAGE_LEN,
            id,
        }
    }

    pub fn from_bytes(bytes: [u8; PAGE_HEADER_LEN]) -> Self {
        Self {
            stored_len: u16::from_le_bytes([bytes[0], bytes[1]]),
            id: PageId(bytes[2]),
        }
    }

    pub fn to_bytes(self) -> [u8; PAGE_HEADER_LEN] {
        let [lo, hi] = self.stored_len.to_le_bytes();
        [lo, hi, self.id.0]
    }

    pub fn is_compressed(self) -> bool {
        self.stored_len != RAW_PAGE_LEN
    }

    /// Bytes of payload that follow this header on the wire.
    pub fn payload_len(self) -> usize {
        if self.is_compressed() {
            self.stored_len as usize
        } else {
            PAGE_SIZE
        }
    }
}
