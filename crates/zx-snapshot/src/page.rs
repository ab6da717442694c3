use crate::format::{
    PageId, PageRegion, ATTRIBUTE_COUNT, PAGE_SIZE, PIXEL_COUNT, SCREEN_LEN, SCREEN_PAGE_RAM_LEN,
};
use crate::screen::ScreenDevice;
use crate::{SnapshotSource, SnapshotTarget};

/// Writes a decoded page into the machine. Returns `false` for page ids with no destination.
///
/// `data` may be shorter than a full page; only the bytes present are written.
pub fn restore_page<T: SnapshotTarget + ?Sized>(id: PageId, data: &[u8], target: &mut T) -> bool {
    let data = &data[..data.len().min(PAGE_SIZE)];
    match id.region() {
        Some(PageRegion::Screen) => {
            let (screen, ram_tail) = data.split_at(data.len().min(SCREEN_LEN));
            restore_screen(screen, target.screen_mut());
            if let Some(ram) = target.ram_mut().get_mut(..SCREEN_PAGE_RAM_LEN) {
                copy_into(ram, ram_tail);
            }
            true
        }
        Some(PageRegion::Ram { offset }) => {
            if let Some(ram) = target.ram_mut().get_mut(offset..offset + PAGE_SIZE) {
                copy_into(ram, data);
            }
            true
        }
        None => false,
    }
}

fn restore_screen<V: ScreenDevice + ?Sized>(data: &[u8], screen: &mut V) {
    let (pixels, attributes) = data.split_at(data.len().min(PIXEL_COUNT));
    copy_into(screen.pixels_mut(), pixels);

    for (idx, &attr) in attributes.iter().take(ATTRIBUTE_COUNT).enumerate() {
        let value = screen.from_spectrum_color(attr);
        match screen.attributes_mut().get_mut(idx) {
            Some(slot) => *slot = value,
            None => break,
        }
    }
}

/// Produces the raw 16 KiB image of page `id`, assembling the screen page in `image`. RAM banks
/// borrow straight from the source. Returns `None` for page ids with no source region.
pub fn capture_page<'a, S: SnapshotSource + ?Sized>(
    id: PageId,
    source: &'a S,
    image: &'a mut [u8; PAGE_SIZE],
) -> Option<&'a [u8]> {
    match id.region()? {
        PageRegion::Screen => {
            let screen = source.screen();
            let (pixels, rest) = image.split_at_mut(PIXEL_COUNT);
            let (attributes, ram_tail) = rest.split_at_mut(ATTRIBUTE_COUNT);

            pixels.fill(0);
            copy_into(pixels, screen.pixels());
            attributes.fill(0);
            for (dst, &attr) in attributes.iter_mut().zip(screen.attributes()) {
                *dst = screen.to_spectrum_color(attr);
            }
            ram_tail.fill(0);
            copy_into(ram_tail, source.ram());
            Some(&image[..])
        }
        PageRegion::Ram { offset } => source.ram().get(offset..offset + PAGE_SIZE),
    }
}

fn copy_into(dst: &mut [u8], src: &[u8]) {
    let len = dst.len().min(src.len());
    dst[..len].copy_from_slice(&src[..len]);
}
