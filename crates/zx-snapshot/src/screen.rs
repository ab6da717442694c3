/// Video collaborator holding the emulated display.
///
/// Attributes are kept in a device-specific encoding; snapshots store them in the Spectrum's own
/// `FLASH BRIGHT PAPER INK` byte format and convert through [`ScreenDevice::to_spectrum_color`] and
/// [`ScreenDevice::from_spectrum_color`].
pub trait ScreenDevice {
    type Attribute: Copy;

    /// Pixel bytes in Spectrum memory order, `PIXEL_COUNT` long.
    fn pixels(&self) -> &[u8];
    fn pixels_mut(&mut self) -> &mut [u8];

    /// `ATTRIBUTE_COUNT` attribute cells.
    fn attributes(&self) -> &[Self::Attribute];
    fn attributes_mut(&mut self) -> &mut [Self::Attribute];

    fn to_spectrum_color(&self, attribute: Self::Attribute) -> u8;
    fn from_spectrum_color(&self, attribute: u8) -> Self::Attribute;

    /// Border color as a 3-bit Spectrum color.
    fn border_color(&self) -> u8;
    fn set_border_color(&mut self, color: u8);

    /// Displays a Spectrum-format screen image (pixels then attributes) without touching the
    /// emulated screen buffers.
    fn show_screenshot(&mut self, screen: &[u8]);
}
