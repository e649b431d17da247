/*!
PNG export of the PPU video output (feature `screenshot`).

The PPU writes 0xAARRGGBB pixels, 256 per row, into the host buffer handed
to `Ppu::attach_video_output`. This module converts that buffer into an
`image::RgbaImage` and writes it out as PNG.
*/

use std::fmt;
use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::ppu::{NES_HEIGHT, NES_WIDTH, Ppu};

#[derive(Debug)]
pub enum ScreenshotError {
    /// The PPU has no video buffer attached.
    NoVideoOutput,
    Image(image::ImageError),
}

impl fmt::Display for ScreenshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenshotError::NoVideoOutput => write!(f, "no video output attached to the PPU"),
            ScreenshotError::Image(e) => write!(f, "image encoding failed: {e}"),
        }
    }
}

impl std::error::Error for ScreenshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScreenshotError::Image(e) => Some(e),
            ScreenshotError::NoVideoOutput => None,
        }
    }
}

impl From<image::ImageError> for ScreenshotError {
    fn from(e: image::ImageError) -> Self {
        ScreenshotError::Image(e)
    }
}

/// Convert ARGB pixels (256 per row) to an RGBA image. Partial trailing
/// rows are dropped and at most 240 rows are used.
pub fn frame_to_image(pixels: &[u32]) -> RgbaImage {
    let rows = (pixels.len() / NES_WIDTH).min(NES_HEIGHT);
    RgbaImage::from_fn(NES_WIDTH as u32, rows as u32, |x, y| {
        let argb = pixels[y as usize * NES_WIDTH + x as usize];
        let [a, r, g, b] = argb.to_be_bytes();
        Rgba([r, g, b, a])
    })
}

/// Write the PPU's current video output to `path` as PNG.
pub fn save_png<P: AsRef<Path>>(ppu: &Ppu, path: P) -> Result<(), ScreenshotError> {
    let pixels = ppu.video_output().ok_or(ScreenshotError::NoVideoOutput)?;
    frame_to_image(pixels).save(path.as_ref())?;
    log::info!("screenshot written to {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_argb_to_rgba() {
        let mut pixels = vec![0xFF000000u32; NES_WIDTH * 2];
        pixels[NES_WIDTH + 3] = 0xFF102030;
        let img = frame_to_image(&pixels);
        assert_eq!(img.dimensions(), (256, 2));
        assert_eq!(img.get_pixel(3, 1), &Rgba([0x10, 0x20, 0x30, 0xFF]));
        assert_eq!(img.get_pixel(0, 0), &Rgba([0, 0, 0, 0xFF]));
    }

    #[test]
    fn missing_video_output_is_an_error() {
        let ppu = Ppu::new();
        assert!(matches!(
            save_png(&ppu, "unused.png"),
            Err(ScreenshotError::NoVideoOutput)
        ));
    }
}
