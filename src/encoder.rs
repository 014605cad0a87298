//! Module to render text as a QR code image.

use anyhow::{bail, Context};
use image::{GrayImage, Luma};
use log::{trace, warn};
use qrcode::{Color, QrCode};

/// Width of the blank margin around the code, in modules.
const QUIET_ZONE: usize = 4;

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

/// Renders the given text as a square QR code of `pixel_size` × `pixel_size`
/// pixels.
///
/// Returns `None` if the text can't be encoded, e.g. when it exceeds the
/// capacity of the largest QR code.
pub fn encode(text: &str, pixel_size: u32) -> Option<GrayImage> {
    match try_encode(text, pixel_size) {
        Ok(image) => Some(image),
        Err(e) => {
            warn!("Failed to encode QR code: {e:?}");
            None
        }
    }
}

/// Same as [`encode`], but returns the reason of a failure.
pub fn try_encode(text: &str, pixel_size: u32) -> anyhow::Result<GrayImage> {
    if pixel_size == 0 {
        bail!("Cannot render a QR code of zero pixels");
    }
    let code = QrCode::new(text.as_bytes())
        .with_context(|| format!("QR code rejected a text of {} bytes", text.len()))?;

    let width = code.width();
    let colors = code.to_colors();
    let modules = width + 2 * QUIET_ZONE;
    trace!("QR code has {width}x{width} modules, rendering to {pixel_size}px");

    // Nearest-module sampling, so that the image has exactly the requested size.
    let module_at = |pixel: u32| pixel as usize * modules / pixel_size as usize;
    let image = GrayImage::from_fn(pixel_size, pixel_size, |x, y| {
        let (mx, my) = (module_at(x), module_at(y));
        let inside = QUIET_ZONE..QUIET_ZONE + width;
        if inside.contains(&mx) && inside.contains(&my) {
            match colors[(my - QUIET_ZONE) * width + (mx - QUIET_ZONE)] {
                Color::Dark => DARK,
                Color::Light => LIGHT,
            }
        } else {
            LIGHT
        }
    });
    Ok(image)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn image_has_requested_size() {
        for size in [1, 37, 100, 750] {
            let image = encode("52.5014787, 13.4358693 1461400000000 +2", size).unwrap();
            assert_eq!(image.dimensions(), (size, size));
        }
    }

    #[test]
    fn image_has_quiet_zone_and_finder_pattern() {
        let code = QrCode::new(b"hello").unwrap();
        let modules = (code.width() + 2 * QUIET_ZONE) as u32;
        // One module = 10 pixels.
        let image = encode("hello", modules * 10).unwrap();

        // Corners are in the quiet zone.
        assert_eq!(*image.get_pixel(0, 0), LIGHT);
        assert_eq!(*image.get_pixel(modules * 10 - 1, modules * 10 - 1), LIGHT);
        // Top-left module of the code belongs to a finder pattern, hence dark.
        let start = QUIET_ZONE as u32 * 10;
        assert_eq!(*image.get_pixel(start, start), DARK);
        assert_eq!(*image.get_pixel(start + 9, start + 9), DARK);
        // Just before it is the quiet zone.
        assert_eq!(*image.get_pixel(start - 1, start), LIGHT);
    }

    #[test]
    fn zero_size_is_rejected() {
        assert!(encode("hello", 0).is_none());
    }

    #[test]
    fn text_too_long_is_rejected() {
        let text = "x".repeat(8000);
        assert!(encode(&text, 100).is_none());
        assert!(try_encode(&text, 100).is_err());
    }
}
