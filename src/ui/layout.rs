//! Placement of the QR code and the label within the viewport.

use anyhow::{bail, Context};
use std::str::FromStr;

/// Size of the display area, in logical points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl FromStr for Viewport {
    type Err = anyhow::Error;

    /// Parses a viewport written as `<width>x<height>`, e.g. `375x667`.
    fn from_str(s: &str) -> anyhow::Result<Self> {
        let (width, height) = s
            .split_once(['x', 'X'])
            .with_context(|| format!("Expected <width>x<height>, found `{s}`"))?;
        let width: f64 = width
            .trim()
            .parse()
            .with_context(|| format!("Invalid viewport width: `{width}`"))?;
        let height: f64 = height
            .trim()
            .parse()
            .with_context(|| format!("Invalid viewport height: `{height}`"))?;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            bail!("Viewport must have a positive size, found `{s}`");
        }
        Ok(Self { width, height })
    }
}

/// Rectangles occupied by the UI elements, as (left, top, width, height).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layout {
    /// The QR code, a square centered in the viewport.
    pub image_rect: [f64; 4],
    /// The label at the top of the viewport.
    pub label_rect: [f64; 4],
}

impl Layout {
    /// Horizontal margin around the label.
    const LABEL_MARGIN: f64 = 10.0;
    /// Distance from the top of the viewport to the label.
    const LABEL_TOP: f64 = 40.0;
    /// Height of one line of the label.
    const LINE_HEIGHT: f64 = 25.0;
    /// Maximum number of lines of the label.
    pub const LABEL_LINES: usize = 3;
    /// Largest side of the QR code, in device pixels.
    pub const MAX_PIXEL_SIZE: u32 = 4096;

    /// Lays out the UI elements in the given viewport.
    pub fn new(viewport: Viewport) -> Self {
        let side = viewport.width.min(viewport.height);
        Self {
            image_rect: [
                (viewport.width - side) / 2.0,
                (viewport.height - side) / 2.0,
                side,
                side,
            ],
            label_rect: [
                Self::LABEL_MARGIN,
                Self::LABEL_TOP,
                (viewport.width - 2.0 * Self::LABEL_MARGIN).max(0.0),
                Self::LINE_HEIGHT * Self::LABEL_LINES as f64,
            ],
        }
    }

    /// Side of the QR code, in logical points.
    pub fn image_side(&self) -> f64 {
        self.image_rect[2]
    }

    /// Side of the QR code in device pixels, for the given display scale
    /// factor, at most [`Self::MAX_PIXEL_SIZE`].
    pub fn pixel_size(&self, scale: f64) -> u32 {
        (self.image_side() * scale)
            .round()
            .min(Self::MAX_PIXEL_SIZE as f64) as u32
    }
}
