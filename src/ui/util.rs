//! Module containing various UI utilities.

use anyhow::Context;
use image::{GrayImage, ImageFormat};
use log::warn;
use std::path::Path;

/// Writes an image in PNG format, replacing the file atomically so that a
/// viewer never sees a partial image.
pub fn write_png(image: &GrayImage, path: &Path) -> anyhow::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    image
        .save_with_format(&tmp, ImageFormat::Png)
        .with_context(|| format!("Failed to write PNG image to {}", path.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move PNG image to {}", path.display()))?;
    Ok(())
}

/// Prints a warning message based on the error if the given result is not OK.
pub fn warn_on_error<E: std::fmt::Debug>(x: Result<(), E>, msg: &str) {
    match x {
        Ok(()) => {}
        Err(e) => warn!("Failed to send {}: {:?}", msg, e),
    }
}
