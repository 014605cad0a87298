//! Module to display the QR code and its summary on the user interface.

pub mod layout;
pub mod util;
pub mod window;

use image::GrayImage;

/// Image and text produced from one location sample.
#[derive(Clone, Debug)]
pub struct RenderedResult {
    /// Square QR code, or `None` if the payload couldn't be encoded.
    pub image: Option<GrayImage>,
    /// Human-readable summary of the sample.
    pub display_text: String,
}

/// Message sent from the background thread to the UI.
#[derive(Clone, Debug)]
pub enum UiMessage {
    /// Status text to show instead of the summary, leaving the image as is.
    Status(String),
    /// A freshly rendered QR code.
    Code(RenderedResult),
}
