//! Display surface showing the latest QR code and its summary.
//!
//! The label is printed on the terminal, and the QR code is written to a PNG
//! file that any image viewer can watch.

use super::layout::Layout;
use super::util::{warn_on_error, write_png};
use super::{RenderedResult, UiMessage};
use crate::config::NO_LOCATION_YET;
use futures::channel::oneshot;
use image::GrayImage;
use log::{debug, error, info, trace};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

/// Window state on the UI thread.
pub struct Window<W> {
    ui_rx: Receiver<UiMessage>,
    cancel_tx: oneshot::Sender<()>,
    layout: Layout,
    /// Where the QR code is written.
    output: PathBuf,
    /// Where the label is printed.
    terminal: W,
    /// Stop after this many updates.
    max_updates: Option<usize>,
    label: String,
    image: Option<GrayImage>,
    iteration: usize,
}

impl Window<std::io::Stdout> {
    /// Runs the UI loop, in the UI thread, printing to the standard output.
    ///
    /// The loop ends when the background thread hangs up, or after
    /// `max_updates` updates.
    pub fn ui_loop(
        ui_rx: Receiver<UiMessage>,
        cancel_tx: oneshot::Sender<()>,
        layout: Layout,
        output: &Path,
        max_updates: Option<usize>,
    ) -> anyhow::Result<()> {
        let window = Window::new(
            ui_rx,
            cancel_tx,
            layout,
            output,
            std::io::stdout(),
            max_updates,
        );
        window.do_loop()
    }
}

impl<W: Write> Window<W> {
    /// Creates a new window state.
    fn new(
        ui_rx: Receiver<UiMessage>,
        cancel_tx: oneshot::Sender<()>,
        layout: Layout,
        output: &Path,
        terminal: W,
        max_updates: Option<usize>,
    ) -> Self {
        Self {
            ui_rx,
            cancel_tx,
            layout,
            output: output.to_owned(),
            terminal,
            max_updates,
            label: NO_LOCATION_YET.to_owned(),
            image: None,
            iteration: 0,
        }
    }

    /// Runs the UI loop using the given window state.
    fn do_loop(mut self) -> anyhow::Result<()> {
        let [x, y, side, _] = self.layout.image_rect;
        info!(
            "Showing {side}x{side} QR code at ({x}, {y}), written to {}",
            self.output.display()
        );
        debug!("Label occupies {:?}", self.layout.label_rect);
        self.render_label()?;

        while let Ok(msg) = self.ui_rx.recv() {
            self.iteration += 1;
            self.process_update(msg);
            self.render_label()?;

            if self.max_updates.is_some_and(|max| self.iteration >= max) {
                info!("Reached {} updates", self.iteration);
                break;
            }
        }

        info!("End of window loop");
        warn_on_error(self.cancel_tx.send(()), "message on one-shot channel");
        Ok(())
    }

    /// Processes a message from the background thread.
    fn process_update(&mut self, msg: UiMessage) {
        match msg {
            UiMessage::Status(status) => {
                debug!("[{i}] Status: {status}", i = self.iteration);
                self.label = status;
            }
            UiMessage::Code(RenderedResult {
                image,
                display_text,
            }) => {
                debug!("[{i}] Received QR code", i = self.iteration);
                self.label = display_text;
                self.image = image;
                self.render_image();
            }
        }
    }

    /// Writes the current QR code to the output file, or removes a stale one.
    fn render_image(&self) {
        match &self.image {
            Some(image) => {
                trace!("[{i}] Writing {}", self.output.display(), i = self.iteration);
                if let Err(e) = write_png(image, &self.output) {
                    error!("Failed to render QR code: {e:?}");
                }
            }
            None => {
                if self.output.exists() {
                    if let Err(e) = std::fs::remove_file(&self.output) {
                        error!("Failed to remove stale QR code: {e:?}");
                    }
                }
            }
        }
    }

    /// Prints the label, up to [`Layout::LABEL_LINES`] lines.
    fn render_label(&mut self) -> anyhow::Result<()> {
        for line in self.label.lines().take(Layout::LABEL_LINES) {
            writeln!(self.terminal, "{line}")?;
        }
        writeln!(self.terminal)?;
        self.terminal.flush()?;
        Ok(())
    }
}
