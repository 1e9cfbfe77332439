//! Terminal alert delivery.

use std::io::{self, Write};

use pulsewatch_core::{AlertSink, DeliveryError, Notification};

/// Rings the terminal bell for audible alerts. A terminal has no desktop
/// popups, so desktop delivery reports `Unsupported` and the engine turns
/// that setting off after the first attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalSink;

impl AlertSink for TerminalSink {
    fn show_desktop(&self, _notification: &Notification) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unsupported)
    }

    fn play_sound(&self, _notification: &Notification) -> Result<(), DeliveryError> {
        let mut stderr = io::stderr().lock();
        stderr
            .write_all(b"\x07")
            .and_then(|()| stderr.flush())
            .map_err(|e| DeliveryError::Failed(e.to_string()))
    }
}
