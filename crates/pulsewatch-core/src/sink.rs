// ── Side-effect delivery ──
//
// Desktop popups and audible cues for newly stored notifications. The
// engine calls the sink after a notification is admitted; delivery never
// affects whether the in-app notification exists.

use thiserror::Error;

use crate::model::Notification;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The platform has no way to show this kind of alert.
    #[error("delivery is not supported on this platform")]
    Unsupported,

    #[error("permission to deliver alerts was denied")]
    PermissionDenied,

    #[error("delivery failed: {0}")]
    Failed(String),
}

impl DeliveryError {
    /// Errors that will not go away by retrying; the engine reacts by
    /// switching the corresponding setting off.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Unsupported | Self::PermissionDenied)
    }
}

/// Outbound alert channel, gated by the sound and desktop settings.
pub trait AlertSink: Send + Sync {
    fn show_desktop(&self, notification: &Notification) -> Result<(), DeliveryError>;

    fn play_sound(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Sink that delivers nothing. Desktop delivery reports `Unsupported`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AlertSink for NullSink {
    fn show_desktop(&self, _notification: &Notification) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unsupported)
    }

    fn play_sound(&self, _notification: &Notification) -> Result<(), DeliveryError> {
        Ok(())
    }
}
