use std::time::Duration;

/// Worker back-off between queue drains while the pipeline is idle or the
/// queue comes up empty.
pub const IDLE_BACKOFF: Duration = Duration::from_millis(100);

/// Overlay color for face boxes and labels (RGB green).
pub const OVERLAY_COLOR: [u8; 3] = [0, 255, 0];

/// Box outline thickness in pixels.
pub const OVERLAY_THICKNESS: u32 = 2;

/// Vertical gap between a face box and its label baseline, in pixels.
pub const LABEL_MARGIN: u32 = 10;
