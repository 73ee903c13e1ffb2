pub mod debug_overlay;

pub use debug_overlay::{CameraStats, DebugOverlay, OverlayActions, OverlayStats, ResourceLine};
