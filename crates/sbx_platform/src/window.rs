use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::window::{CursorGrabMode, Fullscreen, Window, WindowAttributes};

pub const WINDOW_PLACEMENT_PATH: &str = "saves/window_placement.json";

const MIN_RESTORED_DIM: u32 = 64;
const MAX_RESTORED_DIM: u32 = 16384;

pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "Render Sandbox".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Windowed-mode position and size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPlacement {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl WindowPlacement {
    /// `None` when the platform does not report an outer position (Wayland).
    pub fn capture(window: &Window) -> Option<Self> {
        let pos = window.outer_position().ok()?;
        let size = window.inner_size();
        Some(Self {
            x: pos.x,
            y: pos.y,
            width: size.width,
            height: size.height,
        })
    }

    fn is_plausible(&self) -> bool {
        (MIN_RESTORED_DIM..=MAX_RESTORED_DIM).contains(&self.width)
            && (MIN_RESTORED_DIM..=MAX_RESTORED_DIM).contains(&self.height)
    }

    pub fn load(path: &Path) -> Option<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => {
                log::info!(
                    "Window placement could not be restored from '{}', using default.",
                    path.display()
                );
                return None;
            }
        };
        match serde_json::from_str::<Self>(&raw) {
            Ok(placement) if placement.is_plausible() => {
                log::info!("Window placement restored from '{}'.", path.display());
                Some(placement)
            }
            Ok(placement) => {
                log::warn!(
                    "Ignoring implausible window placement {}x{} from '{}'.",
                    placement.width,
                    placement.height,
                    path.display()
                );
                None
            }
            Err(e) => {
                log::warn!(
                    "Ignoring corrupt window placement file '{}': {e}",
                    path.display()
                );
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create directory {}: {e}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize window placement: {e}"))?;
        fs::write(path, json)
            .map_err(|e| format!("Failed to write window placement {}: {e}", path.display()))
    }
}

/// Tracks the windowed placement across fullscreen toggles so the window
/// returns to where it was and the right placement is saved on exit.
#[derive(Debug, Default)]
pub struct DisplayState {
    fullscreen: bool,
    windowed: Option<WindowPlacement>,
}

impl DisplayState {
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Borderless fullscreen on the monitor the window is currently on.
    pub fn toggle_fullscreen(&mut self, window: &Window) {
        if self.fullscreen {
            window.set_fullscreen(None);
            if let Some(placement) = self.windowed {
                apply_placement(window, &placement);
            }
            self.fullscreen = false;
        } else {
            self.windowed = WindowPlacement::capture(window);
            window.set_fullscreen(Some(Fullscreen::Borderless(window.current_monitor())));
            self.fullscreen = true;
        }
        log::info!("Fullscreen: {}", if self.fullscreen { "ON" } else { "OFF" });
    }

    /// Placement to persist: the live one in windowed mode, the remembered one
    /// while fullscreen.
    pub fn placement_to_save(&self, window: &Window) -> Option<WindowPlacement> {
        if self.fullscreen {
            self.windowed
        } else {
            WindowPlacement::capture(window)
        }
    }
}

/// Created hidden; the caller shows it once it is positioned.
pub fn create_window(
    event_loop: &ActiveEventLoop,
    config: &PlatformConfig,
    placement: Option<&WindowPlacement>,
) -> Arc<Window> {
    let mut attrs = WindowAttributes::default()
        .with_title(&config.title)
        .with_visible(false);
    attrs = match placement {
        Some(p) => attrs
            .with_inner_size(PhysicalSize::new(p.width, p.height))
            .with_position(PhysicalPosition::new(p.x, p.y)),
        None => attrs.with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height)),
    };

    let window = event_loop
        .create_window(attrs)
        .expect("Failed to create window");
    Arc::new(window)
}

pub fn apply_placement(window: &Window, placement: &WindowPlacement) {
    let _ = window.request_inner_size(PhysicalSize::new(placement.width, placement.height));
    window.set_outer_position(PhysicalPosition::new(placement.x, placement.y));
}

/// Capture the cursor for mouse look. Returns whether the cursor is grabbed.
pub fn set_mouse_look(window: &Window, enabled: bool) -> bool {
    if !enabled {
        let _ = window.set_cursor_grab(CursorGrabMode::None);
        window.set_cursor_visible(true);
        return false;
    }
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    match grabbed {
        Ok(()) => {
            window.set_cursor_visible(false);
            true
        }
        Err(e) => {
            log::warn!("Cursor grab unavailable, mouse look disabled: {e}");
            false
        }
    }
}
