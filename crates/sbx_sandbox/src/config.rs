use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use sbx_platform::window::PlatformConfig;

pub const CONFIG_PATH: &str = "assets/config.json";

/// Startup settings. Every field is optional in the file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SandboxConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_true")]
    pub vsync: bool,
    #[serde(default = "default_fov_deg")]
    pub fov_deg: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    /// World units per second.
    #[serde(default = "default_camera_speed")]
    pub camera_speed: f32,
    /// Radians per pixel of mouse motion.
    #[serde(default = "default_mouse_sensitivity")]
    pub mouse_sensitivity: f32,
    #[serde(default = "default_scene_path")]
    pub scene_path: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            width: default_width(),
            height: default_height(),
            vsync: default_true(),
            fov_deg: default_fov_deg(),
            near: default_near(),
            far: default_far(),
            camera_speed: default_camera_speed(),
            mouse_sensitivity: default_mouse_sensitivity(),
            scene_path: default_scene_path(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl SandboxConfig {
    /// Never fails: a missing or broken file yields the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::warn!(
                "Config file '{}' not found, using defaults",
                path.display()
            );
            return Self::default();
        }
        match load_config_from_path(path) {
            Ok(config) => {
                log::info!("Loaded config from '{}'", path.display());
                config
            }
            Err(err) => {
                log::error!("{err}; using defaults");
                Self::default()
            }
        }
    }

    pub fn platform(&self) -> PlatformConfig {
        PlatformConfig {
            title: self.title.clone(),
            width: self.width,
            height: self.height,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

pub fn load_config_from_path(path: &Path) -> Result<SandboxConfig, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;
    let config: SandboxConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse config JSON {}: {e}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &SandboxConfig) -> Result<(), String> {
    if config.width == 0 || config.height == 0 {
        return Err(format!(
            "Config validation failed: window size {}x{} is empty",
            config.width, config.height
        ));
    }
    if !(1.0..=179.0).contains(&config.fov_deg) {
        return Err(format!(
            "Config validation failed: fov_deg {} outside 1..179",
            config.fov_deg
        ));
    }
    if !(config.near > 0.0 && config.far > config.near) {
        return Err(format!(
            "Config validation failed: need 0 < near < far, got near {} far {}",
            config.near, config.far
        ));
    }
    if config.camera_speed <= 0.0 || config.mouse_sensitivity <= 0.0 {
        return Err(
            "Config validation failed: camera_speed and mouse_sensitivity must be positive"
                .to_string(),
        );
    }
    Ok(())
}

fn default_title() -> String {
    "Render Sandbox".to_string()
}

const fn default_width() -> u32 {
    1280
}

const fn default_height() -> u32 {
    720
}

const fn default_true() -> bool {
    true
}

const fn default_fov_deg() -> f32 {
    70.0
}

const fn default_near() -> f32 {
    0.0625
}

const fn default_far() -> f32 {
    1024.0
}

const fn default_camera_speed() -> f32 {
    4.0
}

const fn default_mouse_sensitivity() -> f32 {
    0.0025
}

fn default_scene_path() -> String {
    "assets/scenes/sandbox.json".to_string()
}

const fn default_poll_interval_ms() -> u64 {
    250
}
