//! Tunable configuration for the drift controller.
//!
//! Every numeric constant the controller uses lives here. Defaults carry the
//! reference values the scene was tuned with; a JSON file can override any
//! subset of them (missing fields keep their defaults).
//!
//! ```ignore
//! let config = DriftConfig::load("assets/drift.json")?;
//! app.add_plugins(DriftPhysicsPlugin::new(config));
//! ```

use std::fs;
use std::path::Path;

use bevy::math::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Errors that can occur while loading a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// File system error
    Io(std::io::Error),
    /// Malformed JSON
    Json(serde_json::Error),
    /// Parsed but out of range
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Json(e) => write!(f, "JSON error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// How the pointer pushes bodies around in Float mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushVariant {
    /// Push every body under the cursor, every frame.
    #[default]
    ContinuousHover,
    /// Push the closest body under the pointer once per click or tap.
    DiscreteClick,
}

impl PushVariant {
    pub fn toggled(self) -> Self {
        match self {
            PushVariant::ContinuousHover => PushVariant::DiscreteClick,
            PushVariant::DiscreteClick => PushVariant::ContinuousHover,
        }
    }
}

/// Feature switches covering the incremental variants of the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Step rapier. When off, the controller integrates bodies itself.
    pub use_physics_engine: bool,
    /// Build the ground platform in GravityPlatform mode.
    pub enable_platform: bool,
    /// Allow grab / drag / throw in GravityPlatform mode.
    pub enable_grab: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            use_physics_engine: true,
            enable_platform: true,
            enable_grab: true,
        }
    }
}

/// Per-body physical properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Number of clones spawned when the model is ready
    pub count: usize,
    /// Collision box half-extents
    pub half_extents: [f32; 3],
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Spawn positions are uniform in `[-spawn_half_size, spawn_half_size]`
    pub spawn_half_size: [f32; 2],
    /// Float mode kick-off velocity is uniform in `[-initial_speed, initial_speed]` per axis
    pub initial_speed: f32,
}

impl BodyConfig {
    pub fn half_extents(&self) -> Vec3 {
        Vec3::from_array(self.half_extents)
    }

    pub fn spawn_half_size(&self) -> Vec2 {
        Vec2::from_array(self.spawn_half_size)
    }
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            count: 5,
            half_extents: [0.8; 3],
            mass: 1.0,
            linear_damping: 0.2,
            angular_damping: 0.4,
            spawn_half_size: [3.0, 2.0],
            initial_speed: 0.25,
        }
    }
}

/// Parameters of the zero-gravity drift field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloatFieldConfig {
    pub base_force: f32,
    pub wave_amplitude: f32,
    pub wave_frequency: f32,
    pub rotation_speed: f32,
    pub max_velocity: f32,
    /// Distance from the boundary where bodies start getting turned around
    pub boundary_margin: f32,
    /// Minimum inward speed inside the margin band
    pub boundary_push_speed: f32,
}

impl Default for FloatFieldConfig {
    fn default() -> Self {
        Self {
            base_force: 0.02,
            wave_amplitude: 0.01,
            wave_frequency: 0.002,
            rotation_speed: 0.5,
            max_velocity: 2.0,
            boundary_margin: 1.0,
            boundary_push_speed: 0.5,
        }
    }
}

/// Release behaviour of a grab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrowConfig {
    /// Converts the drag estimate (units/ms) into units/s
    pub scale: f32,
    pub max_speed: f32,
    pub spin_factor: f32,
    pub max_spin: f32,
}

impl Default for ThrowConfig {
    fn default() -> Self {
        Self {
            scale: 800.0,
            max_speed: 8.0,
            spin_factor: 0.6,
            max_spin: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub strength: f32,
    pub torque_strength: f32,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            strength: 5.0,
            torque_strength: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub thickness: f32,
    pub depth: f32,
    /// Gap between the bottom boundary and the underside of the platform
    pub safety_margin: f32,
    /// Platform half-width as a multiple of the viewport half-width
    pub width_factor: f32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            thickness: 0.6,
            depth: 1.0,
            safety_margin: 0.8,
            width_factor: 1.6,
        }
    }
}

/// Perspective camera the viewport is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Distance from the camera to the z = 0 plane
    pub distance: f32,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: 8.0,
            fov_degrees: 75.0,
        }
    }
}

impl CameraConfig {
    pub fn fov_radians(&self) -> f32 {
        self.fov_degrees.to_radians()
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.distance)
    }
}

/// Fixed-timestep settings for the physics step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    pub fixed_dt: f32,
    pub max_substeps: u32,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_substeps: 3,
        }
    }
}

/// Top-level configuration, owned by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    pub features: FeatureFlags,
    pub push_variant: PushVariant,
    pub camera: CameraConfig,
    pub body: BodyConfig,
    pub float_field: FloatFieldConfig,
    pub throw: ThrowConfig,
    pub push: PushConfig,
    pub platform: PlatformConfig,
    pub step: StepConfig,
    /// Windows at most this wide count as mobile
    pub mobile_width_threshold: f32,
}

impl DriftConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse a configuration from JSON text and validate it.
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        let config: DriftConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let positive = [
            ("body.mass", self.body.mass),
            ("body.half_extents[0]", self.body.half_extents[0]),
            ("body.half_extents[1]", self.body.half_extents[1]),
            ("body.half_extents[2]", self.body.half_extents[2]),
            ("float_field.max_velocity", self.float_field.max_velocity),
            ("throw.max_speed", self.throw.max_speed),
            ("platform.thickness", self.platform.thickness),
            ("platform.depth", self.platform.depth),
            ("camera.distance", self.camera.distance),
            ("step.fixed_dt", self.step.fixed_dt),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if self.body.count == 0 {
            return Err(ConfigError::Invalid("body.count must be at least 1".into()));
        }
        if !(self.camera.fov_degrees > 0.0 && self.camera.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.fov_degrees must be in (0, 180), got {}",
                self.camera.fov_degrees
            )));
        }
        if self.step.max_substeps == 0 {
            return Err(ConfigError::Invalid(
                "step.max_substeps must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            features: FeatureFlags::default(),
            push_variant: PushVariant::default(),
            camera: CameraConfig::default(),
            body: BodyConfig::default(),
            float_field: FloatFieldConfig::default(),
            throw: ThrowConfig::default(),
            push: PushConfig::default(),
            platform: PlatformConfig::default(),
            step: StepConfig::default(),
            mobile_width_threshold: 1024.0,
        }
    }
}
