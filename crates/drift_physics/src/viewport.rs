//! Viewport extents and mode selection.
//!
//! The visible region of the z = 0 plane is derived from the camera distance
//! and vertical field of view. The simulation mode is a pure function of the
//! device profile: mobile devices held in landscape get gravity and a
//! platform, everything else floats.

use bevy::math::{Vec2, Vec3};

use crate::config::CameraConfig;

/// Standard gravity used in GravityPlatform mode.
pub const PLATFORM_GRAVITY: f32 = -9.82;

/// Half-extents of the visible region of the z = 0 plane, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportExtents {
    pub half_width: f32,
    pub half_height: f32,
}

impl ViewportExtents {
    pub fn new(half_width: f32, half_height: f32) -> Self {
        Self {
            half_width,
            half_height,
        }
    }

    /// Resolve the extents for a camera looking down -Z at the plane.
    ///
    /// A window with zero height has no defined aspect ratio and resolves to
    /// a degenerate (zero) extent.
    pub fn from_camera(camera: &CameraConfig, width: f32, height: f32) -> Self {
        if width <= 0.0 || height <= 0.0 {
            return Self::default();
        }
        let aspect = width / height;
        let frustum_height = 2.0 * camera.distance * (camera.fov_radians() / 2.0).tan();
        let frustum_width = frustum_height * aspect;
        Self::new(frustum_width / 2.0, frustum_height / 2.0)
    }

    pub fn is_degenerate(&self) -> bool {
        self.half_width <= 0.0 || self.half_height <= 0.0
    }

    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.half_width, self.half_height)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x.abs() <= self.half_width && point.y.abs() <= self.half_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Landscape when strictly wider than tall.
    pub fn from_size(width: f32, height: f32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    pub class: DeviceClass,
    pub orientation: Orientation,
}

/// Decides what kind of device the host is.
///
/// Kept behind a trait so mode selection can be driven without a real device.
pub trait DeviceClassifier: Send + Sync {
    fn classify(&self, width: f32, height: f32) -> DeviceProfile;
}

/// Classifies by a platform signature string and window width.
#[derive(Debug, Clone)]
pub struct SignatureClassifier {
    /// Host description, e.g. a user agent or `os/arch`
    pub signature: String,
    /// Windows at most this wide count as mobile
    pub mobile_width_threshold: f32,
}

const MOBILE_MARKERS: [&str; 4] = ["mobi", "android", "ipad", "iphone"];

impl SignatureClassifier {
    pub fn new(signature: impl Into<String>, mobile_width_threshold: f32) -> Self {
        Self {
            signature: signature.into(),
            mobile_width_threshold,
        }
    }

    /// Signature built from the compile target.
    pub fn for_host(mobile_width_threshold: f32) -> Self {
        Self::new(
            format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
            mobile_width_threshold,
        )
    }

    pub fn has_mobile_signature(&self) -> bool {
        let lower = self.signature.to_lowercase();
        MOBILE_MARKERS.iter().any(|marker| lower.contains(marker))
    }
}

impl DeviceClassifier for SignatureClassifier {
    fn classify(&self, width: f32, height: f32) -> DeviceProfile {
        let class = if self.has_mobile_signature() || width <= self.mobile_width_threshold {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        };
        DeviceProfile {
            class,
            orientation: Orientation::from_size(width, height),
        }
    }
}

/// The two behaviours of the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationMode {
    /// Zero gravity, bodies drift.
    #[default]
    Float,
    /// Gravity on, platform present, bodies can be grabbed and thrown.
    GravityPlatform,
}

impl SimulationMode {
    pub fn from_profile(profile: DeviceProfile) -> Self {
        match (profile.class, profile.orientation) {
            (DeviceClass::Mobile, Orientation::Landscape) => SimulationMode::GravityPlatform,
            _ => SimulationMode::Float,
        }
    }

    pub fn gravity(self) -> Vec3 {
        match self {
            SimulationMode::Float => Vec3::ZERO,
            SimulationMode::GravityPlatform => Vec3::new(0.0, PLATFORM_GRAVITY, 0.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SimulationMode::Float => "float",
            SimulationMode::GravityPlatform => "gravity + platform",
        }
    }
}

/// Everything the host reports about its window in one snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostSignals {
    pub width: f32,
    pub height: f32,
    pub profile: DeviceProfile,
}

impl HostSignals {
    pub fn classify(classifier: &dyn DeviceClassifier, width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            profile: classifier.classify(width, height),
        }
    }

    pub fn mode(&self) -> SimulationMode {
        SimulationMode::from_profile(self.profile)
    }
}
