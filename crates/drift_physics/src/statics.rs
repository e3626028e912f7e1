//! Boundary walls and the ground platform.
//!
//! Static geometry is never updated in place. Every rebuild removes all
//! previously owned bodies first and then inserts a fresh set sized to the
//! current viewport, so repeated resize events cannot leak or duplicate
//! colliders.

use bevy::log::debug;
use bevy::math::Vec3;
use rapier3d::prelude as rapier;
use rapier::nalgebra::{Unit, Vector3};

use crate::config::PlatformConfig;
use crate::viewport::{SimulationMode, ViewportExtents};
use crate::PhysicsState;

/// Where the platform box sits and how big it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformSpec {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl PlatformSpec {
    /// Platform resting `safety_margin` above the bottom wall.
    pub fn for_viewport(viewport: &ViewportExtents, config: &PlatformConfig) -> Self {
        let y = -viewport.half_height + config.safety_margin + config.thickness / 2.0;
        Self {
            center: Vec3::new(0.0, y, 0.0),
            half_extents: Vec3::new(
                viewport.half_width * config.width_factor,
                config.thickness / 2.0,
                config.depth / 2.0,
            ),
        }
    }

    /// Full size of the matching visual box.
    pub fn size(&self) -> Vec3 {
        self.half_extents * 2.0
    }
}

/// Owner of the walls and the optional platform.
#[derive(Debug, Default)]
pub struct StaticGeometry {
    walls: Vec<rapier::RigidBodyHandle>,
    platform: Option<(rapier::RigidBodyHandle, PlatformSpec)>,
    bounds: Option<ViewportExtents>,
    /// Bumped on every rebuild so visuals know to refresh
    generation: u64,
}

impl StaticGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tear everything down and rebuild for the given viewport and mode.
    ///
    /// A degenerate viewport leaves the current geometry in place and
    /// returns `false`.
    pub fn rebuild(
        &mut self,
        physics: &mut PhysicsState,
        viewport: ViewportExtents,
        mode: SimulationMode,
        platform: &PlatformConfig,
        enable_platform: bool,
    ) -> bool {
        if viewport.is_degenerate() {
            debug!("Skipping static rebuild for degenerate viewport {:?}", viewport);
            return false;
        }

        self.clear(physics);

        let (hw, hh) = (viewport.half_width, viewport.half_height);
        let walls = [
            (Vec3::new(-hw, 0.0, 0.0), Vector3::x()),
            (Vec3::new(hw, 0.0, 0.0), -Vector3::x()),
            (Vec3::new(0.0, hh, 0.0), -Vector3::y()),
            (Vec3::new(0.0, -hh, 0.0), Vector3::y()),
        ];
        for (position, inward) in walls {
            let collider = rapier::ColliderBuilder::halfspace(Unit::new_normalize(inward));
            self.walls.push(physics.insert_fixed(position, collider));
        }

        if mode == SimulationMode::GravityPlatform && enable_platform {
            let spec = PlatformSpec::for_viewport(&viewport, platform);
            let collider = rapier::ColliderBuilder::cuboid(
                spec.half_extents.x,
                spec.half_extents.y,
                spec.half_extents.z,
            );
            let handle = physics.insert_fixed(spec.center, collider);
            self.platform = Some((handle, spec));
        }

        self.bounds = Some(viewport);
        self.generation += 1;
        debug!(
            "Rebuilt statics (generation {}): {} walls, platform: {}",
            self.generation,
            self.walls.len(),
            self.platform.is_some()
        );
        true
    }

    /// Remove every owned wall and the platform.
    pub fn clear(&mut self, physics: &mut PhysicsState) {
        for handle in self.walls.drain(..) {
            physics.remove_body(handle);
        }
        if let Some((handle, _)) = self.platform.take() {
            physics.remove_body(handle);
        }
        self.bounds = None;
    }

    pub fn wall_count(&self) -> usize {
        self.walls.len()
    }

    pub fn platform(&self) -> Option<PlatformSpec> {
        self.platform.map(|(_, spec)| spec)
    }

    /// The rectangle the walls currently enclose, if any.
    pub fn bounds(&self) -> Option<ViewportExtents> {
        self.bounds
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
