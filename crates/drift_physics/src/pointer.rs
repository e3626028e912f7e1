//! Pointer rays and body picking.
//!
//! Pointer positions arrive in normalized device coordinates (x right, y up,
//! both in [-1, 1]). The camera sits on +Z looking at the origin, so the ray
//! for an NDC point is built straight from the field of view and aspect.

use bevy::math::{Vec2, Vec3};
use rapier3d::parry::query::RayCast;
use rapier3d::prelude as rapier;
use rapier::nalgebra::{Point3, Vector3};

use crate::config::CameraConfig;
use crate::pool::BodyPool;
use crate::PhysicsState;

/// A world-space ray from the camera through a pointer position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerRay {
    pub origin: Vec3,
    /// Unit length
    pub direction: Vec3,
}

impl PointerRay {
    pub fn from_ndc(ndc: Vec2, camera: &CameraConfig, aspect: f32) -> Self {
        let tan_half = (camera.fov_radians() / 2.0).tan();
        let direction = Vec3::new(ndc.x * tan_half * aspect, ndc.y * tan_half, -1.0).normalize();
        Self {
            origin: camera.position(),
            direction,
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Where the ray crosses the z = 0 plane, if it does.
    pub fn intersect_plane(&self) -> Option<Vec2> {
        if self.direction.z.abs() < f32::EPSILON {
            return None;
        }
        let t = -self.origin.z / self.direction.z;
        if t < 0.0 {
            return None;
        }
        let hit = self.at(t);
        Some(Vec2::new(hit.x, hit.y))
    }

    fn to_rapier(self) -> rapier::Ray {
        rapier::Ray::new(
            Point3::new(self.origin.x, self.origin.y, self.origin.z),
            Vector3::new(self.direction.x, self.direction.y, self.direction.z),
        )
    }
}

/// Convert a window position (pixels, y down) into NDC.
pub fn window_to_ndc(position: Vec2, width: f32, height: f32) -> Option<Vec2> {
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    Some(Vec2::new(
        position.x / width * 2.0 - 1.0,
        -(position.y / height) * 2.0 + 1.0,
    ))
}

/// Every pool body the ray passes through, nearest first, as `(index, distance)`.
pub fn pick_bodies(physics: &PhysicsState, pool: &BodyPool, ray: &PointerRay) -> Vec<(usize, f32)> {
    let rapier_ray = ray.to_rapier();
    let mut hits: Vec<(usize, f32)> = pool
        .iter()
        .filter_map(|(_, _, collider_handle)| {
            let collider = physics.collider_set.get(collider_handle)?;
            let toi = collider
                .shape()
                .cast_ray(collider.position(), &rapier_ray, f32::MAX, true)?;
            let owner = pool.index_of_body(collider.parent()?)?;
            Some((owner, toi))
        })
        .collect();
    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits
}

/// Nearest pool body under the ray.
pub fn pick_closest(physics: &PhysicsState, pool: &BodyPool, ray: &PointerRay) -> Option<usize> {
    pick_bodies(physics, pool, ray).first().map(|(index, _)| *index)
}
