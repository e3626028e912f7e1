//! Pointer pushes in Float mode.
//!
//! A push is an impulse along the camera-to-body direction, flattened onto
//! the plane, plus a random kick to the spin. Which bodies get pushed and
//! how often depends on the configured [`PushVariant`](crate::PushVariant).

use bevy::math::{Vec2, Vec3};
use rand::Rng;
use rapier3d::prelude::nalgebra::Vector3;

use crate::config::PushConfig;
use crate::pool::BodyPool;
use crate::PhysicsState;

/// Planar impulse for a body at `body_position` seen from `camera_position`.
pub fn push_impulse(body_position: Vec3, camera_position: Vec3, strength: f32) -> Vec2 {
    let dir = (body_position - camera_position).normalize_or_zero();
    Vec2::new(dir.x, dir.y) * strength
}

/// Push body `index`. Returns `false` if the index has no live dynamic body.
pub fn apply_push(
    physics: &mut PhysicsState,
    pool: &BodyPool,
    index: usize,
    camera_position: Vec3,
    config: &PushConfig,
    rng: &mut impl Rng,
) -> bool {
    let Some(handle) = pool.body(index) else {
        return false;
    };
    let Some(body) = physics.rigid_body_set.get_mut(handle) else {
        return false;
    };
    if !body.is_dynamic() {
        return false;
    }

    let t = body.translation();
    let impulse = push_impulse(Vec3::new(t.x, t.y, t.z), camera_position, config.strength);
    body.apply_impulse(Vector3::new(impulse.x, impulse.y, 0.0), true);

    let mut angvel = *body.angvel();
    angvel.z += rng.gen_range(-0.5..0.5) * config.torque_strength;
    body.set_angvel(angvel, true);
    true
}
