//! Grab / drag / throw.
//!
//! A grab turns the picked body kinematic and pins it under the pointer at
//! the offset it was grabbed with. Every drag sample updates a velocity
//! estimate in world units per millisecond from the last two samples only.
//! Release turns the body dynamic again and throws it with that estimate,
//! scaled and clamped.
//!
//! At most one gesture exists. It remembers both the pool index and the
//! rigid body handle, so a gesture that outlives its body (pool reset) is
//! recognised as stale and dropped instead of moving some other body.

use bevy::log::debug;
use bevy::math::Vec2;
use rand::Rng;
use rapier3d::prelude as rapier;
use rapier::nalgebra::Vector3;

use crate::config::ThrowConfig;
use crate::float_field::clamp_speed;
use crate::pointer::{pick_closest, PointerRay};
use crate::pool::BodyPool;
use crate::PhysicsState;

/// Smallest sample interval used for velocity estimation, in ms.
pub const MIN_SAMPLE_INTERVAL_MS: f64 = 1.0;

/// The one in-progress grab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureState {
    pub body_index: usize,
    body: rapier::RigidBodyHandle,
    /// Body position minus the grab point
    pub offset: Vec2,
    pub last_target: Vec2,
    pub last_time_ms: f64,
    /// World units per millisecond
    pub velocity_estimate: Vec2,
}

/// What a release did to the body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrowResult {
    pub body_index: usize,
    pub linvel: Vec2,
    pub spin: f32,
}

/// Velocity between two drag samples. The interval is clamped to
/// [`MIN_SAMPLE_INTERVAL_MS`] so identical timestamps cannot blow it up.
pub fn estimate_velocity(last: Vec2, target: Vec2, last_time_ms: f64, now_ms: f64) -> Vec2 {
    let dt = (now_ms - last_time_ms).max(MIN_SAMPLE_INTERVAL_MS) as f32;
    (target - last) / dt
}

/// Convert a per-millisecond estimate into a clamped release velocity.
pub fn throw_velocity(estimate: Vec2, config: &ThrowConfig) -> Vec2 {
    clamp_speed(estimate * config.scale, config.max_speed)
}

/// Spin for a throw at `speed`; `jitter` is uniform in [-0.5, 0.5].
pub fn throw_spin(speed: f32, jitter: f32, config: &ThrowConfig) -> f32 {
    (jitter * speed * config.spin_factor).clamp(-config.max_spin, config.max_spin)
}

#[derive(Debug, Default)]
pub struct GestureController {
    state: Option<GestureState>,
}

impl GestureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Option<&GestureState> {
        self.state.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Index of the grabbed body, if the gesture still refers to a live one.
    pub fn grabbed_index(&self, pool: &BodyPool) -> Option<usize> {
        let state = self.state.as_ref()?;
        (pool.body(state.body_index) == Some(state.body)).then_some(state.body_index)
    }

    /// Try to grab the body under `ray`. Returns the grabbed index.
    pub fn begin(
        &mut self,
        physics: &mut PhysicsState,
        pool: &BodyPool,
        ray: &PointerRay,
        now_ms: f64,
    ) -> Option<usize> {
        if self.state.is_some() {
            return None;
        }
        let index = pick_closest(physics, pool, ray)?;
        let grab_point = ray.intersect_plane()?;
        let handle = pool.body(index)?;
        let body = physics.rigid_body_set.get_mut(handle)?;

        body.set_linvel(Vector3::zeros(), true);
        body.set_angvel(Vector3::zeros(), true);
        body.set_body_type(rapier::RigidBodyType::KinematicPositionBased, true);

        let position = Vec2::new(body.translation().x, body.translation().y);
        let offset = position - grab_point;
        self.state = Some(GestureState {
            body_index: index,
            body: handle,
            offset,
            last_target: grab_point + offset,
            last_time_ms: now_ms,
            velocity_estimate: Vec2::ZERO,
        });
        debug!("Grabbed body {} at {:?}", index, position);
        Some(index)
    }

    /// Move the grabbed body under the pointer. Returns the new position.
    ///
    /// `limit` is the largest |x| and |y| the body center may take; the
    /// target is clamped into it when given.
    pub fn drag(
        &mut self,
        physics: &mut PhysicsState,
        pool: &BodyPool,
        ray: &PointerRay,
        now_ms: f64,
        limit: Option<Vec2>,
    ) -> Option<Vec2> {
        let Some(index) = self.grabbed_index(pool) else {
            self.drop_stale();
            return None;
        };
        let point = ray.intersect_plane()?;
        let state = self.state.as_mut()?;

        let mut target = point + state.offset;
        if let Some(limit) = limit {
            target = target.clamp(-limit, limit);
        }

        state.velocity_estimate =
            estimate_velocity(state.last_target, target, state.last_time_ms, now_ms);
        state.last_target = target;
        state.last_time_ms = now_ms;

        let body = physics.rigid_body_set.get_mut(state.body)?;
        let translation = Vector3::new(target.x, target.y, 0.0);
        body.set_translation(translation, true);
        body.set_next_kinematic_translation(translation);
        debug!("Dragged body {} to {:?}", index, target);
        Some(target)
    }

    /// Let go of the grabbed body and throw it.
    pub fn release(
        &mut self,
        physics: &mut PhysicsState,
        pool: &BodyPool,
        rng: &mut impl Rng,
        config: &ThrowConfig,
    ) -> Option<ThrowResult> {
        let Some(index) = self.grabbed_index(pool) else {
            self.drop_stale();
            return None;
        };
        let state = self.state.take()?;
        let body = physics.rigid_body_set.get_mut(state.body)?;

        body.set_body_type(rapier::RigidBodyType::Dynamic, true);

        let linvel = throw_velocity(state.velocity_estimate, config);
        body.set_linvel(Vector3::new(linvel.x, linvel.y, 0.0), true);

        let spin = throw_spin(linvel.length(), rng.gen_range(-0.5..0.5), config);
        let mut angvel = *body.angvel();
        angvel.z += spin;
        body.set_angvel(angvel, true);

        debug!("Threw body {} at {:?} (spin {:.2})", index, linvel, spin);
        Some(ThrowResult {
            body_index: index,
            linvel,
            spin,
        })
    }

    /// Drop the grab without throwing; the body comes back to rest.
    pub fn cancel(&mut self, physics: &mut PhysicsState, pool: &BodyPool) {
        let index = self.grabbed_index(pool);
        let Some(state) = self.state.take() else {
            return;
        };
        if index.is_none() {
            return;
        }
        if let Some(body) = physics.rigid_body_set.get_mut(state.body) {
            body.set_body_type(rapier::RigidBodyType::Dynamic, true);
            body.set_linvel(Vector3::zeros(), true);
            body.set_angvel(Vector3::zeros(), true);
        }
    }

    fn drop_stale(&mut self) {
        if let Some(state) = self.state.take() {
            debug!("Dropping stale grab of body {}", state.body_index);
        }
    }
}
