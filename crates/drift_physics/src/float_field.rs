//! Zero-gravity drift field.
//!
//! # Per-body update (Float mode only)
//!
//! 1. Wave term from the phase-shifted clock
//! 2. Drift force + wave added straight to velocity (not mass-normalized)
//! 3. Speed clamped to `max_velocity`
//! 4. Small sinusoidal spin about Z
//! 5. Boundary band: velocity forced inward, drift direction turned inward
//!
//! The order matters. The boundary step runs after the clamp, so a body in
//! the margin band always leaves the frame moving inward.

use bevy::math::Vec2;

use crate::config::FloatFieldConfig;
use crate::pool::{BodyPool, FloatState};
use crate::viewport::ViewportExtents;
use crate::PhysicsState;

/// Spin perturbation amplitude, radians/s per frame.
const SPIN_WOBBLE: f32 = 0.03;

/// Ratio between the vertical and horizontal wave frequencies.
const WAVE_Y_RATIO: f32 = 1.3;

/// Velocity of one body after a drift update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftUpdate {
    pub linvel: Vec2,
    pub angvel_z: f32,
}

/// Wave term at phase-shifted time `t`.
pub fn wave(t: f32, config: &FloatFieldConfig) -> Vec2 {
    Vec2::new(
        (t * config.wave_frequency).sin() * config.wave_amplitude,
        (t * config.wave_frequency * WAVE_Y_RATIO).cos() * config.wave_amplitude,
    )
}

/// Scale `v` down to `max` length if it is longer, keeping its direction.
pub fn clamp_speed(v: Vec2, max: f32) -> Vec2 {
    let speed = v.length();
    if speed > max {
        v * (max / speed)
    } else {
        v
    }
}

/// One drift update for a single body. Pure; mutates only the float state.
pub fn drift_step(
    position: Vec2,
    linvel: Vec2,
    angvel_z: f32,
    state: &mut FloatState,
    elapsed: f32,
    viewport: &ViewportExtents,
    config: &FloatFieldConfig,
) -> DriftUpdate {
    let t = elapsed + state.phase_offset;

    let force = state.drift_direction * config.base_force + wave(t, config);
    let mut velocity = clamp_speed(linvel + force, config.max_velocity);
    let angvel_z = angvel_z + (t * state.rotation_speed).sin() * SPIN_WOBBLE;

    let limit = viewport.as_vec2() - Vec2::splat(config.boundary_margin);
    let push = config.boundary_push_speed;

    if position.x > limit.x {
        velocity.x = velocity.x.min(-push);
        state.drift_direction.x = -state.drift_direction.x.abs();
    }
    if position.x < -limit.x {
        velocity.x = velocity.x.max(push);
        state.drift_direction.x = state.drift_direction.x.abs();
    }
    if position.y > limit.y {
        velocity.y = velocity.y.min(-push);
        state.drift_direction.y = -state.drift_direction.y.abs();
    }
    if position.y < -limit.y {
        velocity.y = velocity.y.max(push);
        state.drift_direction.y = state.drift_direction.y.abs();
    }

    DriftUpdate {
        linvel: velocity,
        angvel_z,
    }
}

/// Apply the drift field to every dynamic, non-grabbed body in the pool.
pub fn apply_float_field(
    physics: &mut PhysicsState,
    pool: &mut BodyPool,
    viewport: &ViewportExtents,
    elapsed: f32,
    grabbed: Option<usize>,
    config: &FloatFieldConfig,
) {
    for (index, handle, state) in pool.iter_float_mut() {
        if grabbed == Some(index) {
            continue;
        }
        let Some(body) = physics.rigid_body_set.get_mut(handle) else {
            continue;
        };
        if !body.is_dynamic() {
            continue;
        }

        let pos = body.translation();
        let vel = body.linvel();
        let update = drift_step(
            Vec2::new(pos.x, pos.y),
            Vec2::new(vel.x, vel.y),
            body.angvel().z,
            state,
            elapsed,
            viewport,
            config,
        );

        let mut linvel = *body.linvel();
        linvel.x = update.linvel.x;
        linvel.y = update.linvel.y;
        body.set_linvel(linvel, true);

        let mut angvel = *body.angvel();
        angvel.z = update.angvel_z;
        body.set_angvel(angvel, true);
    }
}
