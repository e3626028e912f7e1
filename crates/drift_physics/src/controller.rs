//! The drift controller.
//!
//! One record owns the rapier world, the body pool, the static geometry,
//! the gesture state and the clock. Host code feeds it window snapshots and
//! pointer events between frames and calls [`DriftController::frame`] once
//! per display refresh.
//!
//! # Frame order
//!
//! 1. Hover push (Float mode, continuous-hover variant)
//! 2. Drift field (Float mode)
//! 3. Physics step (rapier, fixed timestep) or the built-in integrator
//! 4. Poses are read back with [`DriftController::poses`]

use bevy::log::{debug, info};
use bevy::math::{Quat, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rapier3d::prelude::nalgebra::{UnitQuaternion, Vector3};

use crate::config::{DriftConfig, PushVariant};
use crate::float_field::apply_float_field;
use crate::gesture::{GestureController, GestureState, ThrowResult};
use crate::pointer::{pick_bodies, pick_closest, PointerRay};
use crate::pool::BodyPool;
use crate::push::apply_push;
use crate::statics::{PlatformSpec, StaticGeometry};
use crate::viewport::{HostSignals, SimulationMode, ViewportExtents};
use crate::{to_quat, to_vec3, PhysicsState};

/// Where one body should be drawn this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPose {
    pub index: usize,
    pub translation: Vec3,
    pub rotation: Quat,
}

/// What a pointer press ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    Grabbed(usize),
    Pushed(usize),
    Ignored,
}

pub struct DriftController {
    config: DriftConfig,
    physics: PhysicsState,
    pool: BodyPool,
    statics: StaticGeometry,
    gestures: GestureController,
    mode: SimulationMode,
    viewport: ViewportExtents,
    aspect: f32,
    /// Last pointer position in NDC, while the pointer is over the window
    hover: Option<Vec2>,
    rng: StdRng,
    elapsed: f32,
    accumulator: f32,
}

impl DriftController {
    pub fn new(config: DriftConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic controller for tests and replays.
    pub fn with_seed(config: DriftConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: DriftConfig, rng: StdRng) -> Self {
        Self {
            config,
            physics: PhysicsState::new(),
            pool: BodyPool::new(),
            statics: StaticGeometry::new(),
            gestures: GestureController::new(),
            mode: SimulationMode::Float,
            viewport: ViewportExtents::default(),
            aspect: 1.0,
            hover: None,
            rng,
            elapsed: 0.0,
            accumulator: 0.0,
        }
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    pub fn set_push_variant(&mut self, variant: PushVariant) {
        if self.config.push_variant != variant {
            info!("Push variant: {:?}", variant);
            self.config.push_variant = variant;
        }
    }

    pub fn mode(&self) -> SimulationMode {
        self.mode
    }

    pub fn viewport(&self) -> ViewportExtents {
        self.viewport
    }

    pub fn gravity(&self) -> Vec3 {
        self.physics.gravity()
    }

    pub fn physics(&self) -> &PhysicsState {
        &self.physics
    }

    pub fn pool(&self) -> &BodyPool {
        &self.pool
    }

    pub fn statics(&self) -> &StaticGeometry {
        &self.statics
    }

    pub fn platform(&self) -> Option<PlatformSpec> {
        self.statics.platform()
    }

    pub fn gesture(&self) -> Option<&GestureState> {
        self.gestures.state()
    }

    /// Pool index of the body currently held, if any.
    pub fn grabbed_index(&self) -> Option<usize> {
        self.gestures.grabbed_index(&self.pool)
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Re-resolve mode and viewport from a window snapshot and rebuild the
    /// walls and platform. Returns `true` if the mode changed.
    ///
    /// A zero-size window changes nothing.
    pub fn update_environment(&mut self, signals: HostSignals) -> bool {
        let viewport =
            ViewportExtents::from_camera(&self.config.camera, signals.width, signals.height);
        if viewport.is_degenerate() {
            debug!(
                "Ignoring zero-size window {}x{}",
                signals.width, signals.height
            );
            return false;
        }

        let mode = signals.mode();
        let changed = mode != self.mode;
        if changed && mode == SimulationMode::Float {
            self.gestures.cancel(&mut self.physics, &self.pool);
        }

        self.mode = mode;
        self.viewport = viewport;
        self.aspect = signals.width / signals.height;

        self.statics.rebuild(
            &mut self.physics,
            viewport,
            mode,
            &self.config.platform,
            self.config.features.enable_platform,
        );
        self.physics.set_gravity(mode.gravity());
        self.confine_bodies();

        if changed {
            info!(
                "Mode: {} ({}x{}, half extents {:.2} x {:.2})",
                mode.label(),
                signals.width,
                signals.height,
                viewport.half_width,
                viewport.half_height
            );
        }
        changed
    }

    /// Spawn the pool once the model is ready. Returns how many bodies were created.
    pub fn populate(&mut self) -> usize {
        let spawned = self.pool.populate(
            &mut self.physics,
            &self.config.body,
            &self.config.float_field,
            self.mode,
            &mut self.rng,
        );
        if spawned > 0 {
            self.confine_bodies();
        }
        spawned
    }

    /// Discard every body and spawn a fresh set.
    ///
    /// An in-progress grab is left alone; it no longer matches a live body
    /// and is dropped on the next pointer event.
    pub fn reset_pool(&mut self) -> usize {
        self.pool.reset(&mut self.physics);
        self.populate()
    }

    fn ray(&self, ndc: Vec2) -> PointerRay {
        PointerRay::from_ndc(ndc, &self.config.camera, self.aspect)
    }

    /// Pointer went down at `ndc`.
    pub fn pointer_pressed(&mut self, ndc: Vec2, now_ms: f64) -> PressOutcome {
        self.hover = Some(ndc);
        let ray = self.ray(ndc);

        match self.mode {
            SimulationMode::GravityPlatform => {
                if !self.config.features.enable_grab {
                    return PressOutcome::Ignored;
                }
                match self
                    .gestures
                    .begin(&mut self.physics, &self.pool, &ray, now_ms)
                {
                    Some(index) => PressOutcome::Grabbed(index),
                    None => PressOutcome::Ignored,
                }
            }
            SimulationMode::Float => {
                if self.config.push_variant != PushVariant::DiscreteClick {
                    return PressOutcome::Ignored;
                }
                let Some(index) = pick_closest(&self.physics, &self.pool, &ray) else {
                    return PressOutcome::Ignored;
                };
                let pushed = apply_push(
                    &mut self.physics,
                    &self.pool,
                    index,
                    self.config.camera.position(),
                    &self.config.push,
                    &mut self.rng,
                );
                if pushed {
                    PressOutcome::Pushed(index)
                } else {
                    PressOutcome::Ignored
                }
            }
        }
    }

    /// Pointer moved to `ndc`. Drags the held body, if any.
    pub fn pointer_moved(&mut self, ndc: Vec2, now_ms: f64) -> Option<Vec2> {
        self.hover = Some(ndc);
        if !self.gestures.is_active() {
            return None;
        }
        let ray = self.ray(ndc);
        let limit = self.confinement();
        self.gestures
            .drag(&mut self.physics, &self.pool, &ray, now_ms, limit)
    }

    /// Pointer went up. Throws the held body, if any.
    pub fn pointer_released(&mut self) -> Option<ThrowResult> {
        if !self.gestures.is_active() {
            return None;
        }
        self.gestures.release(
            &mut self.physics,
            &self.pool,
            &mut self.rng,
            &self.config.throw,
        )
    }

    /// Pointer left the window; hovering stops.
    pub fn pointer_left(&mut self) {
        self.hover = None;
    }

    /// Advance the simulation by `delta` seconds.
    pub fn frame(&mut self, delta: f32) {
        let delta = delta.max(0.0);
        self.elapsed += delta;

        // No field until the first window snapshot sets the boundary
        if self.mode == SimulationMode::Float && self.statics.bounds().is_some() {
            self.hover_push();
            let grabbed = self.grabbed_index();
            apply_float_field(
                &mut self.physics,
                &mut self.pool,
                &self.viewport,
                self.elapsed,
                grabbed,
                &self.config.float_field,
            );
        }

        if self.config.features.use_physics_engine {
            self.step_fixed(delta);
        } else {
            self.integrate(delta);
        }
    }

    fn hover_push(&mut self) {
        if self.config.push_variant != PushVariant::ContinuousHover {
            return;
        }
        let Some(ndc) = self.hover else {
            return;
        };
        let ray = self.ray(ndc);
        let camera = self.config.camera.position();
        for (index, _) in pick_bodies(&self.physics, &self.pool, &ray) {
            apply_push(
                &mut self.physics,
                &self.pool,
                index,
                camera,
                &self.config.push,
                &mut self.rng,
            );
        }
    }

    /// Fixed-timestep rapier stepping with a bounded number of substeps.
    /// Time beyond the substep budget is dropped.
    fn step_fixed(&mut self, delta: f32) {
        let dt = self.config.step.fixed_dt;
        self.accumulator += delta;

        let mut substeps = 0;
        while self.accumulator >= dt && substeps < self.config.step.max_substeps {
            self.physics.step(dt);
            self.accumulator -= dt;
            substeps += 1;
        }
        if substeps == self.config.step.max_substeps {
            self.accumulator = self.accumulator.min(dt);
        }
    }

    /// Engine-less integration: explicit Euler with rapier-style damping,
    /// reflection off the viewport rectangle and resting contact on the
    /// platform top.
    fn integrate(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let gravity = self.physics.gravity();
        let limit = self.confinement();
        let half = self.config.body.half_extents();
        let platform = self.statics.platform();
        let linear_damping = 1.0 / (1.0 + dt * self.config.body.linear_damping);
        let angular_damping = 1.0 / (1.0 + dt * self.config.body.angular_damping);

        for (_, handle, _) in self.pool.iter() {
            let Some(body) = self.physics.rigid_body_set.get_mut(handle) else {
                continue;
            };
            if !body.is_dynamic() {
                continue;
            }

            let previous = to_vec3(body.translation());
            let mut velocity = to_vec3(body.linvel()) + gravity * dt;
            velocity.z = 0.0;
            velocity *= linear_damping;
            let mut position = previous + velocity * dt;
            position.z = 0.0;

            // Bodies that start a step above the platform land on it
            if let Some(platform) = platform {
                let floor = platform.center.y + platform.half_extents.y + half.y;
                let over = (position.x - platform.center.x).abs()
                    < platform.half_extents.x + half.x;
                if over && previous.y >= platform.center.y && position.y < floor {
                    position.y = floor;
                    velocity.y = velocity.y.max(0.0);
                }
            }

            if let Some(limit) = limit {
                if position.x.abs() > limit.x {
                    position.x = position.x.clamp(-limit.x, limit.x);
                    velocity.x = -velocity.x;
                }
                if position.y.abs() > limit.y {
                    position.y = position.y.clamp(-limit.y, limit.y);
                    velocity.y = -velocity.y;
                }
            }

            let spin = body.angvel().z * angular_damping;
            let rotation =
                UnitQuaternion::from_axis_angle(&Vector3::z_axis(), spin * dt) * *body.rotation();

            body.set_translation(Vector3::new(position.x, position.y, 0.0), true);
            body.set_linvel(Vector3::new(velocity.x, velocity.y, 0.0), true);
            body.set_angvel(Vector3::new(0.0, 0.0, spin), true);
            body.set_rotation(rotation, true);
        }
    }

    /// Largest |x|, |y| a body center may have inside the current walls.
    fn confinement(&self) -> Option<Vec2> {
        let bounds = self.statics.bounds()?;
        let half = self.config.body.half_extents();
        Some((bounds.as_vec2() - Vec2::new(half.x, half.y)).max(Vec2::ZERO))
    }

    /// Pull any body outside the walls back in. Walls can shrink on resize.
    fn confine_bodies(&mut self) {
        let Some(limit) = self.confinement() else {
            return;
        };
        for (_, handle, _) in self.pool.iter() {
            let Some(body) = self.physics.rigid_body_set.get_mut(handle) else {
                continue;
            };
            let t = body.translation();
            let clamped = Vec2::new(t.x, t.y).clamp(-limit, limit);
            if clamped.x != t.x || clamped.y != t.y {
                let translation = Vector3::new(clamped.x, clamped.y, 0.0);
                body.set_translation(translation, true);
                if body.is_kinematic() {
                    body.set_next_kinematic_translation(translation);
                }
            }
        }
    }

    /// Current pose of every body, by pool index.
    pub fn poses(&self) -> Vec<BodyPose> {
        self.pool
            .iter()
            .filter_map(|(index, handle, _)| {
                let body = self.physics.rigid_body_set.get(handle)?;
                Some(BodyPose {
                    index,
                    translation: to_vec3(body.translation()),
                    rotation: to_quat(body.rotation()),
                })
            })
            .collect()
    }

    /// Planar linear velocity of body `index`.
    pub fn body_velocity(&self, index: usize) -> Option<Vec2> {
        let body = self.physics.rigid_body_set.get(self.pool.body(index)?)?;
        Some(Vec2::new(body.linvel().x, body.linvel().y))
    }

    pub fn body_angular_velocity(&self, index: usize) -> Option<f32> {
        let body = self.physics.rigid_body_set.get(self.pool.body(index)?)?;
        Some(body.angvel().z)
    }

    pub fn body_is_kinematic(&self, index: usize) -> Option<bool> {
        let body = self.physics.rigid_body_set.get(self.pool.body(index)?)?;
        Some(body.is_kinematic())
    }

    /// Remove walls and platform and forget any grab or hover.
    pub fn teardown(&mut self) {
        self.gestures.cancel(&mut self.physics, &self.pool);
        self.statics.clear(&mut self.physics);
        self.hover = None;
        info!("Drift controller torn down");
    }
}
