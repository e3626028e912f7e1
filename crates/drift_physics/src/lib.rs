//! Interactive physics for a handful of drifting bodies.
//!
//! This crate provides:
//! - The rapier world the bodies live in (`PhysicsState`)
//! - Viewport resolution and Float / GravityPlatform mode selection
//! - Boundary walls and the optional ground platform
//! - The zero-gravity drift field
//! - Grab / drag / throw gestures and pointer pushes
//! - `DriftController`, which owns all of the above and runs one frame at a time
//! - `DriftPhysicsPlugin`, which wires the controller into a Bevy app

use bevy::math::{Quat, Vec3};
use bevy::prelude::Resource;
use rapier3d::prelude as rapier;
use rapier::nalgebra::{UnitQuaternion, Vector3};

pub mod config;
pub mod controller;
pub mod float_field;
pub mod gesture;
pub mod plugin;
pub mod pointer;
pub mod pool;
pub mod push;
pub mod statics;
pub mod viewport;

pub use config::{
    BodyConfig, CameraConfig, ConfigError, ConfigResult, DriftConfig, FeatureFlags,
    FloatFieldConfig, PlatformConfig, PushConfig, PushVariant, StepConfig, ThrowConfig,
};
pub use controller::{BodyPose, DriftController, PressOutcome};
pub use float_field::apply_float_field;
pub use gesture::{GestureController, GestureState, ThrowResult};
pub use plugin::{
    DriftBody, DriftModel, DriftPhysicsPlugin, DriftSet, HostClassifier, ModelStatus,
    PlatformVisual, PoolResetRequest, SimulationController, DEFAULT_MODEL_PATH,
};
pub use pointer::{pick_bodies, pick_closest, window_to_ndc, PointerRay};
pub use pool::{BodyPool, FloatState};
pub use push::apply_push;
pub use statics::{PlatformSpec, StaticGeometry};
pub use viewport::{
    DeviceClass, DeviceClassifier, DeviceProfile, HostSignals, Orientation, SignatureClassifier,
    SimulationMode, ViewportExtents, PLATFORM_GRAVITY,
};

/// The rapier world shared by bodies and static geometry.
#[derive(Resource)]
pub struct PhysicsState {
    pub gravity: Vector3<f32>,
    pub integration_parameters: rapier::IntegrationParameters,
    pub physics_pipeline: rapier::PhysicsPipeline,
    pub island_manager: rapier::IslandManager,
    pub broad_phase: rapier::DefaultBroadPhase,
    pub narrow_phase: rapier::NarrowPhase,
    pub rigid_body_set: rapier::RigidBodySet,
    pub collider_set: rapier::ColliderSet,
    pub impulse_joint_set: rapier::ImpulseJointSet,
    pub multibody_joint_set: rapier::MultibodyJointSet,
    pub ccd_solver: rapier::CCDSolver,
}

impl PhysicsState {
    /// A world with no gravity; the mode selector sets it.
    pub fn new() -> Self {
        Self {
            gravity: Vector3::zeros(),
            integration_parameters: rapier::IntegrationParameters::default(),
            physics_pipeline: rapier::PhysicsPipeline::new(),
            island_manager: rapier::IslandManager::new(),
            broad_phase: rapier::DefaultBroadPhase::new(),
            narrow_phase: rapier::NarrowPhase::new(),
            rigid_body_set: rapier::RigidBodySet::new(),
            collider_set: rapier::ColliderSet::new(),
            impulse_joint_set: rapier::ImpulseJointSet::new(),
            multibody_joint_set: rapier::MultibodyJointSet::new(),
            ccd_solver: rapier::CCDSolver::new(),
        }
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = to_vector(gravity);
    }

    pub fn gravity(&self) -> Vec3 {
        to_vec3(&self.gravity)
    }

    /// Advance the world by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }

    /// Insert a fixed body with a single collider attached.
    pub fn insert_fixed(
        &mut self,
        translation: Vec3,
        collider: impl Into<rapier::Collider>,
    ) -> rapier::RigidBodyHandle {
        let body = rapier::RigidBodyBuilder::fixed().translation(to_vector(translation));
        let handle = self.rigid_body_set.insert(body);
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        handle
    }

    /// Remove a body and every collider attached to it.
    pub fn remove_body(&mut self, handle: rapier::RigidBodyHandle) -> bool {
        self.rigid_body_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    /// Number of fixed bodies currently in the world.
    pub fn fixed_body_count(&self) -> usize {
        self.rigid_body_set
            .iter()
            .filter(|(_, body)| body.is_fixed())
            .count()
    }

    pub fn dynamic_body_count(&self) -> usize {
        self.rigid_body_set
            .iter()
            .filter(|(_, body)| body.is_dynamic())
            .count()
    }
}

impl Default for PhysicsState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn to_vector(v: Vec3) -> Vector3<f32> {
    Vector3::new(v.x, v.y, v.z)
}

pub fn to_vec3(v: &Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn to_quat(rot: &UnitQuaternion<f32>) -> Quat {
    Quat::from_xyzw(rot.i, rot.j, rot.k, rot.w)
}
