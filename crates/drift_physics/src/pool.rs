//! The set of simulated bodies.
//!
//! Bodies, their float states and (on the Bevy side) their visuals are index
//! aligned: index `i` in the pool refers to the same object everywhere. The
//! pool is filled once when the model is ready and only emptied as a whole.

use std::f32::consts::TAU;

use bevy::log::info;
use bevy::math::{Vec2, Vec3};
use rand::Rng;
use rapier3d::prelude as rapier;

use crate::config::{BodyConfig, FloatFieldConfig};
use crate::viewport::SimulationMode;
use crate::{to_vector, PhysicsState};

/// Per-body parameters of the drift field.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatState {
    /// Added to the clock so bodies don't wave in sync
    pub phase_offset: f32,
    pub rotation_axis: Vec3,
    pub rotation_speed: f32,
    /// Unit vector; components flip at the boundary
    pub drift_direction: Vec2,
}

impl FloatState {
    pub fn random(rng: &mut impl Rng, config: &FloatFieldConfig) -> Self {
        let rotation_axis = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        )
        .try_normalize()
        .unwrap_or(Vec3::Z);
        let drift_direction = Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
            .try_normalize()
            .unwrap_or(Vec2::X);

        Self {
            phase_offset: rng.gen_range(0.0..TAU),
            rotation_axis,
            rotation_speed: rng.gen_range(0.5..=1.0) * config.rotation_speed,
            drift_direction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PoolEntry {
    body: rapier::RigidBodyHandle,
    collider: rapier::ColliderHandle,
}

/// Owner of every dynamic body in the scene.
#[derive(Debug, Default)]
pub struct BodyPool {
    entries: Vec<PoolEntry>,
    float_states: Vec<FloatState>,
}

impl BodyPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `config.count` bodies. Does nothing if the pool is already full.
    ///
    /// Returns the number of bodies created.
    pub fn populate(
        &mut self,
        physics: &mut PhysicsState,
        config: &BodyConfig,
        float_field: &FloatFieldConfig,
        mode: SimulationMode,
        rng: &mut impl Rng,
    ) -> usize {
        if !self.is_empty() {
            return 0;
        }

        let spawn = config.spawn_half_size();
        let half = config.half_extents();

        for _ in 0..config.count {
            let position = Vec3::new(
                rng.gen_range(-spawn.x..=spawn.x),
                rng.gen_range(-spawn.y..=spawn.y),
                0.0,
            );
            let velocity = if mode == SimulationMode::Float {
                Vec3::new(
                    rng.gen_range(-config.initial_speed..=config.initial_speed),
                    rng.gen_range(-config.initial_speed..=config.initial_speed),
                    0.0,
                )
            } else {
                Vec3::ZERO
            };

            let body = rapier::RigidBodyBuilder::dynamic()
                .translation(to_vector(position))
                .linvel(to_vector(velocity))
                .locked_axes(
                    rapier::LockedAxes::TRANSLATION_LOCKED_Z
                        | rapier::LockedAxes::ROTATION_LOCKED_X
                        | rapier::LockedAxes::ROTATION_LOCKED_Y,
                )
                .linear_damping(config.linear_damping)
                .angular_damping(config.angular_damping);
            let body = physics.rigid_body_set.insert(body);

            let collider = rapier::ColliderBuilder::cuboid(half.x, half.y, half.z).mass(config.mass);
            let collider =
                physics
                    .collider_set
                    .insert_with_parent(collider, body, &mut physics.rigid_body_set);
            // Impulses must land before the first step, and without a step in
            // engine-less mode
            if let Some(rb) = physics.rigid_body_set.get_mut(body) {
                rb.recompute_mass_properties_from_colliders(&physics.collider_set);
            }

            self.entries.push(PoolEntry { body, collider });
            self.float_states.push(FloatState::random(rng, float_field));
        }

        info!("Spawned {} bodies", self.entries.len());
        self.entries.len()
    }

    /// Remove every body from the world and empty the pool.
    pub fn reset(&mut self, physics: &mut PhysicsState) {
        for entry in self.entries.drain(..) {
            physics.remove_body(entry.body);
        }
        self.float_states.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rigid body handle at `index`, or `None` for an index the pool doesn't have.
    pub fn body(&self, index: usize) -> Option<rapier::RigidBodyHandle> {
        self.entries.get(index).map(|entry| entry.body)
    }

    pub fn collider(&self, index: usize) -> Option<rapier::ColliderHandle> {
        self.entries.get(index).map(|entry| entry.collider)
    }

    /// Pool index owning a rigid body.
    pub fn index_of_body(&self, handle: rapier::RigidBodyHandle) -> Option<usize> {
        self.entries.iter().position(|entry| entry.body == handle)
    }

    pub fn float_state(&self, index: usize) -> Option<&FloatState> {
        self.float_states.get(index)
    }

    pub fn float_states(&self) -> &[FloatState] {
        &self.float_states
    }

    /// Iterate `(index, body, collider)`.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (usize, rapier::RigidBodyHandle, rapier::ColliderHandle)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, entry.body, entry.collider))
    }

    /// Iterate bodies paired with their mutable float state.
    pub fn iter_float_mut(
        &mut self,
    ) -> impl Iterator<Item = (usize, rapier::RigidBodyHandle, &mut FloatState)> + '_ {
        self.entries
            .iter()
            .zip(self.float_states.iter_mut())
            .enumerate()
            .map(|(i, (entry, state))| (i, entry.body, state))
    }
}
