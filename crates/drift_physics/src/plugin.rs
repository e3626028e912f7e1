//! Bevy integration.
//!
//! Systems run in three chained sets each frame:
//! - `DriftSet::Input`: window snapshot (mode + rebuild), model readiness,
//!   pool resets, pointer and touch events
//! - `DriftSet::Simulate`: one controller frame
//! - `DriftSet::Sync`: body transforms and the platform visual
//!
//! Resizes are handled in `Input`, so the walls and platform are always
//! rebuilt before the step that sees the new window.

use bevy::asset::LoadState;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::config::DriftConfig;
use crate::controller::DriftController;
use crate::pointer::window_to_ndc;
use crate::viewport::{DeviceClassifier, HostSignals, SignatureClassifier};

/// Scene the bodies are cloned from.
pub const DEFAULT_MODEL_PATH: &str = "models/ghost.glb";

pub struct DriftPhysicsPlugin {
    pub config: DriftConfig,
    pub model_path: String,
    /// Uniform scale applied to every model clone
    pub model_scale: f32,
}

impl DriftPhysicsPlugin {
    pub fn new(config: DriftConfig) -> Self {
        Self {
            config,
            ..default()
        }
    }

    pub fn with_model(mut self, path: impl Into<String>) -> Self {
        self.model_path = path.into();
        self
    }
}

impl Default for DriftPhysicsPlugin {
    fn default() -> Self {
        Self {
            config: DriftConfig::default(),
            model_path: DEFAULT_MODEL_PATH.to_string(),
            model_scale: 1.5,
        }
    }
}

impl Plugin for DriftPhysicsPlugin {
    fn build(&self, app: &mut App) {
        let classifier = SignatureClassifier::for_host(self.config.mobile_width_threshold);

        app.insert_resource(SimulationController(DriftController::new(
            self.config.clone(),
        )))
            .insert_resource(HostClassifier(Box::new(classifier)))
            .insert_resource(DriftModel {
                path: self.model_path.clone(),
                scale: self.model_scale,
                scene: None,
                status: ModelStatus::Pending,
            })
            .add_message::<PoolResetRequest>()
            .configure_sets(
                Update,
                (DriftSet::Input, DriftSet::Simulate, DriftSet::Sync).chain(),
            )
            .add_systems(Startup, setup_scene)
            .add_systems(
                Update,
                (
                    environment_system,
                    model_ready_system,
                    pool_reset_system,
                    pointer_input_system,
                )
                    .chain()
                    .in_set(DriftSet::Input),
            )
            .add_systems(Update, simulate_system.in_set(DriftSet::Simulate))
            .add_systems(
                Update,
                (sync_bodies_system, sync_platform_system).in_set(DriftSet::Sync),
            )
            .add_systems(Last, teardown_on_exit);
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum DriftSet {
    Input,
    Simulate,
    Sync,
}

/// The controller as a Bevy resource. It holds the only live copy of the
/// configuration; read it through `DriftController::config`.
#[derive(Resource)]
pub struct SimulationController(pub DriftController);

/// Device classification used for mode selection. Replace it to fake a device.
#[derive(Resource)]
pub struct HostClassifier(pub Box<dyn DeviceClassifier>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    Pending,
    Spawned,
    Failed,
}

#[derive(Resource)]
pub struct DriftModel {
    pub path: String,
    pub scale: f32,
    pub scene: Option<Handle<Scene>>,
    pub status: ModelStatus,
}

/// Links a model clone to its pool index.
#[derive(Component, Debug, Clone, Copy)]
pub struct DriftBody {
    pub index: usize,
}

/// Marks the platform's visual box.
#[derive(Component)]
pub struct PlatformVisual;

/// Ask for every body to be discarded and respawned.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct PoolResetRequest;

fn setup_scene(
    mut commands: Commands,
    controller: Res<SimulationController>,
    asset_server: Res<AssetServer>,
    mut model: ResMut<DriftModel>,
) {
    let camera = controller.0.config().camera;
    commands.spawn((
        Camera3d::default(),
        Projection::from(PerspectiveProjection {
            fov: camera.fov_radians(),
            near: 0.1,
            far: 1000.0,
            ..default()
        }),
        Transform::from_translation(camera.position()).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 10000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(5.0, 10.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    // Soft fill from the camera side
    commands.spawn((
        DirectionalLight {
            illuminance: 3000.0,
            ..default()
        },
        Transform::from_xyz(0.0, 0.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    let scene = asset_server.load(GltfAssetLabel::Scene(0).from_asset(model.path.clone()));
    model.scene = Some(scene);
}

/// Track window size; every change re-resolves mode and rebuilds statics.
fn environment_system(
    windows: Query<&Window, With<PrimaryWindow>>,
    classifier: Res<HostClassifier>,
    mut controller: ResMut<SimulationController>,
    mut last_size: Local<Option<Vec2>>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let size = Vec2::new(window.width(), window.height());
    if *last_size == Some(size) {
        return;
    }
    *last_size = Some(size);

    let signals = HostSignals::classify(classifier.0.as_ref(), size.x, size.y);
    controller.0.update_environment(signals);
}

fn model_ready_system(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut model: ResMut<DriftModel>,
    mut controller: ResMut<SimulationController>,
) {
    if model.status != ModelStatus::Pending {
        return;
    }
    let Some(scene) = model.scene.clone() else {
        return;
    };

    match asset_server.load_state(&scene) {
        LoadState::Loaded => {
            controller.0.populate();
            spawn_body_visuals(&mut commands, &controller.0, &scene, model.scale);
            model.status = ModelStatus::Spawned;
        }
        LoadState::Failed(err) => {
            warn!("Failed to load model {}: {}", model.path, err);
            model.status = ModelStatus::Failed;
        }
        _ => {}
    }
}

fn spawn_body_visuals(
    commands: &mut Commands,
    controller: &DriftController,
    scene: &Handle<Scene>,
    scale: f32,
) {
    for pose in controller.poses() {
        commands.spawn((
            SceneRoot(scene.clone()),
            Transform {
                translation: pose.translation,
                rotation: pose.rotation,
                scale: Vec3::splat(scale),
            },
            DriftBody { index: pose.index },
        ));
    }
}

fn pool_reset_system(
    mut commands: Commands,
    mut requests: MessageReader<PoolResetRequest>,
    model: Res<DriftModel>,
    mut controller: ResMut<SimulationController>,
    bodies: Query<Entity, With<DriftBody>>,
) {
    if requests.read().count() == 0 {
        return;
    }
    if model.status != ModelStatus::Spawned {
        return;
    }
    let Some(scene) = model.scene.as_ref() else {
        return;
    };

    for entity in bodies.iter() {
        commands.entity(entity).despawn();
    }
    let spawned = controller.0.reset_pool();
    spawn_body_visuals(&mut commands, &controller.0, scene, model.scale);
    info!("Pool reset, {} bodies respawned", spawned);
}

/// Feed mouse and touch into the controller.
///
/// Touch takes precedence; the first active touch is the pointer.
fn pointer_input_system(
    time: Res<Time>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mouse: Res<ButtonInput<MouseButton>>,
    touches: Res<Touches>,
    mut controller: ResMut<SimulationController>,
    mut last_cursor: Local<Option<Vec2>>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let (width, height) = (window.width(), window.height());
    let now_ms = time.elapsed_secs_f64() * 1000.0;
    let controller = &mut controller.0;

    if let Some(touch) = touches.iter_just_pressed().next() {
        if let Some(ndc) = window_to_ndc(touch.position(), width, height) {
            controller.pointer_pressed(ndc, now_ms);
        }
    }
    if let Some(touch) = touches.iter().find(|t| t.delta() != Vec2::ZERO) {
        if let Some(ndc) = window_to_ndc(touch.position(), width, height) {
            controller.pointer_moved(ndc, now_ms);
        }
    }
    if touches.iter_just_released().next().is_some()
        || touches.iter_just_canceled().next().is_some()
    {
        controller.pointer_released();
    }

    let cursor = window.cursor_position();
    match cursor {
        Some(position) if *last_cursor != cursor => {
            if let Some(ndc) = window_to_ndc(position, width, height) {
                controller.pointer_moved(ndc, now_ms);
            }
        }
        None if last_cursor.is_some() => controller.pointer_left(),
        _ => {}
    }
    *last_cursor = cursor;

    if mouse.just_pressed(MouseButton::Left) {
        if let Some(ndc) = cursor.and_then(|p| window_to_ndc(p, width, height)) {
            controller.pointer_pressed(ndc, now_ms);
        }
    }
    if mouse.just_released(MouseButton::Left) {
        controller.pointer_released();
    }
}

fn simulate_system(time: Res<Time>, mut controller: ResMut<SimulationController>) {
    controller.0.frame(time.delta_secs());
}

fn sync_bodies_system(
    controller: Res<SimulationController>,
    mut bodies: Query<(&DriftBody, &mut Transform)>,
) {
    let poses = controller.0.poses();
    for (body, mut transform) in bodies.iter_mut() {
        if let Some(pose) = poses.iter().find(|pose| pose.index == body.index) {
            transform.translation = pose.translation;
            transform.rotation = pose.rotation;
        }
    }
}

/// Replace the platform box whenever the static geometry was rebuilt.
fn sync_platform_system(
    mut commands: Commands,
    controller: Res<SimulationController>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    existing: Query<Entity, With<PlatformVisual>>,
    mut drawn_generation: Local<u64>,
) {
    let generation = controller.0.statics().generation();
    if generation == *drawn_generation {
        return;
    }
    *drawn_generation = generation;

    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }

    if let Some(platform) = controller.0.platform() {
        let size = platform.size();
        commands.spawn((
            Mesh3d(meshes.add(Cuboid::new(size.x, size.y, size.z))),
            MeshMaterial3d(materials.add(Color::srgb_u8(0x22, 0x22, 0x22))),
            Transform::from_translation(platform.center),
            PlatformVisual,
        ));
    }
}

fn teardown_on_exit(
    mut exits: MessageReader<AppExit>,
    mut controller: ResMut<SimulationController>,
) {
    if exits.read().next().is_some() {
        controller.0.teardown();
    }
}
