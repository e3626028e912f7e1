use bevy::prelude::*;
use drift_debug_ui::DebugUiPlugin;
use drift_physics::{DriftConfig, DriftPhysicsPlugin};

fn main() {
    let config = load_config();

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Ghost Drift".into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(DriftPhysicsPlugin::new(config))
        .add_plugins(DebugUiPlugin)
        .insert_resource(ClearColor(Color::srgb_u8(0x11, 0x11, 0x11)))
        .run();
}

/// Optional JSON config as the first argument; defaults otherwise.
fn load_config() -> DriftConfig {
    let Some(path) = std::env::args().nth(1) else {
        return DriftConfig::default();
    };
    match DriftConfig::load(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path);
            config
        }
        Err(err) => {
            error!("Failed to load config {}: {}, using defaults", path, err);
            DriftConfig::default()
        }
    }
}
