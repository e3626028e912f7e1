use bevy::prelude::*;
use bevy_mod_imgui::prelude::*;
use drift_physics::{DriftController, PoolResetRequest, SimulationController};

pub struct DebugUiPlugin;

impl Plugin for DebugUiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(bevy_mod_imgui::ImguiPlugin::default())
            .add_systems(Update, imgui_ui);
    }
}

fn imgui_ui(
    mut context: NonSendMut<ImguiContext>,
    mut controller: ResMut<SimulationController>,
    mut reset_requests: MessageWriter<PoolResetRequest>,
) {
    let ui = context.ui();

    ui.window("Drift")
        .size([320.0, 220.0], Condition::FirstUseEver)
        .build(|| {
            for line in status_lines(&controller.0) {
                ui.text(line);
            }
            ui.separator();

            let variant = controller.0.config().push_variant;
            if ui.button(format!("Push: {:?}", variant)) {
                controller.0.set_push_variant(variant.toggled());
            }

            ui.same_line();

            if ui.button("Reset Pool") {
                reset_requests.write(PoolResetRequest);
            }
        });
}

/// Read-only summary of the simulation for the panel.
pub fn status_lines(controller: &DriftController) -> Vec<String> {
    let viewport = controller.viewport();
    let gravity = controller.gravity();
    let grab = match controller.grabbed_index() {
        Some(index) => format!("body {}", index),
        None => "none".to_string(),
    };
    let platform = match controller.platform() {
        Some(platform) => format!("y = {:.2}", platform.center.y),
        None => "none".to_string(),
    };

    vec![
        format!("Mode: {}", controller.mode().label()),
        format!("Gravity: ({:.2}, {:.2}, {:.2})", gravity.x, gravity.y, gravity.z),
        format!(
            "Viewport: {:.2} x {:.2}",
            viewport.half_width * 2.0,
            viewport.half_height * 2.0
        ),
        format!("Bodies: {}", controller.pool().len()),
        format!("Platform: {}", platform),
        format!("Grab: {}", grab),
    ]
}
