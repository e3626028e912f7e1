use bevy::math::{Vec2, Vec3};
use drift_physics::controller::PressOutcome;
use drift_physics::{
    DeviceClass, DeviceProfile, DriftConfig, DriftController, HostSignals, Orientation,
    PushVariant, SimulationMode,
};

const FRAME: f32 = 1.0 / 60.0;

fn signals(class: DeviceClass, width: f32, height: f32) -> HostSignals {
    HostSignals {
        width,
        height,
        profile: DeviceProfile {
            class,
            orientation: Orientation::from_size(width, height),
        },
    }
}

/// Mobile landscape at the reference window size.
fn gravity_signals() -> HostSignals {
    signals(DeviceClass::Mobile, 1024.0, 768.0)
}

fn float_signals() -> HostSignals {
    signals(DeviceClass::Desktop, 1024.0, 768.0)
}

fn single_body_config() -> DriftConfig {
    let mut config = DriftConfig::default();
    config.body.count = 1;
    config
}

fn controller(config: DriftConfig, host: HostSignals) -> DriftController {
    let mut controller = DriftController::with_seed(config, 42);
    controller.update_environment(host);
    controller.populate();
    controller
}

/// NDC of a point on the z = 0 plane. The viewport extents are exactly the
/// visible rectangle of that plane.
fn ndc_of(controller: &DriftController, world: Vec2) -> Vec2 {
    world / controller.viewport().as_vec2()
}

fn body_position(controller: &DriftController, index: usize) -> Vec2 {
    let pose = controller.poses()[index];
    Vec2::new(pose.translation.x, pose.translation.y)
}

// =============================================================================
// Pool lifecycle
// =============================================================================

#[test]
fn test_model_ready_spawns_five_bodies() {
    let controller = controller(DriftConfig::default(), float_signals());
    let rotation_speed = controller.config().float_field.rotation_speed;

    assert_eq!(controller.pool().len(), 5);
    assert_eq!(controller.pool().float_states().len(), 5);
    assert_eq!(controller.poses().len(), 5);
    for state in controller.pool().float_states() {
        assert!(state.rotation_speed >= 0.5 * rotation_speed);
        assert!(state.rotation_speed <= 1.0 * rotation_speed);
    }
}

#[test]
fn test_populate_twice_keeps_five() {
    let mut controller = controller(DriftConfig::default(), float_signals());
    assert_eq!(controller.populate(), 0);
    assert_eq!(controller.pool().len(), 5);
    assert_eq!(controller.physics().dynamic_body_count(), 5);
}

#[test]
fn test_bodies_stay_on_plane() {
    let mut controller = controller(DriftConfig::default(), float_signals());
    for _ in 0..120 {
        controller.frame(FRAME);
    }
    for pose in controller.poses() {
        assert!(pose.translation.z.abs() < 1e-4, "z = {}", pose.translation.z);
    }
}

// =============================================================================
// Mode selection and static geometry
// =============================================================================

#[test]
fn test_switch_to_gravity_builds_platform() {
    let mut controller = controller(DriftConfig::default(), float_signals());
    assert_eq!(controller.gravity(), Vec3::ZERO);
    assert!(controller.platform().is_none());

    assert!(controller.update_environment(gravity_signals()));

    assert_eq!(controller.mode(), SimulationMode::GravityPlatform);
    assert_eq!(controller.gravity(), Vec3::new(0.0, -9.82, 0.0));

    let platform = controller.platform().expect("platform in gravity mode");
    let half_height = controller.viewport().half_height;
    let expected = -half_height + 0.8 + 0.6 / 2.0;
    assert!(
        (platform.center.y - expected).abs() < 1e-5,
        "platform y {} expected {}",
        platform.center.y,
        expected
    );
    assert!(platform.center.y - platform.half_extents.y > -half_height);
}

#[test]
fn test_switch_back_to_float_removes_platform() {
    let mut controller = controller(DriftConfig::default(), gravity_signals());
    assert!(controller.platform().is_some());

    controller.update_environment(signals(DeviceClass::Mobile, 768.0, 1024.0));

    assert_eq!(controller.mode(), SimulationMode::Float);
    assert!(controller.platform().is_none());
    assert_eq!(controller.gravity(), Vec3::ZERO);
    assert_eq!(controller.physics().fixed_body_count(), 4);
}

#[test]
fn test_rapid_resizes_never_accumulate_colliders() {
    let mut controller = controller(DriftConfig::default(), float_signals());

    for i in 0..100 {
        let (w, h) = if i % 3 == 0 {
            (900.0 + i as f32, 500.0)
        } else {
            (500.0, 900.0 + i as f32)
        };
        controller.update_environment(signals(DeviceClass::Mobile, w, h));
        let expected = if controller.mode() == SimulationMode::GravityPlatform {
            5
        } else {
            4
        };
        assert_eq!(controller.physics().fixed_body_count(), expected);
    }
    // 5 dynamic bodies + walls (+ platform)
    assert!(controller.physics().collider_set.len() <= 10);
}

#[test]
fn test_reference_viewport_extents() {
    let controller = controller(DriftConfig::default(), float_signals());
    let viewport = controller.viewport();
    assert!((viewport.half_height - 6.14).abs() < 0.01);
    assert!((viewport.half_width - 8.19).abs() < 0.01);
}

#[test]
fn test_shrinking_window_pulls_bodies_inside() {
    let mut controller = controller(DriftConfig::default(), float_signals());

    // Very narrow portrait window: half width ~ 1.2
    controller.update_environment(signals(DeviceClass::Desktop, 120.0, 768.0));
    let viewport = controller.viewport();

    for pose in controller.poses() {
        assert!(pose.translation.x.abs() <= viewport.half_width + 1e-4);
        assert!(pose.translation.y.abs() <= viewport.half_height + 1e-4);
    }
}

// =============================================================================
// Float mode
// =============================================================================

#[test]
fn test_float_mode_bodies_stay_inside_boundary() {
    let mut controller = controller(DriftConfig::default(), float_signals());
    let viewport = controller.viewport();

    for frame in 0..1200 {
        controller.frame(FRAME);
        for pose in controller.poses() {
            assert!(
                viewport.contains(Vec2::new(pose.translation.x, pose.translation.y)),
                "body {} escaped at frame {}: {:?}",
                pose.index,
                frame,
                pose.translation
            );
        }
    }
}

#[test]
fn test_float_mode_speed_stays_bounded() {
    let mut controller = controller(single_body_config(), float_signals());
    let field = controller.config().float_field.clone();
    let bound = field.max_velocity + field.boundary_push_speed;

    for frame in 0..1200 {
        controller.frame(FRAME);
        let speed = controller.body_velocity(0).unwrap().length();
        assert!(speed <= bound, "speed {} at frame {}", speed, frame);
    }
}

#[test]
fn test_no_drift_before_first_window() {
    let mut controller = DriftController::with_seed(single_body_config(), 42);
    controller.populate();
    let before = controller.body_velocity(0).unwrap();

    for _ in 0..10 {
        controller.frame(FRAME);
    }

    // Only damping acts; no boundary push from an empty viewport
    let after = controller.body_velocity(0).unwrap();
    assert!(after.length() <= before.length() + 1e-5);
    assert!(
        (after - before).length() < 0.05,
        "before {:?} after {:?}",
        before,
        after
    );
}

#[test]
fn test_float_mode_bodies_keep_moving() {
    let mut controller = controller(DriftConfig::default(), float_signals());
    let start = controller.poses();

    for _ in 0..120 {
        controller.frame(FRAME);
    }

    let moved = controller
        .poses()
        .iter()
        .zip(start.iter())
        .filter(|(a, b)| (a.translation - b.translation).length() > 0.05)
        .count();
    assert!(moved > 0, "drift field should move bodies");
}

#[test]
fn test_engine_less_integration_stays_inside() {
    let mut config = DriftConfig::default();
    config.features.use_physics_engine = false;
    let mut controller = controller(config, float_signals());
    let viewport = controller.viewport();
    let start = body_position(&controller, 0);

    for _ in 0..1200 {
        controller.frame(FRAME);
        for pose in controller.poses() {
            assert!(viewport.contains(Vec2::new(pose.translation.x, pose.translation.y)));
            assert_eq!(pose.translation.z, 0.0);
        }
    }
    assert_ne!(body_position(&controller, 0), start);
}

// =============================================================================
// Gravity mode
// =============================================================================

#[test]
fn test_gravity_mode_bodies_land_on_platform() {
    let mut controller = controller(DriftConfig::default(), gravity_signals());
    let platform = controller.platform().unwrap();
    let top = platform.center.y + platform.half_extents.y;

    for _ in 0..600 {
        controller.frame(FRAME);
    }

    for pose in controller.poses() {
        assert!(
            pose.translation.y > top,
            "body {} at y {} fell through platform top {}",
            pose.index,
            pose.translation.y,
            top
        );
    }
}

#[test]
fn test_engine_less_bodies_rest_on_platform() {
    let mut config = DriftConfig::default();
    config.features.use_physics_engine = false;
    let mut controller = controller(config, gravity_signals());
    let platform = controller.platform().unwrap();
    let floor = platform.center.y + platform.half_extents.y + 0.8;

    for frame in 0..600 {
        controller.frame(FRAME);
        for pose in controller.poses() {
            assert!(
                pose.translation.y >= floor - 1e-4,
                "body {} sank to y {} at frame {}",
                pose.index,
                pose.translation.y,
                frame
            );
        }
    }

    for index in 0..controller.pool().len() {
        assert!((body_position(&controller, index).y - floor).abs() < 1e-4);
        assert!(controller.body_velocity(index).unwrap().y.abs() < 1e-4);
    }
}

#[test]
fn test_no_drift_field_in_gravity_mode() {
    let mut config = single_body_config();
    config.features.enable_platform = false;
    let mut controller = controller(config, gravity_signals());

    controller.frame(FRAME);

    let v = controller.body_velocity(0).unwrap();
    assert!(v.x.abs() < 1e-5, "no horizontal drift, vx = {}", v.x);
    assert!(v.y < 0.0, "falling");
}

// =============================================================================
// Grab / drag / throw
// =============================================================================

fn grab_single(controller: &mut DriftController, now_ms: f64) -> Vec2 {
    let start = body_position(controller, 0);
    let ndc = ndc_of(controller, start);
    assert_eq!(
        controller.pointer_pressed(ndc, now_ms),
        PressOutcome::Grabbed(0)
    );
    start
}

#[test]
fn test_grab_makes_body_kinematic_and_still() {
    let mut controller = controller(single_body_config(), gravity_signals());
    controller.frame(FRAME);

    grab_single(&mut controller, 0.0);

    assert_eq!(controller.grabbed_index(), Some(0));
    assert_eq!(controller.body_is_kinematic(0), Some(true));
    assert_eq!(controller.body_velocity(0), Some(Vec2::ZERO));
    assert_eq!(controller.body_angular_velocity(0), Some(0.0));
    let gesture = controller.gesture().unwrap();
    assert!(gesture.offset.length() < 1e-3, "grabbed at the center");
    assert_eq!(gesture.velocity_estimate, Vec2::ZERO);
}

#[test]
fn test_grab_miss_is_noop() {
    let mut controller = controller(single_body_config(), gravity_signals());
    let start = body_position(&controller, 0);
    // Far corner, away from the body
    let away = Vec2::new(-start.x.signum(), -start.y.signum()) * 0.95;

    assert_eq!(controller.pointer_pressed(away, 0.0), PressOutcome::Ignored);
    assert!(controller.gesture().is_none());
    assert_eq!(controller.body_is_kinematic(0), Some(false));
}

#[test]
fn test_drag_moves_body_with_pointer() {
    let mut controller = controller(single_body_config(), gravity_signals());
    let start = grab_single(&mut controller, 0.0);

    let target = start + Vec2::new(1.0, 0.5);
    let moved = controller
        .pointer_moved(ndc_of(&controller, target), 16.0)
        .unwrap();

    assert!((moved - target).length() < 1e-3);
    assert!((body_position(&controller, 0) - target).length() < 1e-3);

    // Kinematic body does not fall while held
    controller.frame(FRAME);
    assert!((body_position(&controller, 0) - target).length() < 1e-3);
}

#[test]
fn test_drag_is_clamped_to_boundary() {
    let mut controller = controller(single_body_config(), gravity_signals());
    let start = grab_single(&mut controller, 0.0);
    let viewport = controller.viewport();

    let half = controller.config().body.half_extents();

    // Way past the right edge (the ray still hits the plane)
    let ndc = Vec2::new(3.0, ndc_of(&controller, start).y);
    let moved = controller.pointer_moved(ndc, 16.0).unwrap();

    // The held box stays clear of the wall, like confined bodies do
    assert!(
        (moved.x - (viewport.half_width - half.x)).abs() < 1e-4,
        "x = {}",
        moved.x
    );

    let ndc = Vec2::new(ndc_of(&controller, start).x, -3.0);
    let moved = controller.pointer_moved(ndc, 32.0).unwrap();
    assert!(moved.y >= -(viewport.half_height - half.y) - 1e-4);
}

#[test]
fn test_throws_into_walls_stay_inside() {
    let mut controller = controller(single_body_config(), gravity_signals());
    let viewport = controller.viewport();
    let directions = [
        Vec2::X,
        Vec2::NEG_X,
        Vec2::Y,
        Vec2::new(1.0, 1.0).normalize(),
        Vec2::new(-1.0, 1.0).normalize(),
    ];
    let mut now_ms = 0.0;

    for cycle in 0..20 {
        let direction = directions[cycle % directions.len()];
        let start = body_position(&controller, 0);
        assert_eq!(
            controller.pointer_pressed(ndc_of(&controller, start), now_ms),
            PressOutcome::Grabbed(0),
            "cycle {}",
            cycle
        );
        let far = start + direction * 20.0;
        controller.pointer_moved(ndc_of(&controller, far), now_ms + 10.0);
        controller.pointer_released();
        now_ms += 10_000.0;

        for frame in 0..120 {
            controller.frame(FRAME);
            let position = body_position(&controller, 0);
            assert!(
                viewport.contains(position),
                "cycle {} frame {}: {:?} outside {:?}",
                cycle,
                frame,
                position,
                viewport
            );
        }
    }
}

#[test]
fn test_throw_matches_drag_velocity() {
    let mut controller = controller(single_body_config(), gravity_signals());
    let start = grab_single(&mut controller, 1000.0);

    // 0.5 units over 100 ms -> 0.005 units/ms * 800 = 4 units/s
    let end = start + Vec2::new(0.5, 0.0);
    controller.pointer_moved(ndc_of(&controller, end), 1100.0);
    let throw = controller.pointer_released().expect("release throws");

    assert!(
        (throw.linvel - Vec2::new(4.0, 0.0)).length() < 1e-2,
        "throw velocity {:?}",
        throw.linvel
    );
    let v = controller.body_velocity(0).unwrap();
    assert!((v - Vec2::new(4.0, 0.0)).length() < 1e-2);
    assert!(throw.spin.abs() <= 5.0);
    assert_eq!(controller.body_is_kinematic(0), Some(false));
    assert!(controller.gesture().is_none());
}

#[test]
fn test_fast_throw_is_clamped_to_max_speed() {
    let mut controller = controller(single_body_config(), gravity_signals());
    let start = grab_single(&mut controller, 500.0);

    // (2, 0) units/ms -> (1600, 0) -> clamped to (8, 0)
    let end = start + Vec2::new(2.0, 0.0);
    controller.pointer_moved(ndc_of(&controller, end), 501.0);
    let throw = controller.pointer_released().unwrap();

    assert!(
        (throw.linvel - Vec2::new(8.0, 0.0)).length() < 1e-3,
        "throw velocity {:?}",
        throw.linvel
    );
}

#[test]
fn test_throw_direction_follows_drag() {
    let mut controller = controller(single_body_config(), gravity_signals());
    let start = grab_single(&mut controller, 0.0);

    let end = start + Vec2::new(-0.3, 0.4);
    controller.pointer_moved(ndc_of(&controller, end), 50.0);
    let throw = controller.pointer_released().unwrap();

    let direction = throw.linvel.normalize();
    assert!((direction - Vec2::new(-0.6, 0.8)).length() < 1e-2);
    // 0.5 / 50 * 800 = 8, exactly the cap
    assert!((throw.linvel.length() - 8.0).abs() < 1e-2);
}

#[test]
fn test_zero_final_motion_throws_nothing() {
    for scale in [800.0, 1.0e6] {
        let mut config = single_body_config();
        config.throw.scale = scale;
        let mut controller = controller(config, gravity_signals());
        let start = grab_single(&mut controller, 0.0);

        let away = start + Vec2::new(1.0, 0.0);
        controller.pointer_moved(ndc_of(&controller, away), 20.0);
        controller.pointer_moved(ndc_of(&controller, start), 40.0);
        controller.pointer_moved(ndc_of(&controller, start), 60.0);
        let throw = controller.pointer_released().unwrap();

        assert!(
            throw.linvel.length() < 1e-2,
            "scale {} threw {:?}",
            scale,
            throw.linvel
        );
        assert!(throw.spin.abs() < 1e-2);
    }
}

#[test]
fn test_same_timestamp_drag_does_not_blow_up() {
    let mut controller = controller(single_body_config(), gravity_signals());
    let start = grab_single(&mut controller, 100.0);

    let end = start + Vec2::new(0.001, 0.0);
    controller.pointer_moved(ndc_of(&controller, end), 100.0);

    let estimate = controller.gesture().unwrap().velocity_estimate;
    assert!(estimate.is_finite());
    assert!((estimate.x - 0.001).abs() < 1e-4, "divided by 1 ms");
}

#[test]
fn test_release_without_grab_is_noop() {
    let mut controller = controller(single_body_config(), gravity_signals());
    assert!(controller.pointer_released().is_none());
    assert_eq!(controller.body_velocity(0), Some(Vec2::ZERO));
}

#[test]
fn test_second_grab_while_holding_is_ignored() {
    let mut controller = controller(single_body_config(), gravity_signals());
    let start = grab_single(&mut controller, 0.0);

    assert_eq!(
        controller.pointer_pressed(ndc_of(&controller, start), 10.0),
        PressOutcome::Ignored
    );
    assert_eq!(controller.grabbed_index(), Some(0));
}

#[test]
fn test_grab_disabled_by_flag() {
    let mut config = single_body_config();
    config.features.enable_grab = false;
    let mut controller = controller(config, gravity_signals());
    let start = body_position(&controller, 0);

    assert_eq!(
        controller.pointer_pressed(ndc_of(&controller, start), 0.0),
        PressOutcome::Ignored
    );
}

#[test]
fn test_no_grab_in_float_mode() {
    let mut controller = controller(single_body_config(), float_signals());
    let start = body_position(&controller, 0);

    let outcome = controller.pointer_pressed(ndc_of(&controller, start), 0.0);

    assert_ne!(outcome, PressOutcome::Grabbed(0));
    assert!(controller.gesture().is_none());
}

#[test]
fn test_stale_grab_after_pool_reset() {
    let mut controller = controller(single_body_config(), gravity_signals());
    let start = grab_single(&mut controller, 0.0);

    controller.reset_pool();

    assert_eq!(controller.grabbed_index(), None);
    let fresh = body_position(&controller, 0);
    assert!(controller
        .pointer_moved(ndc_of(&controller, start + Vec2::ONE), 20.0)
        .is_none());
    assert!(controller.pointer_released().is_none());
    assert!(controller.gesture().is_none());
    assert_eq!(body_position(&controller, 0), fresh, "new body untouched");
    assert_eq!(controller.body_is_kinematic(0), Some(false));
}

#[test]
fn test_leaving_gravity_mode_cancels_grab() {
    let mut controller = controller(single_body_config(), gravity_signals());
    grab_single(&mut controller, 0.0);

    controller.update_environment(signals(DeviceClass::Mobile, 768.0, 1024.0));

    assert!(controller.gesture().is_none());
    assert_eq!(controller.body_is_kinematic(0), Some(false));
    assert_eq!(controller.body_velocity(0), Some(Vec2::ZERO));
}

// =============================================================================
// Pointer push
// =============================================================================

fn float_controller(config: DriftConfig) -> DriftController {
    controller(config, float_signals())
}

#[test]
fn test_discrete_click_pushes_once() {
    let mut config = single_body_config();
    config.push_variant = PushVariant::DiscreteClick;
    let mut controller = float_controller(config);
    let start = body_position(&controller, 0);
    let before = controller.body_velocity(0).unwrap();

    let outcome = controller.pointer_pressed(ndc_of(&controller, start), 0.0);

    assert_eq!(outcome, PressOutcome::Pushed(0));
    let after = controller.body_velocity(0).unwrap();
    let expected_dir = start.normalize_or_zero();
    assert!((after - before).dot(expected_dir) > 0.0, "pushed away from center");
}

#[test]
fn test_engine_less_click_push_lands_without_a_step() {
    let mut config = single_body_config();
    config.push_variant = PushVariant::DiscreteClick;
    config.features.use_physics_engine = false;
    let mut controller = float_controller(config);
    let start = body_position(&controller, 0);
    let before = controller.body_velocity(0).unwrap();

    let outcome = controller.pointer_pressed(ndc_of(&controller, start), 0.0);

    assert_eq!(outcome, PressOutcome::Pushed(0));
    let dir = (start.extend(0.0) - Vec3::new(0.0, 0.0, 8.0)).normalize();
    let expected = Vec2::new(dir.x, dir.y) * 5.0;
    let delta = controller.body_velocity(0).unwrap() - before;
    assert!(
        (delta - expected).length() < 1e-3,
        "delta {:?} expected {:?}",
        delta,
        expected
    );
}

#[test]
fn test_click_miss_is_noop() {
    let mut config = single_body_config();
    config.push_variant = PushVariant::DiscreteClick;
    let mut controller = float_controller(config);
    let start = body_position(&controller, 0);
    let before = controller.body_velocity(0);
    let away = Vec2::new(-start.x.signum(), -start.y.signum()) * 0.95;

    assert_eq!(controller.pointer_pressed(away, 0.0), PressOutcome::Ignored);
    assert_eq!(controller.body_velocity(0), before);
}

#[test]
fn test_hover_pushes_every_frame_only_in_hover_variant() {
    let run = |variant: PushVariant, hover: bool| {
        let mut config = single_body_config();
        config.push_variant = variant;
        let mut controller = float_controller(config);
        let start = body_position(&controller, 0);
        if hover {
            controller.pointer_moved(ndc_of(&controller, start), 0.0);
        }
        controller.frame(FRAME);
        controller.body_velocity(0).unwrap()
    };

    let idle = run(PushVariant::ContinuousHover, false);
    let hovered = run(PushVariant::ContinuousHover, true);
    assert_ne!(idle, hovered, "hover variant pushes the hovered body");

    let click_idle = run(PushVariant::DiscreteClick, false);
    let click_hovered = run(PushVariant::DiscreteClick, true);
    assert_eq!(click_idle, click_hovered, "click variant ignores hovering");
}

#[test]
fn test_hover_variant_ignores_clicks() {
    let mut controller = float_controller(single_body_config());
    let start = body_position(&controller, 0);

    assert_eq!(
        controller.pointer_pressed(ndc_of(&controller, start), 0.0),
        PressOutcome::Ignored
    );
}

#[test]
fn test_pointer_left_stops_hover() {
    let run = |hover: bool, leave: bool| {
        let mut controller = float_controller(single_body_config());
        let start = body_position(&controller, 0);
        if hover {
            controller.pointer_moved(ndc_of(&controller, start), 0.0);
        }
        if leave {
            controller.pointer_left();
        }
        controller.frame(FRAME);
        controller.body_velocity(0).unwrap()
    };

    let baseline = run(false, false);
    assert_eq!(run(true, true), baseline);
    assert_ne!(run(true, false), baseline);
}

// =============================================================================
// Teardown
// =============================================================================

#[test]
fn test_teardown_removes_static_geometry() {
    let mut controller = controller(DriftConfig::default(), gravity_signals());
    grab_single_any(&mut controller);

    controller.teardown();

    assert_eq!(controller.physics().fixed_body_count(), 0);
    assert!(controller.platform().is_none());
    assert!(controller.gesture().is_none());
    assert_eq!(controller.physics().dynamic_body_count(), 5);
}

fn grab_single_any(controller: &mut DriftController) {
    let start = body_position(controller, 0);
    controller.pointer_pressed(ndc_of(controller, start), 0.0);
}
