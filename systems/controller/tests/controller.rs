use glam::Vec2;
use marble_maze_core::GameState;
use marble_maze_system_controller::{ControlInput, GameLoopController, GravityConfig};

fn running() -> GameState {
    GameState::default()
}

#[test]
fn pointer_pulls_towards_touch_location() {
    let controller = GameLoopController::default();

    let gravity = controller.gravity(
        &running(),
        ControlInput::pointer(Vec2::new(296.0, 72.0)),
        Some(Vec2::new(96.0, 672.0)),
    );

    assert_eq!(gravity, Some(Vec2::new(2.0, -6.0)));
}

#[test]
fn tilt_is_rotated_into_landscape_axes() {
    let controller = GameLoopController::default();

    let gravity = controller.gravity(&running(), ControlInput::tilt(Vec2::new(0.5, -0.25)), None);

    assert_eq!(gravity, Some(Vec2::new(12.5, 25.0)));
}

#[test]
fn pointer_wins_over_tilt() {
    let controller = GameLoopController::new(GravityConfig::new(10.0, 1.0));
    let input = ControlInput {
        pointer: Some(Vec2::new(20.0, 0.0)),
        tilt: Some(Vec2::new(1.0, 1.0)),
    };

    let gravity = controller.gravity(&running(), input, Some(Vec2::ZERO));

    assert_eq!(gravity, Some(Vec2::new(2.0, 0.0)));
}

#[test]
fn game_over_freezes_gravity() {
    let controller = GameLoopController::default();
    let mut state = running();
    state.is_game_over = true;

    assert_eq!(
        controller.gravity(&state, ControlInput::tilt(Vec2::ONE), None),
        None
    );
    assert_eq!(
        controller.gravity(&state, ControlInput::pointer(Vec2::ONE), Some(Vec2::ZERO)),
        None
    );
}

#[test]
fn missing_input_leaves_gravity_unchanged() {
    let controller = GameLoopController::default();

    assert_eq!(
        controller.gravity(&running(), ControlInput::default(), Some(Vec2::ZERO)),
        None
    );
    assert_eq!(
        controller.gravity(&running(), ControlInput::pointer(Vec2::ONE), None),
        None
    );
}

#[test]
fn disarmed_teleports_do_not_freeze_gravity() {
    let controller = GameLoopController::default();
    let mut state = running();
    state.teleports_open = false;

    assert!(controller
        .gravity(&state, ControlInput::tilt(Vec2::X), None)
        .is_some());
}
