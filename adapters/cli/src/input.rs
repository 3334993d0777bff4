//! Converts adapter input into controller input.

use marble_maze_rendering::FrameInput;
use marble_maze_system_controller::{ControlInput, PointerTracker};

/// Feeds the frame's pointer into `tracker` and combines it with the tilt reading.
///
/// A pointer appearing starts a drag, a pointer that stays moves it and a
/// missing pointer ends it.
pub fn control_input(tracker: &mut PointerTracker, frame: FrameInput) -> ControlInput {
    match (frame.pointer_world, tracker.position()) {
        (Some(position), None) => tracker.begin(position),
        (Some(position), Some(_)) => tracker.moved(position),
        (None, Some(_)) => tracker.end(),
        (None, None) => {}
    }
    ControlInput {
        pointer: tracker.position(),
        tilt: frame.tilt,
    }
}
