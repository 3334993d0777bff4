#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-frame gravity computation driven by tilt or pointer input.

use glam::Vec2;
use marble_maze_core::GameState;

/// Constants converting raw input into a gravity vector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GravityConfig {
    pointer_divisor: f32,
    tilt_scale: f32,
}

impl GravityConfig {
    /// Creates a configuration with explicit constants.
    #[must_use]
    pub const fn new(pointer_divisor: f32, tilt_scale: f32) -> Self {
        Self {
            pointer_divisor,
            tilt_scale,
        }
    }

    /// Divisor applied to the pointer offset from the player.
    #[must_use]
    pub const fn pointer_divisor(&self) -> f32 {
        self.pointer_divisor
    }

    /// Multiplier applied to tilt readings.
    #[must_use]
    pub const fn tilt_scale(&self) -> f32 {
        self.tilt_scale
    }
}

impl Default for GravityConfig {
    fn default() -> Self {
        Self::new(100.0, 50.0)
    }
}

/// Input sampled for a single frame.
///
/// A pointer takes precedence over a tilt reading when both are present.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControlInput {
    /// Last pointer position in world units, while a drag is in progress.
    pub pointer: Option<Vec2>,
    /// Device acceleration reading in g.
    pub tilt: Option<Vec2>,
}

impl ControlInput {
    /// Input carrying only a pointer position.
    #[must_use]
    pub const fn pointer(position: Vec2) -> Self {
        Self {
            pointer: Some(position),
            tilt: None,
        }
    }

    /// Input carrying only a tilt reading.
    #[must_use]
    pub const fn tilt(acceleration: Vec2) -> Self {
        Self {
            pointer: None,
            tilt: Some(acceleration),
        }
    }
}

/// Records the pointer position between touch begin and touch end.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerTracker {
    last: Option<Vec2>,
}

impl PointerTracker {
    /// Creates a tracker with no active pointer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a pointer at `position`.
    pub fn begin(&mut self, position: Vec2) {
        self.last = Some(position);
    }

    /// Updates the tracked pointer position.
    pub fn moved(&mut self, position: Vec2) {
        self.last = Some(position);
    }

    /// Stops tracking the pointer.
    pub fn end(&mut self) {
        self.last = None;
    }

    /// Last known pointer position, if a drag is in progress.
    #[must_use]
    pub const fn position(&self) -> Option<Vec2> {
        self.last
    }
}

/// Turns frame input into the gravity vector forwarded to physics.
#[derive(Clone, Debug, Default)]
pub struct GameLoopController {
    config: GravityConfig,
}

impl GameLoopController {
    /// Creates a controller using the provided constants.
    #[must_use]
    pub const fn new(config: GravityConfig) -> Self {
        Self { config }
    }

    /// Constants used by the controller.
    #[must_use]
    pub const fn config(&self) -> &GravityConfig {
        &self.config
    }

    /// Computes the gravity for this frame.
    ///
    /// Returns `None` when gravity must stay unchanged: while a transition
    /// holds the game-over gate, when there is no input, or when pointer
    /// input arrives without a live player to measure from.
    #[must_use]
    pub fn gravity(
        &self,
        state: &GameState,
        input: ControlInput,
        player_position: Option<Vec2>,
    ) -> Option<Vec2> {
        if state.is_game_over {
            return None;
        }

        if let Some(pointer) = input.pointer {
            let player = player_position?;
            return Some((pointer - player) / self.config.pointer_divisor);
        }

        input.tilt.map(|acceleration| {
            Vec2::new(
                acceleration.y * -self.config.tilt_scale,
                acceleration.x * self.config.tilt_scale,
            )
        })
    }
}
