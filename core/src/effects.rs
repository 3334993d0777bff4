//! Deferred-effect descriptors emitted by collision responses.
//!
//! Responses never run animations themselves. They describe what should
//! happen as plain data and leave execution to an animation executor, which
//! reports [`Completion`] continuations back once a sequence has finished.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{EntityId, LevelIndex};

/// Timed action applied to a single entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Moves the entity to `target`; a zero duration relocates instantly.
    MoveTo {
        /// Destination in world units.
        target: Vec2,
        /// Time taken to reach the destination.
        duration: Duration,
    },
    /// Scales the entity uniformly to `scale`.
    ScaleTo {
        /// Final uniform scale.
        scale: f32,
        /// Time taken to reach the scale.
        duration: Duration,
    },
    /// Fades the entity to `alpha`.
    FadeTo {
        /// Final opacity in the range 0.0..=1.0.
        alpha: f32,
        /// Time taken to reach the opacity.
        duration: Duration,
    },
    /// Rotates the entity by `radians` relative to its current rotation.
    RotateBy {
        /// Relative rotation.
        radians: f32,
        /// Time taken to complete the rotation.
        duration: Duration,
    },
    /// Does nothing for the provided duration.
    Wait {
        /// Length of the pause.
        duration: Duration,
    },
    /// Removes the entity from the world.
    Remove,
    /// Runs the contained actions one after another.
    Sequence(Vec<Action>),
    /// Repeats the contained action until the entity disappears.
    RepeatForever(Box<Action>),
}

impl Action {
    /// Shorthand for [`Action::MoveTo`].
    #[must_use]
    pub const fn move_to(target: Vec2, duration: Duration) -> Self {
        Self::MoveTo { target, duration }
    }

    /// Shorthand for [`Action::ScaleTo`].
    #[must_use]
    pub const fn scale_to(scale: f32, duration: Duration) -> Self {
        Self::ScaleTo { scale, duration }
    }

    /// Shorthand for [`Action::FadeTo`].
    #[must_use]
    pub const fn fade_to(alpha: f32, duration: Duration) -> Self {
        Self::FadeTo { alpha, duration }
    }

    /// Total running time, or `None` for actions that never finish.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::MoveTo { duration, .. }
            | Self::ScaleTo { duration, .. }
            | Self::FadeTo { duration, .. }
            | Self::RotateBy { duration, .. }
            | Self::Wait { duration } => Some(*duration),
            Self::Remove => Some(Duration::ZERO),
            Self::Sequence(actions) => actions
                .iter()
                .try_fold(Duration::ZERO, |total, action| {
                    action.duration().map(|duration| total + duration)
                }),
            Self::RepeatForever(_) => None,
        }
    }
}

/// Continuation executed once an animation or delay has finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Completion {
    /// Spawns a fresh player at the level's start position.
    SpawnPlayer,
    /// Lifts the game-over gate.
    ClearGameOver,
    /// Re-arms the teleporters.
    OpenTeleports,
    /// Hands the player back to the physics simulation.
    EnablePlayerDynamics,
    /// Moves on to the next level.
    AdvanceLevel,
}

/// Side effect requested by a collision response for a consumer to execute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Enables or disables physics simulation of the player body.
    SetPlayerDynamic(bool),
    /// Removes an entity permanently.
    RemoveEntity(EntityId),
    /// Runs an action on an entity and resolves `then` once it has finished.
    Animate {
        /// Entity the action is applied to.
        entity: EntityId,
        /// Action to run.
        action: Action,
        /// Continuations resolved after the action completes.
        then: Vec<Completion>,
    },
    /// Waits without touching any entity, then resolves `then`.
    Delay {
        /// Length of the pause.
        duration: Duration,
        /// Continuations resolved after the pause.
        then: Vec<Completion>,
    },
    /// Spawns a new player at the level's start position.
    SpawnPlayer,
    /// Loads the provided level, replacing every non-player entity.
    LoadLevel(LevelIndex),
}
