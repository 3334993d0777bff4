#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure collision response system for player contacts.
//!
//! The responder never mutates the world. Each contact is turned into a new
//! [`GameState`] and a list of [`Effect`] descriptors; the caller executes
//! the effects and later hands every [`Completion`] back to
//! [`CollisionResponder::resolve`] once the associated animation finished.

use std::time::Duration;

use marble_maze_core::{
    Action, Completion, Effect, EntityId, EntitySnapshot, GameState, RegistryError, TileKind,
};
use marble_maze_world::EntityRegistry;

/// Scale the player shrinks to before it is removed.
pub const SHRUNK_SCALE: f32 = 0.0001;

/// Durations of the transitions scheduled by the responder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponderConfig {
    death_move: Duration,
    death_shrink: Duration,
    teleport_move: Duration,
    teleport_fade: Duration,
    finish_move: Duration,
    finish_shrink: Duration,
    respawn_delay: Duration,
}

impl ResponderConfig {
    /// Creates a configuration from explicit durations.
    #[must_use]
    pub const fn new(
        death_move: Duration,
        death_shrink: Duration,
        teleport_move: Duration,
        teleport_fade: Duration,
        finish_move: Duration,
        finish_shrink: Duration,
        respawn_delay: Duration,
    ) -> Self {
        Self {
            death_move,
            death_shrink,
            teleport_move,
            teleport_fade,
            finish_move,
            finish_shrink,
            respawn_delay,
        }
    }

    /// Time the player takes to slide into a vortex.
    #[must_use]
    pub const fn death_move(&self) -> Duration {
        self.death_move
    }

    /// Time the player takes to shrink inside a vortex.
    #[must_use]
    pub const fn death_shrink(&self) -> Duration {
        self.death_shrink
    }

    /// Time the player takes to slide onto a teleport.
    #[must_use]
    pub const fn teleport_move(&self) -> Duration {
        self.teleport_move
    }

    /// Time each fade of a teleport transition takes.
    #[must_use]
    pub const fn teleport_fade(&self) -> Duration {
        self.teleport_fade
    }

    /// Time the player takes to slide onto the finish.
    #[must_use]
    pub const fn finish_move(&self) -> Duration {
        self.finish_move
    }

    /// Time the player takes to shrink on the finish.
    #[must_use]
    pub const fn finish_shrink(&self) -> Duration {
        self.finish_shrink
    }

    /// Pause between loading the next level and spawning the player.
    #[must_use]
    pub const fn respawn_delay(&self) -> Duration {
        self.respawn_delay
    }
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(250),
            Duration::from_millis(250),
            Duration::from_millis(200),
            Duration::from_millis(200),
            Duration::from_millis(250),
            Duration::from_millis(250),
            Duration::from_millis(500),
        )
    }
}

/// Contact-begin notification between the player and another entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// Live player entity.
    pub player: EntityId,
    /// Entity the player touched.
    pub other: EntitySnapshot,
}

/// Outcome of a collision or completion decision.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// Game state after the decision.
    pub state: GameState,
    /// Effects the caller must execute, in order.
    pub effects: Vec<Effect>,
}

impl Response {
    fn unchanged(state: GameState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }

    /// Reports whether the response neither changes state nor requests effects.
    #[must_use]
    pub fn is_noop(&self, previous: &GameState) -> bool {
        self.effects.is_empty() && self.state == *previous
    }
}

/// Decides how the game reacts to player contacts and finished transitions.
#[derive(Clone, Debug, Default)]
pub struct CollisionResponder {
    config: ResponderConfig,
}

impl CollisionResponder {
    /// Creates a responder using the provided timings.
    #[must_use]
    pub const fn new(config: ResponderConfig) -> Self {
        Self { config }
    }

    /// Timings used for scheduled transitions.
    #[must_use]
    pub const fn config(&self) -> &ResponderConfig {
        &self.config
    }

    /// Computes the response to a single contact-begin event.
    ///
    /// Vortex, finish and teleport contacts arriving while a death or level
    /// transition is in flight are ignored, as are teleport contacts while the
    /// teleporters are disarmed. Stars are collected regardless.
    /// Fails only when a teleport contact cannot be paired.
    pub fn respond(
        &self,
        contact: Contact,
        state: GameState,
        registry: &EntityRegistry,
    ) -> Result<Response, RegistryError> {
        let other = contact.other;
        match other.kind {
            TileKind::Vortex if !state.is_game_over => Ok(self.die(contact, state)),
            TileKind::Star => Ok(collect(other.id, state)),
            TileKind::Teleport if state.teleports_open && !state.is_game_over => {
                self.teleport(contact, state, registry)
            }
            TileKind::Finish if !state.is_game_over => Ok(self.finish(contact, state)),
            _ => Ok(Response::unchanged(state)),
        }
    }

    /// Computes the response to a finished transition.
    #[must_use]
    pub fn resolve(&self, completion: Completion, mut state: GameState) -> Response {
        let effects = match completion {
            Completion::SpawnPlayer => vec![Effect::SpawnPlayer],
            Completion::ClearGameOver => {
                state.is_game_over = false;
                Vec::new()
            }
            Completion::OpenTeleports => {
                state.teleports_open = true;
                Vec::new()
            }
            Completion::EnablePlayerDynamics => vec![Effect::SetPlayerDynamic(true)],
            Completion::AdvanceLevel => {
                let next = state.current_level.next();
                log::info!("advancing from level {} to {next}", state.current_level);
                state.current_level = next;
                vec![
                    Effect::LoadLevel(next),
                    Effect::Delay {
                        duration: self.config.respawn_delay,
                        then: vec![Completion::SpawnPlayer, Completion::ClearGameOver],
                    },
                ]
            }
        };
        Response { state, effects }
    }

    fn die(&self, contact: Contact, mut state: GameState) -> Response {
        state.is_game_over = true;
        state.score -= 1;
        log::info!(
            "player {} fell into vortex {}, score {}",
            contact.player,
            contact.other.id,
            state.score
        );

        let action = Action::Sequence(vec![
            Action::move_to(contact.other.position(), self.config.death_move),
            Action::scale_to(SHRUNK_SCALE, self.config.death_shrink),
            Action::Remove,
        ]);
        Response {
            state,
            effects: vec![
                Effect::SetPlayerDynamic(false),
                Effect::Animate {
                    entity: contact.player,
                    action,
                    then: vec![
                        Completion::SpawnPlayer,
                        Completion::ClearGameOver,
                        Completion::OpenTeleports,
                    ],
                },
            ],
        }
    }

    fn teleport(
        &self,
        contact: Contact,
        mut state: GameState,
        registry: &EntityRegistry,
    ) -> Result<Response, RegistryError> {
        let destination = registry.other_teleport(contact.other.id)?;
        state.teleports_open = false;
        log::debug!(
            "teleporting player {} from {} to {}",
            contact.player,
            contact.other.id,
            destination.id
        );

        let action = Action::Sequence(vec![
            Action::move_to(contact.other.position(), self.config.teleport_move),
            Action::fade_to(0.0, self.config.teleport_fade),
            Action::move_to(destination.position, Duration::ZERO),
            Action::fade_to(1.0, self.config.teleport_fade),
        ]);
        Ok(Response {
            state,
            effects: vec![
                Effect::SetPlayerDynamic(false),
                Effect::Animate {
                    entity: contact.player,
                    action,
                    then: vec![Completion::EnablePlayerDynamics, Completion::OpenTeleports],
                },
            ],
        })
    }

    fn finish(&self, contact: Contact, mut state: GameState) -> Response {
        state.is_game_over = true;
        log::info!(
            "player {} reached the finish of level {}",
            contact.player,
            state.current_level
        );

        let action = Action::Sequence(vec![
            Action::move_to(contact.other.position(), self.config.finish_move),
            Action::scale_to(SHRUNK_SCALE, self.config.finish_shrink),
            Action::Remove,
        ]);
        Response {
            state,
            effects: vec![
                Effect::SetPlayerDynamic(false),
                Effect::Animate {
                    entity: contact.player,
                    action,
                    then: vec![Completion::AdvanceLevel],
                },
            ],
        }
    }
}

fn collect(star: EntityId, mut state: GameState) -> Response {
    state.score += 1;
    log::debug!("collected star {star}, score {}", state.score);
    Response {
        state,
        effects: vec![Effect::RemoveEntity(star)],
    }
}
