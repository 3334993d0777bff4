//! Frame orchestration that ties the world, the pure systems and physics together.
//!
//! A [`Session`] is the only place where commands are submitted to the world.
//! Every event the world emits is mirrored into physics and the animator
//! before it is handed back to the caller, so the three stay consistent
//! within a single frame.

use std::time::Duration;

use glam::Vec2;
use marble_maze_core::{
    CellSize, Command, Completion, Effect, EntityId, EntitySnapshot, Event, GameState,
    LevelError, LevelIndex, RegistryError, TileKind,
};
use marble_maze_physics::{BodyDescriptor, Collider, ContactBegin, PhysicsError, PhysicsWorld};
use marble_maze_system_animation::{idle_action, AnimationOutput, Animator};
use marble_maze_system_collision::{CollisionResponder, Contact, ResponderConfig, Response};
use marble_maze_system_controller::{ControlInput, GameLoopController, GravityConfig};
use marble_maze_system_level_loader::{LevelLoader, LevelSource};
use marble_maze_world::{self as world, query, World};
use thiserror::Error;

/// Physical size and damping of the bodies created for entities.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyConfig {
    /// Radius of the player marble.
    pub player_radius: f32,
    /// Radius of circular tiles.
    pub tile_radius: f32,
    /// Linear damping applied to the player.
    pub linear_damping: f32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            player_radius: 30.0,
            tile_radius: 32.0,
            linear_damping: 0.5,
        }
    }
}

impl BodyConfig {
    fn descriptor(&self, entity: &EntitySnapshot, cell_size: CellSize) -> BodyDescriptor {
        let collider = match entity.kind {
            TileKind::Wall => Collider::Rectangle {
                half_extents: cell_size.extent() * 0.5,
            },
            TileKind::Player => Collider::Circle {
                radius: self.player_radius,
            },
            _ => Collider::Circle {
                radius: self.tile_radius,
            },
        };
        BodyDescriptor {
            collider,
            position: entity.position(),
            masks: entity.masks,
            dynamic: entity.dynamic,
            linear_damping: if entity.kind == TileKind::Player {
                self.linear_damping
            } else {
                0.0
            },
        }
    }
}

/// Tuning handed to the systems a session drives.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionConfig {
    /// Durations of the scripted transitions.
    pub responder: ResponderConfig,
    /// Constants turning input into gravity.
    pub gravity: GravityConfig,
    /// Shape and damping of physics bodies.
    pub bodies: BodyConfig,
}

/// Something observable that happened while running a frame.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// The world broadcast an event.
    World(Event),
    /// The finish of the last available level was reached.
    CampaignCompleted {
        /// Final score.
        score: i64,
        /// Last level that was played.
        last_level: LevelIndex,
    },
}

/// Failures that stop a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A level could not be acquired or parsed.
    #[error(transparent)]
    Level(#[from] LevelError),
    /// The world refused to materialise a level.
    #[error("level {level} was rejected: {reason}")]
    LevelRejected {
        /// Level that was rejected.
        level: LevelIndex,
        /// Registry failure raised by the layout.
        reason: RegistryError,
    },
    /// A teleport contact could not be paired.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Physics refused to create a body.
    #[error(transparent)]
    Physics(#[from] PhysicsError),
}

/// Running game: one world, its systems and a physics backend.
#[derive(Debug)]
pub struct Session<S, P> {
    world: World,
    loader: LevelLoader<S>,
    responder: CollisionResponder,
    controller: GameLoopController,
    animator: Animator,
    physics: P,
    bodies: BodyConfig,
    completed: bool,
    contacts: Vec<ContactBegin>,
    outputs: Vec<AnimationOutput>,
}

impl<S, P> Session<S, P>
where
    S: LevelSource,
    P: PhysicsWorld,
{
    /// Loads `first_level` and spawns the player.
    pub fn start(
        loader: LevelLoader<S>,
        physics: P,
        config: SessionConfig,
        first_level: LevelIndex,
    ) -> Result<Self, SessionError> {
        let mut session = Self {
            world: World::with_state(GameState::new(first_level)),
            loader,
            responder: CollisionResponder::new(config.responder),
            controller: GameLoopController::new(config.gravity),
            animator: Animator::new(),
            physics,
            bodies: config.bodies,
            completed: false,
            contacts: Vec::new(),
            outputs: Vec::new(),
        };

        let mut out = Vec::new();
        session.load_level(first_level, &mut out)?;
        session.dispatch(Command::SpawnPlayer, &mut out)?;
        log::info!("session started on level {first_level}");
        Ok(session)
    }

    /// Authoritative world of the session.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Physics backend of the session.
    #[must_use]
    pub fn physics(&self) -> &P {
        &self.physics
    }

    /// Current score and gating flags.
    #[must_use]
    pub fn state(&self) -> GameState {
        query::game_state(&self.world)
    }

    /// Reports whether the last level was finished; the session is frozen afterwards.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Runs a single frame and returns what happened, in order.
    pub fn frame(
        &mut self,
        dt: Duration,
        input: ControlInput,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        let mut out = Vec::new();
        if self.completed {
            return Ok(out);
        }

        let state = self.state();
        if let Some(gravity) = self
            .controller
            .gravity(&state, input, self.player_position())
        {
            self.physics.set_gravity(gravity);
        }

        let mut contacts = std::mem::take(&mut self.contacts);
        contacts.clear();
        self.physics.step(dt, &mut contacts);
        self.follow_player();

        let result = self.handle_contacts(&contacts, &mut out);
        self.contacts = contacts;
        result?;

        let mut outputs = std::mem::take(&mut self.outputs);
        outputs.clear();
        self.animator.advance(dt, &mut outputs);
        let result = self.handle_outputs(&outputs, &mut out);
        self.outputs = outputs;
        result?;

        Ok(out)
    }

    fn follow_player(&mut self) {
        let Some(player) = query::player(&self.world) else {
            return;
        };
        if !player.dynamic {
            return;
        }
        let Some(position) = self.physics.position(player.id) else {
            return;
        };
        let mut transform = player.transform;
        transform.position = position;
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::SetEntityTransform {
                entity: player.id,
                transform,
            },
            &mut events,
        );
    }

    fn handle_contacts(
        &mut self,
        contacts: &[ContactBegin],
        out: &mut Vec<SessionEvent>,
    ) -> Result<(), SessionError> {
        for contact in contacts {
            if self.completed {
                break;
            }
            let Some(player) = query::registry(&self.world).player() else {
                continue;
            };
            let Some(other) = contact
                .other(player)
                .and_then(|other| query::entity(&self.world, other))
            else {
                continue;
            };

            let state = self.state();
            let response = self.responder.respond(
                Contact { player, other },
                state,
                query::registry(&self.world),
            )?;
            self.apply_response(response, out)?;
        }
        Ok(())
    }

    fn handle_outputs(
        &mut self,
        outputs: &[AnimationOutput],
        out: &mut Vec<SessionEvent>,
    ) -> Result<(), SessionError> {
        for output in outputs {
            if self.completed {
                break;
            }
            match *output {
                AnimationOutput::Transform { entity, transform } => {
                    if self.physics.position(entity) != Some(transform.position) {
                        self.physics.set_position(entity, transform.position);
                    }
                    self.dispatch(Command::SetEntityTransform { entity, transform }, out)?;
                }
                AnimationOutput::Removed { entity } => {
                    self.dispatch(Command::RemoveEntity { entity }, out)?;
                }
                AnimationOutput::Completed { completion } => {
                    self.resolve(completion, out)?;
                }
            }
        }
        Ok(())
    }

    fn resolve(
        &mut self,
        completion: Completion,
        out: &mut Vec<SessionEvent>,
    ) -> Result<(), SessionError> {
        if completion == Completion::OpenTeleports {
            self.settle_on_teleports();
        }
        let response = self.responder.resolve(completion, self.state());
        self.apply_response(response, out)
    }

    // The marble may have been moved onto a pad without physics stepping in
    // between; that overlap must not read as a fresh teleport contact.
    fn settle_on_teleports(&mut self) {
        let registry = query::registry(&self.world);
        let Some(player) = registry.player() else {
            return;
        };
        for pad in registry.teleports() {
            if self.physics.mark_touching(player, pad.id) {
                log::debug!("marble already rests on teleport {}", pad.id);
            }
        }
    }

    fn apply_response(
        &mut self,
        response: Response,
        out: &mut Vec<SessionEvent>,
    ) -> Result<(), SessionError> {
        let previous = self.state();
        if response.is_noop(&previous) {
            return Ok(());
        }
        if response.state != previous {
            self.dispatch(
                Command::UpdateGameState {
                    state: response.state,
                },
                out,
            )?;
        }

        for effect in response.effects {
            self.execute(effect, out)?;
            if self.completed {
                break;
            }
        }
        Ok(())
    }

    fn execute(
        &mut self,
        effect: Effect,
        out: &mut Vec<SessionEvent>,
    ) -> Result<(), SessionError> {
        match effect {
            Effect::SetPlayerDynamic(dynamic) => {
                self.dispatch(Command::SetPlayerDynamic { dynamic }, out)
            }
            Effect::RemoveEntity(entity) => self.dispatch(Command::RemoveEntity { entity }, out),
            Effect::Animate {
                entity,
                action,
                then,
            } => {
                match query::entity(&self.world, entity) {
                    Some(snapshot) => {
                        self.animator
                            .schedule(entity, snapshot.transform, action, then);
                    }
                    None => log::warn!("dropping animation of missing entity {entity}"),
                }
                Ok(())
            }
            Effect::Delay { duration, then } => {
                self.animator.delay(duration, then);
                Ok(())
            }
            Effect::SpawnPlayer => self.dispatch(Command::SpawnPlayer, out),
            Effect::LoadLevel(level) => {
                if self.loader.has_level(level) {
                    self.load_level(level, out)
                } else {
                    self.complete(level, out);
                    Ok(())
                }
            }
        }
    }

    fn complete(&mut self, missing: LevelIndex, out: &mut Vec<SessionEvent>) {
        let last_level = query::level(&self.world)
            .map(|summary| summary.level)
            .unwrap_or(missing);
        let score = self.state().score;
        log::info!("no level {missing}; campaign completed with score {score}");
        self.completed = true;
        self.animator.clear();
        out.push(SessionEvent::CampaignCompleted { score, last_level });
    }

    fn load_level(
        &mut self,
        level: LevelIndex,
        out: &mut Vec<SessionEvent>,
    ) -> Result<(), SessionError> {
        let layout = self.loader.load(level)?;
        self.animator.clear();
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::LoadLevel { layout }, &mut events);
        if let Some(reason) = world::rejection(&events) {
            return Err(SessionError::LevelRejected { level, reason });
        }
        self.publish(events, out)
    }

    fn dispatch(
        &mut self,
        command: Command,
        out: &mut Vec<SessionEvent>,
    ) -> Result<(), SessionError> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        self.publish(events, out)
    }

    fn publish(
        &mut self,
        events: Vec<Event>,
        out: &mut Vec<SessionEvent>,
    ) -> Result<(), SessionError> {
        for event in events {
            self.mirror(&event)?;
            out.push(SessionEvent::World(event));
        }
        Ok(())
    }

    fn mirror(&mut self, event: &Event) -> Result<(), SessionError> {
        match event {
            Event::TileSpawned { entity } => {
                self.create_body(entity)?;
                if let Some(action) = idle_action(entity.kind) {
                    self.animator
                        .schedule(entity.id, entity.transform, action, Vec::new());
                }
            }
            Event::PlayerSpawned { entity } => self.create_body(entity)?,
            Event::EntityRemoved { entity, .. } => {
                let _ = self.physics.remove_body(*entity);
                self.animator.cancel_entity(*entity);
            }
            Event::PlayerDynamicsChanged { dynamic } => {
                if let Some(player) = query::registry(&self.world).player() {
                    self.physics.set_dynamic(player, *dynamic);
                }
            }
            Event::LevelLoaded { .. }
            | Event::LevelRejected { .. }
            | Event::ScoreChanged { .. }
            | Event::GameOverChanged { .. }
            | Event::TeleportsChanged { .. } => {}
        }
        Ok(())
    }

    fn create_body(&mut self, entity: &EntitySnapshot) -> Result<(), SessionError> {
        let descriptor = self.bodies.descriptor(entity, self.loader.cell_size());
        self.physics.create_body(entity.id, descriptor)?;
        Ok(())
    }

    /// Position of the live player, if one exists.
    #[must_use]
    pub fn player_position(&self) -> Option<Vec2> {
        query::player(&self.world).map(|player| player.position())
    }

    /// Identifier of the live player, if one exists.
    #[must_use]
    pub fn player(&self) -> Option<EntityId> {
        query::registry(&self.world).player()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marble_maze_core::Transform;

    fn snapshot(kind: TileKind, dynamic: bool) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId::new(1),
            kind,
            transform: Transform::at(Vec2::new(96.0, 32.0)),
            masks: kind.masks().expect("materialised kind"),
            dynamic,
        }
    }

    #[test]
    fn walls_fill_their_cell() {
        let wall = snapshot(TileKind::Wall, false);
        let descriptor = BodyConfig::default().descriptor(&wall, CellSize::new(48, 64));
        assert_eq!(
            descriptor.collider,
            Collider::Rectangle {
                half_extents: Vec2::new(24.0, 32.0)
            }
        );
        assert_eq!(descriptor.position, Vec2::new(96.0, 32.0));
        assert!(descriptor.linear_damping.abs() < f32::EPSILON);
    }

    #[test]
    fn player_gets_its_own_radius_and_damping() {
        let bodies = BodyConfig {
            player_radius: 20.0,
            tile_radius: 32.0,
            linear_damping: 0.75,
        };
        let descriptor = bodies.descriptor(&snapshot(TileKind::Player, true), CellSize::DEFAULT);
        assert_eq!(descriptor.collider, Collider::Circle { radius: 20.0 });
        assert!(descriptor.dynamic);
        assert!((descriptor.linear_damping - 0.75).abs() < f32::EPSILON);

        let star = bodies.descriptor(&snapshot(TileKind::Star, false), CellSize::DEFAULT);
        assert_eq!(star.collider, Collider::Circle { radius: 32.0 });
    }
}
