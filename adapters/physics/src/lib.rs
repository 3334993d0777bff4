#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Physics capability interface backed by rapier2d.
//!
//! The game core only talks to [`PhysicsWorld`]. [`ArcadePhysics`] keeps a
//! rapier pipeline, steps it with a fixed timestep, translates
//! [`PhysicsMasks`] into collision and solver groups, and turns rapier's
//! `CollisionEvent::Started` into [`ContactBegin`] values ordered by entity.
//!
//! Bodies that are not dynamic when created are fixed. Disabling dynamics on
//! a live body turns it kinematic so animations can move it while it keeps
//! reporting overlaps.

mod shapes;

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt,
    time::Duration,
};

use glam::Vec2;
use marble_maze_core::{BitMask, EntityId, PhysicsMasks};
use rapier2d::{parry::query, prelude::*};
use thiserror::Error;

pub use shapes::Collider;

/// Fixed simulation timestep in seconds.
pub const SIM_DT: f32 = 1.0 / 120.0;

/// Maximum number of substeps simulated per frame.
pub const MAX_SUBSTEPS: u32 = 8;

/// Gravity applied before any input arrives: a level board.
pub const DEFAULT_GRAVITY: Vec2 = Vec2::ZERO;

const MAX_FRAME_SECONDS: f32 = 0.1;

/// Parameters used to create a body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyDescriptor {
    /// Geometry of the body.
    pub collider: Collider,
    /// Initial centre in world units.
    pub position: Vec2,
    /// Category, collision and contact masks.
    pub masks: PhysicsMasks,
    /// Whether gravity and collisions move the body.
    pub dynamic: bool,
    /// Linear damping coefficient.
    pub linear_damping: f32,
}

/// Two bodies started touching during a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactBegin {
    /// Body with the lower identifier.
    pub a: EntityId,
    /// Body with the higher identifier.
    pub b: EntityId,
}

impl ContactBegin {
    fn new(first: EntityId, second: EntityId) -> Self {
        if first <= second {
            Self { a: first, b: second }
        } else {
            Self { a: second, b: first }
        }
    }

    /// Returns the body paired with `entity`, if `entity` takes part in the contact.
    #[must_use]
    pub fn other(&self, entity: EntityId) -> Option<EntityId> {
        if self.a == entity {
            Some(self.b)
        } else if self.b == entity {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Failures raised by physics backends.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhysicsError {
    /// A body already exists for the entity.
    #[error("entity {entity} already has a physics body")]
    DuplicateBody {
        /// Entity that was registered twice.
        entity: EntityId,
    },
}

/// Capability set the game requires from a physics engine.
pub trait PhysicsWorld {
    /// Creates a body for `entity`.
    fn create_body(&mut self, entity: EntityId, body: BodyDescriptor) -> Result<(), PhysicsError>;

    /// Removes the body of `entity`, returning whether one existed.
    fn remove_body(&mut self, entity: EntityId) -> bool;

    /// Enables or disables integration of the body. Either way its velocity is cleared.
    fn set_dynamic(&mut self, entity: EntityId, dynamic: bool);

    /// Teleports the body to `position`.
    fn set_position(&mut self, entity: EntityId, position: Vec2);

    /// Current centre of the body.
    fn position(&self, entity: EntityId) -> Option<Vec2>;

    /// Replaces the gravity vector, in metres per second squared.
    fn set_gravity(&mut self, gravity: Vec2);

    /// Current gravity vector.
    fn gravity(&self) -> Vec2;

    /// Treats an overlap of `a` and `b` that exists right now as already
    /// reported, so the next step does not announce it as a new contact.
    ///
    /// Returns whether the bodies overlap.
    fn mark_touching(&mut self, a: EntityId, b: EntityId) -> bool;

    /// Advances the simulation by `dt`, appending contacts that began.
    fn step(&mut self, dt: Duration, contacts: &mut Vec<ContactBegin>);
}

/// Tuning of [`ArcadePhysics`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsConfig {
    /// World units per metre used to scale gravity.
    pub points_per_metre: f32,
    /// Restitution of every collider.
    pub restitution: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            points_per_metre: 150.0,
            restitution: 0.2,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Body {
    rigid: RigidBodyHandle,
    collider: ColliderHandle,
    masks: PhysicsMasks,
}

/// rapier2d simulation addressed by entity identifiers.
pub struct ArcadePhysics {
    config: PhysicsConfig,
    gravity: Vec2,
    pipeline: PhysicsPipeline,
    integration: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    bodies: BTreeMap<EntityId, Body>,
    owners: HashMap<ColliderHandle, EntityId>,
    settled: BTreeSet<ContactBegin>,
    accumulator: f32,
}

impl ArcadePhysics {
    /// Creates an empty simulation.
    #[must_use]
    pub fn new(config: PhysicsConfig) -> Self {
        let integration = IntegrationParameters {
            dt: SIM_DT,
            ..IntegrationParameters::default()
        };
        Self {
            config,
            gravity: DEFAULT_GRAVITY,
            pipeline: PhysicsPipeline::new(),
            integration,
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            bodies: BTreeMap::new(),
            owners: HashMap::new(),
            settled: BTreeSet::new(),
            accumulator: 0.0,
        }
    }

    /// Current velocity of the body in world units per second.
    #[must_use]
    pub fn velocity(&self, entity: EntityId) -> Option<Vec2> {
        self.rigid_body(entity).map(|rigid| to_vec2(*rigid.linvel()))
    }

    /// Number of bodies in the simulation.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn rigid_body(&self, entity: EntityId) -> Option<&RigidBody> {
        let body = self.bodies.get(&entity)?;
        self.rigid_bodies.get(body.rigid)
    }

    fn rigid_body_mut(&mut self, entity: EntityId) -> Option<&mut RigidBody> {
        let body = self.bodies.get(&entity)?;
        self.rigid_bodies.get_mut(body.rigid)
    }

    fn substep(&mut self, contacts: &mut Vec<ContactBegin>) {
        let gravity = to_vector(self.gravity * self.config.points_per_metre);
        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let events = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &gravity,
            &self.integration,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &events,
        );

        let mut began = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(first, second, _) = event {
                if let Some(pair) = self.reported_pair(first, second) {
                    began.push(pair);
                }
            }
        }
        // Channel order is not part of rapier's contract.
        began.sort_unstable();
        began.dedup();
        for pair in began {
            if !self.settled.remove(&pair) {
                contacts.push(pair);
            }
        }
    }

    fn reported_pair(&self, first: ColliderHandle, second: ColliderHandle) -> Option<ContactBegin> {
        let a = *self.owners.get(&first)?;
        let b = *self.owners.get(&second)?;
        let masks_a = self.bodies.get(&a)?.masks;
        let masks_b = self.bodies.get(&b)?.masks;
        masks_a
            .reports_contact_with(&masks_b)
            .then_some(ContactBegin::new(a, b))
    }

    fn overlapping(&self, a: &Body, b: &Body) -> Option<bool> {
        let rigid_a = self.rigid_bodies.get(a.rigid)?;
        let rigid_b = self.rigid_bodies.get(b.rigid)?;
        let shape_a = self.colliders.get(a.collider)?;
        let shape_b = self.colliders.get(b.collider)?;
        query::intersection_test(
            rigid_a.position(),
            shape_a.shape(),
            rigid_b.position(),
            shape_b.shape(),
        )
        .ok()
    }
}

impl Default for ArcadePhysics {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

impl fmt::Debug for ArcadePhysics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArcadePhysics")
            .field("config", &self.config)
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld for ArcadePhysics {
    fn create_body(&mut self, entity: EntityId, body: BodyDescriptor) -> Result<(), PhysicsError> {
        if self.bodies.contains_key(&entity) {
            return Err(PhysicsError::DuplicateBody { entity });
        }

        let builder = if body.dynamic {
            RigidBodyBuilder::dynamic().can_sleep(false).ccd_enabled(true)
        } else {
            RigidBodyBuilder::fixed()
        };
        let rigid = self.rigid_bodies.insert(
            builder
                .translation(to_vector(body.position))
                .linear_damping(body.linear_damping)
                .lock_rotations()
                .build(),
        );

        let masks = body.masks;
        let collider = ColliderBuilder::new(body.collider.shape())
            .sensor(masks.collision == BitMask::NONE)
            .restitution(self.config.restitution)
            .friction(0.0)
            .collision_groups(shapes::interaction_groups(
                masks.category,
                masks.collision | masks.contact,
            ))
            .solver_groups(shapes::interaction_groups(masks.category, masks.collision))
            .active_collision_types(ActiveCollisionTypes::all())
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        let collider = self
            .colliders
            .insert_with_parent(collider, rigid, &mut self.rigid_bodies);

        let _ = self.owners.insert(collider, entity);
        let _ = self.bodies.insert(
            entity,
            Body {
                rigid,
                collider,
                masks,
            },
        );
        Ok(())
    }

    fn remove_body(&mut self, entity: EntityId) -> bool {
        let Some(body) = self.bodies.remove(&entity) else {
            return false;
        };
        let _ = self.owners.remove(&body.collider);
        self.settled.retain(|pair| pair.a != entity && pair.b != entity);
        let _ = self.rigid_bodies.remove(
            body.rigid,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        true
    }

    fn set_dynamic(&mut self, entity: EntityId, dynamic: bool) {
        if let Some(rigid) = self.rigid_body_mut(entity) {
            let body_type = if dynamic {
                RigidBodyType::Dynamic
            } else {
                RigidBodyType::KinematicPositionBased
            };
            rigid.set_body_type(body_type, true);
            rigid.set_linvel(vector![0.0, 0.0], true);
        }
    }

    fn set_position(&mut self, entity: EntityId, position: Vec2) {
        if let Some(rigid) = self.rigid_body_mut(entity) {
            rigid.set_translation(to_vector(position), true);
        }
    }

    fn position(&self, entity: EntityId) -> Option<Vec2> {
        self.rigid_body(entity).map(|rigid| to_vec2(*rigid.translation()))
    }

    fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    fn gravity(&self) -> Vec2 {
        self.gravity
    }

    fn mark_touching(&mut self, a: EntityId, b: EntityId) -> bool {
        let (Some(first), Some(second)) = (self.bodies.get(&a), self.bodies.get(&b)) else {
            return false;
        };
        if !first.masks.reports_contact_with(&second.masks) {
            return false;
        }
        let overlapping = self.overlapping(first, second).unwrap_or(false);
        if overlapping {
            let _ = self.settled.insert(ContactBegin::new(a, b));
        }
        overlapping
    }

    fn step(&mut self, dt: Duration, contacts: &mut Vec<ContactBegin>) {
        self.accumulator += dt.as_secs_f32().min(MAX_FRAME_SECONDS);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.substep(contacts);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }

        if substeps > 0 {
            self.settled.clear();
        }
        if substeps == MAX_SUBSTEPS && self.accumulator >= SIM_DT {
            log::trace!("dropping {:.4}s of simulation backlog", self.accumulator);
            self.accumulator = 0.0;
        }
    }
}

fn to_vector(value: Vec2) -> Vector<Real> {
    vector![value.x, value.y]
}

fn to_vec2(value: Vector<Real>) -> Vec2 {
    Vec2::new(value.x, value.y)
}
