#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Marble Maze.

mod registry;

use std::collections::BTreeMap;

use glam::Vec2;
use marble_maze_core::{
    CellSize, Command, EntityId, EntitySnapshot, Event, GameState, LevelIndex, LevelLayout,
    Placement, RegistryError, TileKind, Transform,
};

pub use registry::{EntityRegistry, TeleportPad};

/// Dimensions and start position of the level currently materialised.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelSummary {
    /// Index of the level.
    pub level: LevelIndex,
    /// Size of a single grid cell.
    pub cell_size: CellSize,
    /// Number of grid rows.
    pub rows: u32,
    /// Number of grid columns.
    pub columns: u32,
    /// Position the player spawns at, if the level defines one.
    pub player_start: Option<Vec2>,
}

impl LevelSummary {
    fn from_layout(layout: &LevelLayout) -> Self {
        Self {
            level: layout.level,
            cell_size: layout.cell_size,
            rows: layout.rows,
            columns: layout.columns,
            player_start: layout.player_start(),
        }
    }

    /// Total playfield width in world units.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.columns as f32 * self.cell_size.width() as f32
    }

    /// Total playfield height in world units.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.rows as f32 * self.cell_size.height() as f32
    }
}

/// Represents the authoritative Marble Maze world state.
#[derive(Debug)]
pub struct World {
    entities: BTreeMap<EntityId, EntitySnapshot>,
    registry: EntityRegistry,
    state: GameState,
    level: Option<LevelSummary>,
    next_entity: u32,
}

impl World {
    /// Creates an empty world positioned on the first level.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(GameState::default())
    }

    /// Creates an empty world that starts from the provided state.
    #[must_use]
    pub fn with_state(state: GameState) -> Self {
        Self {
            entities: BTreeMap::new(),
            registry: EntityRegistry::new(),
            state,
            level: None,
            next_entity: 0,
        }
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_entity);
        self.next_entity = self.next_entity.wrapping_add(1);
        id
    }

    fn remove_entity(&mut self, entity: EntityId, out_events: &mut Vec<Event>) {
        let Some(removed) = self.entities.remove(&entity) else {
            return;
        };
        if self.registry.player() == Some(entity) {
            let _ = self.registry.clear_player();
        }
        out_events.push(Event::EntityRemoved {
            entity,
            kind: removed.kind,
        });
    }

    fn load_level(&mut self, layout: LevelLayout, out_events: &mut Vec<Event>) {
        let tiles: Vec<&Placement> = layout
            .placements
            .iter()
            .filter(|placement| !matches!(placement.kind, TileKind::Player | TileKind::Space))
            .collect();

        // Validate against a scratch registry first so a defective layout never
        // leaves a half-built level behind.
        let mut registry = EntityRegistry::new();
        if let Some(player) = self.registry.player() {
            let _ = registry.set_player(player);
        }
        let mut next_entity = self.next_entity;
        for placement in &tiles {
            let id = EntityId::new(next_entity);
            next_entity = next_entity.wrapping_add(1);
            if placement.kind == TileKind::Teleport {
                let pad = TeleportPad {
                    id,
                    position: placement.position,
                };
                if let Err(reason) = registry.register_teleport(pad) {
                    log::error!("rejected level {}: {reason}", layout.level);
                    out_events.push(Event::LevelRejected {
                        level: layout.level,
                        reason,
                    });
                    return;
                }
            }
        }

        let stale: Vec<EntityId> = self
            .entities
            .keys()
            .copied()
            .filter(|id| Some(*id) != self.registry.player())
            .collect();
        for id in stale {
            self.remove_entity(id, out_events);
        }

        for placement in &tiles {
            let id = self.allocate_id();
            let entity = EntitySnapshot {
                id,
                kind: placement.kind,
                transform: Transform::at(placement.position),
                masks: placement.masks,
                dynamic: false,
            };
            let _ = self.entities.insert(id, entity);
            out_events.push(Event::TileSpawned { entity });
        }

        self.registry = registry;
        self.level = Some(LevelSummary::from_layout(&layout));
        self.state.current_level = layout.level;
        log::info!("loaded level {} ({} tiles)", layout.level, tiles.len());
        out_events.push(Event::LevelLoaded {
            level: layout.level,
            tiles: tiles.len(),
        });
    }

    fn spawn_player(&mut self, out_events: &mut Vec<Event>) {
        let Some(start) = self.level.and_then(|level| level.player_start) else {
            log::warn!("player spawn requested without a level start position");
            return;
        };

        if let Some(previous) = self.registry.player() {
            self.remove_entity(previous, out_events);
        }

        let Some(masks) = TileKind::Player.masks() else {
            return;
        };
        let id = self.allocate_id();
        let entity = EntitySnapshot {
            id,
            kind: TileKind::Player,
            transform: Transform::at(start),
            masks,
            dynamic: true,
        };
        let _ = self.entities.insert(id, entity);
        let _ = self.registry.set_player(id);
        out_events.push(Event::PlayerSpawned { entity });
    }

    fn set_player_dynamic(&mut self, dynamic: bool, out_events: &mut Vec<Event>) {
        let Some(player) = self.registry.player() else {
            return;
        };
        if let Some(entity) = self.entities.get_mut(&player) {
            if entity.dynamic != dynamic {
                entity.dynamic = dynamic;
                out_events.push(Event::PlayerDynamicsChanged { dynamic });
            }
        }
    }

    fn update_state(&mut self, state: GameState, out_events: &mut Vec<Event>) {
        let previous = self.state;
        self.state = state;

        if previous.score != state.score {
            out_events.push(Event::ScoreChanged { score: state.score });
        }
        if previous.is_game_over != state.is_game_over {
            out_events.push(Event::GameOverChanged {
                is_game_over: state.is_game_over,
            });
        }
        if previous.teleports_open != state.teleports_open {
            out_events.push(Event::TeleportsChanged {
                open: state.teleports_open,
            });
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::LoadLevel { layout } => world.load_level(layout, out_events),
        Command::SpawnPlayer => world.spawn_player(out_events),
        Command::RemoveEntity { entity } => world.remove_entity(entity, out_events),
        Command::SetEntityTransform { entity, transform } => {
            if let Some(snapshot) = world.entities.get_mut(&entity) {
                snapshot.transform = transform;
            }
        }
        Command::SetPlayerDynamic { dynamic } => world.set_player_dynamic(dynamic, out_events),
        Command::UpdateGameState { state } => world.update_state(state, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use marble_maze_core::{EntityId, EntitySnapshot, GameState, TileKind};

    use super::{EntityRegistry, LevelSummary, World};

    /// Current score and gating flags.
    #[must_use]
    pub fn game_state(world: &World) -> GameState {
        world.state
    }

    /// Provides read-only access to the player and teleport registry.
    #[must_use]
    pub fn registry(world: &World) -> &EntityRegistry {
        &world.registry
    }

    /// Summary of the level currently materialised, if any.
    #[must_use]
    pub fn level(world: &World) -> Option<LevelSummary> {
        world.level
    }

    /// Snapshot of a single entity.
    #[must_use]
    pub fn entity(world: &World, id: EntityId) -> Option<EntitySnapshot> {
        world.entities.get(&id).copied()
    }

    /// Snapshot of the live player, if one exists.
    #[must_use]
    pub fn player(world: &World) -> Option<EntitySnapshot> {
        world
            .registry
            .player()
            .and_then(|id| world.entities.get(&id).copied())
    }

    /// Captures every entity in identifier order.
    #[must_use]
    pub fn entity_view(world: &World) -> EntityView {
        EntityView {
            snapshots: world.entities.values().copied().collect(),
        }
    }

    /// Number of live entities of the provided kind.
    #[must_use]
    pub fn count(world: &World, kind: TileKind) -> usize {
        world
            .entities
            .values()
            .filter(|entity| entity.kind == kind)
            .count()
    }

    /// Read-only snapshot describing all entities within the maze.
    #[derive(Clone, Debug, Default)]
    pub struct EntityView {
        snapshots: Vec<EntitySnapshot>,
    }

    impl EntityView {
        /// Iterator over the captured snapshots in deterministic order.
        pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
            self.snapshots.iter()
        }
    }
}

/// Identifies a registry failure caused by a layout, if the events contain one.
#[must_use]
pub fn rejection(events: &[Event]) -> Option<RegistryError> {
    events.iter().find_map(|event| match event {
        Event::LevelRejected { reason, .. } => Some(*reason),
        _ => None,
    })
}
