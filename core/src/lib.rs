#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Marble Maze engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Collision responses are expressed as
//! [`Effect`] descriptors so that the decision logic never touches rendering
//! or animation machinery.

mod effects;
mod tiles;

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use effects::{Action, Completion, Effect};
pub use tiles::{BitMask, BodyShape, CellSize, GridPosition, PhysicsMasks, Placement, TileKind};

/// Canonical window title used by adapters.
pub const GAME_TITLE: &str = "Marble Maze";

/// Identifier of a level resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LevelIndex(u32);

impl LevelIndex {
    /// The level a fresh game starts on.
    pub const FIRST: Self = Self(1);

    /// Creates a new level index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Index of the level that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for LevelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier assigned to an entity by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position, scale, opacity and rotation of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Centre of the entity in world units.
    pub position: Vec2,
    /// Uniform scale, 1.0 being the natural size.
    pub scale: f32,
    /// Opacity in the range 0.0..=1.0.
    pub alpha: f32,
    /// Rotation in radians.
    pub rotation: f32,
}

impl Transform {
    /// Identity transform placed at `position`.
    #[must_use]
    pub const fn at(position: Vec2) -> Self {
        Self {
            position,
            scale: 1.0,
            alpha: 1.0,
            rotation: 0.0,
        }
    }
}

/// Immutable representation of a single entity used for queries and events.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Identifier allocated by the world.
    pub id: EntityId,
    /// Tile kind the entity was created from.
    pub kind: TileKind,
    /// Current transform.
    pub transform: Transform,
    /// Physics masks assigned to the entity.
    pub masks: PhysicsMasks,
    /// Whether physics integrates the entity's motion.
    pub dynamic: bool,
}

impl EntitySnapshot {
    /// Current world position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.transform.position
    }
}

/// Score and gating flags for a running game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Points collected so far; vortex deaths may drive it negative.
    pub score: i64,
    /// Set while a death or level-advance transition is running.
    pub is_game_over: bool,
    /// Cleared for the duration of a teleport transition.
    pub teleports_open: bool,
    /// Level currently being played.
    pub current_level: LevelIndex,
}

impl GameState {
    /// Fresh state positioned on the provided level.
    #[must_use]
    pub const fn new(current_level: LevelIndex) -> Self {
        Self {
            score: 0,
            is_game_over: false,
            teleports_open: true,
            current_level,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(LevelIndex::FIRST)
    }
}

/// Parsed level ready to be materialised by the world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelLayout {
    /// Index the layout was loaded from.
    pub level: LevelIndex,
    /// Size of a single grid cell.
    pub cell_size: CellSize,
    /// Number of non-empty rows in the grid.
    pub rows: u32,
    /// Length of the widest row.
    pub columns: u32,
    /// Placements in scan order, bottom row first.
    pub placements: Vec<Placement>,
}

impl LevelLayout {
    /// Centre of the player start cell, if the layout defines one.
    #[must_use]
    pub fn player_start(&self) -> Option<Vec2> {
        self.placements
            .iter()
            .find(|placement| placement.kind == TileKind::Player)
            .map(|placement| placement.position)
    }

    /// Number of placements of the provided kind.
    #[must_use]
    pub fn count(&self, kind: TileKind) -> usize {
        self.placements
            .iter()
            .filter(|placement| placement.kind == kind)
            .count()
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

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces every non-player entity with the tiles of the provided layout.
    LoadLevel {
        /// Parsed level to materialise.
        layout: LevelLayout,
    },
    /// Replaces the player with a fresh one at the level's start position.
    SpawnPlayer,
    /// Removes an entity permanently.
    RemoveEntity {
        /// Entity to remove.
        entity: EntityId,
    },
    /// Overwrites the transform of an entity.
    SetEntityTransform {
        /// Entity to update.
        entity: EntityId,
        /// Transform to store.
        transform: Transform,
    },
    /// Enables or disables physics integration for the player.
    SetPlayerDynamic {
        /// Whether physics should move the player.
        dynamic: bool,
    },
    /// Replaces the game state with one computed by a collision response.
    UpdateGameState {
        /// State to store.
        state: GameState,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a level was materialised.
    LevelLoaded {
        /// Index of the loaded level.
        level: LevelIndex,
        /// Number of tiles created, excluding the player.
        tiles: usize,
    },
    /// Reports that a layout failed integrity checks and nothing was changed.
    LevelRejected {
        /// Index of the rejected level.
        level: LevelIndex,
        /// Specific reason the layout was rejected.
        reason: RegistryError,
    },
    /// Confirms that a static tile entity was created.
    TileSpawned {
        /// Snapshot of the new entity.
        entity: EntitySnapshot,
    },
    /// Confirms that a player entity was created.
    PlayerSpawned {
        /// Snapshot of the new player.
        entity: EntitySnapshot,
    },
    /// Confirms that an entity was removed.
    EntityRemoved {
        /// Identifier of the removed entity.
        entity: EntityId,
        /// Kind of the removed entity.
        kind: TileKind,
    },
    /// Reports that physics integration of the player was toggled.
    PlayerDynamicsChanged {
        /// Whether physics now moves the player.
        dynamic: bool,
    },
    /// Reports a new score for presentation.
    ScoreChanged {
        /// Score after the change.
        score: i64,
    },
    /// Reports that the game-over gate was raised or lowered.
    GameOverChanged {
        /// Whether the gate is now raised.
        is_game_over: bool,
    },
    /// Reports that the teleporters were armed or disarmed.
    TeleportsChanged {
        /// Whether teleports are now armed.
        open: bool,
    },
}

/// Raised when a level grid contains a symbol outside the tile catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("unknown tile symbol {symbol:?}")]
pub struct UnknownSymbolError {
    /// Offending symbol.
    pub symbol: char,
}

/// Reasons the teleport registry rejects an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum RegistryError {
    /// A level tried to register a third teleport.
    #[error("a level may define at most two teleports")]
    TooManyTeleports,
    /// A pairing lookup happened before both teleports were registered.
    #[error("teleport pair is incomplete ({registered} registered)")]
    IncompletePair {
        /// Number of teleports registered so far.
        registered: usize,
    },
    /// The entity handed to a pairing lookup is not one of the registered teleports.
    #[error("entity {entity} is not a registered teleport")]
    UnknownTeleport {
        /// Entity that was looked up.
        entity: EntityId,
    },
}

/// Fatal errors raised while acquiring or parsing level data.
#[derive(Debug, Error)]
pub enum LevelError {
    /// No resource exists for the requested level.
    #[error("level {level} could not be found")]
    ResourceNotFound {
        /// Level that was requested.
        level: LevelIndex,
    },
    /// The resource exists but its text could not be read.
    #[error("level {level} could not be read")]
    ResourceUnreadable {
        /// Level that was requested.
        level: LevelIndex,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The grid contains a symbol outside the tile catalog.
    #[error("level {level}, line {line}, column {column}: {source}")]
    UnknownTileSymbol {
        /// Level being parsed.
        level: LevelIndex,
        /// One-based line number in the source text.
        line: usize,
        /// One-based column number in the source text.
        column: usize,
        /// Symbol that failed to classify.
        #[source]
        source: UnknownSymbolError,
    },
    /// Teleports do not form exactly one pair.
    #[error("level {level} defines {count} teleports; teleports must come in a single pair")]
    TeleportPairing {
        /// Level being parsed.
        level: LevelIndex,
        /// Number of teleports found.
        count: usize,
    },
    /// The grid does not define exactly one player start.
    #[error("level {level} defines {count} player starts; exactly one is required")]
    PlayerStartCount {
        /// Level being parsed.
        level: LevelIndex,
        /// Number of player symbols found.
        count: usize,
    },
}
