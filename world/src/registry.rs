//! Tracks the entities collision responses need to look up by role.

use glam::Vec2;
use marble_maze_core::{EntityId, RegistryError};

const TELEPORTS_PER_LEVEL: usize = 2;

/// Teleport entity together with the position the player is relocated to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TeleportPad {
    /// Identifier of the teleport entity.
    pub id: EntityId,
    /// Centre of the teleport in world units.
    pub position: Vec2,
}

/// Live player reference and the teleport pair of the current level.
///
/// Teleports are paired purely by registration order: the first pad
/// registered while scanning a level leads to the second and vice versa.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityRegistry {
    player: Option<EntityId>,
    teleports: Vec<TeleportPad>,
}

impl EntityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a teleport in discovery order.
    pub fn register_teleport(&mut self, pad: TeleportPad) -> Result<(), RegistryError> {
        if self.teleports.len() >= TELEPORTS_PER_LEVEL {
            return Err(RegistryError::TooManyTeleports);
        }
        self.teleports.push(pad);
        Ok(())
    }

    /// Records the live player, returning the player it replaces.
    pub fn set_player(&mut self, entity: EntityId) -> Option<EntityId> {
        self.player.replace(entity)
    }

    /// Forgets the live player, returning it if one was registered.
    pub fn clear_player(&mut self) -> Option<EntityId> {
        self.player.take()
    }

    /// Live player entity, if one exists.
    #[must_use]
    pub const fn player(&self) -> Option<EntityId> {
        self.player
    }

    /// Registered teleports in discovery order.
    #[must_use]
    pub fn teleports(&self) -> &[TeleportPad] {
        &self.teleports
    }

    /// Returns the teleport paired with `entity`.
    pub fn other_teleport(&self, entity: EntityId) -> Result<TeleportPad, RegistryError> {
        if self.teleports.len() < TELEPORTS_PER_LEVEL {
            return Err(RegistryError::IncompletePair {
                registered: self.teleports.len(),
            });
        }

        let index = self
            .teleports
            .iter()
            .position(|pad| pad.id == entity)
            .ok_or(RegistryError::UnknownTeleport { entity })?;
        Ok(self.teleports[TELEPORTS_PER_LEVEL - 1 - index])
    }

    /// Drops the teleport pair ahead of a level (re)load.
    pub fn clear_teleports(&mut self) {
        self.teleports.clear();
    }
}
