//! Body geometry and its rapier counterpart.

use glam::Vec2;
use rapier2d::prelude::{Group, InteractionGroups, SharedShape};

use marble_maze_core::BitMask;

/// Geometry of a physics body, centred on the body position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Collider {
    /// Circle with the provided radius.
    Circle {
        /// Radius in world units.
        radius: f32,
    },
    /// Axis-aligned rectangle.
    Rectangle {
        /// Half of the width and height in world units.
        half_extents: Vec2,
    },
}

impl Collider {
    pub(crate) fn shape(self) -> SharedShape {
        match self {
            Self::Circle { radius } => SharedShape::ball(radius),
            Self::Rectangle { half_extents } => SharedShape::cuboid(half_extents.x, half_extents.y),
        }
    }
}

/// Membership in `category`, interacting with bodies whose category is in `filter`.
pub(crate) fn interaction_groups(category: BitMask, filter: BitMask) -> InteractionGroups {
    InteractionGroups::new(
        Group::from_bits_truncate(category.bits()),
        Group::from_bits_truncate(filter.bits()),
    )
}
