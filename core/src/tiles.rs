//! Static tile catalog mapping level-grid symbols to tile kinds and physics bitmasks.

use std::ops::BitOr;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::UnknownSymbolError;

/// Bitmask used to categorise physics bodies and filter their interactions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitMask(u32);

impl BitMask {
    /// Mask with no bits set.
    pub const NONE: Self = Self(0);

    /// Wraps the provided raw bits.
    #[must_use]
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Combines two masks.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Reports whether the masks share at least one bit.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for BitMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

/// Category, collision and contact masks attached to a physics body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhysicsMasks {
    /// Identifies the body's type.
    pub category: BitMask,
    /// Categories that physically block this body.
    pub collision: BitMask,
    /// Categories whose overlap with this body is reported as a contact.
    pub contact: BitMask,
}

impl PhysicsMasks {
    /// Reports whether a body with these masks is blocked by a body with `other` masks.
    #[must_use]
    pub const fn is_blocked_by(&self, other: &PhysicsMasks) -> bool {
        self.collision.intersects(other.category)
    }

    /// Reports whether overlapping bodies with these masks produce a contact notification.
    #[must_use]
    pub const fn reports_contact_with(&self, other: &PhysicsMasks) -> bool {
        self.category.intersects(other.contact) || other.category.intersects(self.contact)
    }
}

/// Shape used when materialising a tile as a physics body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyShape {
    /// Circle inscribed in the cell.
    Circle,
    /// Rectangle filling the cell.
    Rectangle,
}

/// Kinds of tiles that may appear in a level grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileKind {
    /// Start position of the player marble.
    Player,
    /// Solid block the marble rolls against.
    Wall,
    /// Hazard that swallows the marble.
    Vortex,
    /// Collectible worth one point.
    Star,
    /// One end of a teleporter pair.
    Teleport,
    /// Goal that advances to the next level.
    Finish,
    /// Empty cell; never materialised.
    Space,
}

impl TileKind {
    /// Every tile kind in catalog order.
    pub const ALL: [TileKind; 7] = [
        Self::Player,
        Self::Wall,
        Self::Vortex,
        Self::Star,
        Self::Teleport,
        Self::Finish,
        Self::Space,
    ];

    /// Resolves a grid symbol into its tile kind.
    ///
    /// Unknown symbols are rejected instead of being substituted with a default tile.
    pub fn classify(symbol: char) -> Result<Self, UnknownSymbolError> {
        match symbol {
            'p' => Ok(Self::Player),
            'x' => Ok(Self::Wall),
            'v' => Ok(Self::Vortex),
            's' => Ok(Self::Star),
            't' => Ok(Self::Teleport),
            'f' => Ok(Self::Finish),
            ' ' => Ok(Self::Space),
            other => Err(UnknownSymbolError { symbol: other }),
        }
    }

    /// Symbol used for the kind in level text.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Player => 'p',
            Self::Wall => 'x',
            Self::Vortex => 'v',
            Self::Star => 's',
            Self::Teleport => 't',
            Self::Finish => 'f',
            Self::Space => ' ',
        }
    }

    /// Asset name used by renderers; empty for [`TileKind::Space`].
    #[must_use]
    pub const fn asset_name(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Wall => "block",
            Self::Vortex => "vortex",
            Self::Star => "star",
            Self::Teleport => "teleport",
            Self::Finish => "finish",
            Self::Space => "",
        }
    }

    /// Category bit identifying bodies of this kind.
    #[must_use]
    pub const fn category(self) -> BitMask {
        match self {
            Self::Player => BitMask::new(1),
            Self::Wall => BitMask::new(2),
            Self::Vortex => BitMask::new(4),
            Self::Star => BitMask::new(8),
            Self::Teleport => BitMask::new(16),
            Self::Finish => BitMask::new(32),
            Self::Space => BitMask::NONE,
        }
    }

    /// Categories that physically block bodies of this kind.
    #[must_use]
    pub const fn collision(self) -> BitMask {
        match self {
            Self::Player => Self::Wall.category(),
            Self::Wall => BitMask::new(1),
            Self::Vortex | Self::Star | Self::Teleport | Self::Finish | Self::Space => {
                BitMask::NONE
            }
        }
    }

    /// Categories whose overlap with bodies of this kind is reported.
    #[must_use]
    pub const fn contact(self) -> BitMask {
        match self {
            Self::Player => Self::Star
                .category()
                .union(Self::Vortex.category())
                .union(Self::Teleport.category())
                .union(Self::Finish.category()),
            Self::Wall => BitMask::new(1),
            Self::Vortex | Self::Star | Self::Teleport | Self::Finish => Self::Player.category(),
            Self::Space => BitMask::NONE,
        }
    }

    /// Physics masks for materialised kinds, `None` for [`TileKind::Space`].
    #[must_use]
    pub const fn masks(self) -> Option<PhysicsMasks> {
        match self {
            Self::Space => None,
            _ => Some(PhysicsMasks {
                category: self.category(),
                collision: self.collision(),
                contact: self.contact(),
            }),
        }
    }

    /// Shape of the physics body created for the kind.
    #[must_use]
    pub const fn shape(self) -> BodyShape {
        match self {
            Self::Wall => BodyShape::Rectangle,
            _ => BodyShape::Circle,
        }
    }

    /// Draw order; higher values are drawn on top.
    #[must_use]
    pub const fn z_order(self) -> i32 {
        match self {
            Self::Player => 1,
            _ => 0,
        }
    }
}

/// Location of a cell in a level grid, row 0 being the bottom of the playfield.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    row: u32,
    column: u32,
}

impl GridPosition {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row counted from the bottom of the playfield.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column counted from the left of the playfield.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }
}

/// Size of a single grid cell in world units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellSize {
    width: u32,
    height: u32,
}

impl CellSize {
    /// Cell size used by the stock levels.
    pub const DEFAULT: Self = Self::new(64, 64);

    /// Creates a cell size from explicit dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width of a cell.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of a cell.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// World-space centre of the provided grid cell.
    #[must_use]
    pub fn center_of(&self, grid: GridPosition) -> Vec2 {
        let x = self.width as f32 * grid.column() as f32 + self.width as f32 / 2.0;
        let y = self.height as f32 * grid.row() as f32 + self.height as f32 / 2.0;
        Vec2::new(x, y)
    }

    /// Cell dimensions as a vector.
    #[must_use]
    pub fn extent(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

impl Default for CellSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Materialisable tile produced by parsing a level grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Kind of tile placed at the cell.
    pub kind: TileKind,
    /// Grid cell the tile occupies.
    pub grid: GridPosition,
    /// Centre of the cell in world units.
    pub position: Vec2,
    /// Physics masks derived from the kind.
    pub masks: PhysicsMasks,
}
