#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Marble Maze adapters.
//!
//! World coordinates put the origin at the bottom-left corner of the
//! playfield with the y axis pointing up. Backends are responsible for
//! flipping into screen space.

use anyhow::Result as AnyResult;
use glam::Vec2;
use marble_maze_core::{CellSize, EntityId, EntitySnapshot, TileKind, Transform};
use std::{error::Error, fmt, time::Duration};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }

    /// Returns the color with its alpha multiplied by `opacity`.
    #[must_use]
    pub fn with_opacity(self, opacity: f32) -> Self {
        Self {
            alpha: self.alpha * opacity.clamp(0.0, 1.0),
            ..self
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct FrameInput {
    /// Pointer position in world units while a drag is in progress.
    pub pointer_world: Option<Vec2>,
    /// Emulated or measured device acceleration in g.
    pub tilt: Option<Vec2>,
}

/// Size and background of the playfield.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayfieldPresentation {
    /// Number of grid columns.
    pub columns: u32,
    /// Number of grid rows.
    pub rows: u32,
    /// Size of a single grid cell in world units.
    pub cell_size: CellSize,
    /// Color filling the playfield.
    pub background: Color,
}

impl PlayfieldPresentation {
    /// Creates a playfield descriptor, rejecting zero-sized cells.
    pub fn new(
        columns: u32,
        rows: u32,
        cell_size: CellSize,
        background: Color,
    ) -> Result<Self, RenderingError> {
        if cell_size.width() == 0 || cell_size.height() == 0 {
            return Err(RenderingError::InvalidCellSize {
                width: cell_size.width(),
                height: cell_size.height(),
            });
        }

        Ok(Self {
            columns,
            rows,
            cell_size,
            background,
        })
    }

    /// Width of the playfield in world units.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.columns as f32 * self.cell_size.width() as f32
    }

    /// Height of the playfield in world units.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.rows as f32 * self.cell_size.height() as f32
    }

    /// Clamps a world-space position to the playfield bounds.
    #[must_use]
    pub fn clamp_world_position(&self, position: Vec2) -> Vec2 {
        Vec2::new(
            position.x.clamp(0.0, self.width()),
            position.y.clamp(0.0, self.height()),
        )
    }
}

/// Drawable instance of a single entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteInstance {
    /// Entity the sprite represents.
    pub entity: EntityId,
    /// Kind used to pick the sprite's look.
    pub kind: TileKind,
    /// Position, scale, opacity and rotation of the sprite.
    pub transform: Transform,
    /// Natural size of the sprite in world units.
    pub size: Vec2,
}

impl SpriteInstance {
    /// Builds a sprite sized to one grid cell from an entity snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &EntitySnapshot, cell_size: CellSize) -> Self {
        Self {
            entity: snapshot.id,
            kind: snapshot.kind,
            transform: snapshot.transform,
            size: cell_size.extent(),
        }
    }
}

/// Scene description of a running level.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Playfield the sprites are placed on.
    pub playfield: PlayfieldPresentation,
    /// Sprites in draw order.
    pub sprites: Vec<SpriteInstance>,
    /// Score shown in the corner of the screen.
    pub score: i64,
    /// Centred message, shown e.g. once the last level was finished.
    pub banner: Option<String>,
}

impl Scene {
    /// Creates a new scene descriptor; sprites are sorted into draw order.
    #[must_use]
    pub fn new(
        playfield: PlayfieldPresentation,
        mut sprites: Vec<SpriteInstance>,
        score: i64,
        banner: Option<String>,
    ) -> Self {
        sort_for_drawing(&mut sprites);
        Self {
            playfield,
            sprites,
            score,
            banner,
        }
    }

    /// Replaces the sprites, keeping draw order.
    pub fn set_sprites(&mut self, mut sprites: Vec<SpriteInstance>) {
        sort_for_drawing(&mut sprites);
        self.sprites = sprites;
    }

    /// Text of the score label.
    #[must_use]
    pub fn score_label(&self) -> String {
        format!("Score: {}", self.score)
    }
}

fn sort_for_drawing(sprites: &mut [SpriteInstance]) {
    sprites.sort_by_key(|sprite| (sprite.kind.z_order(), sprite.entity));
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            clear_color,
            scene,
        }
    }
}

/// Rendering backend capable of presenting Marble Maze scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The provided `update_scene` closure receives the frame delta and the
    /// input captured by the adapter, and may mutate the scene before it is
    /// rendered.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) + 'static;
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// Cells must have a positive width and height.
    InvalidCellSize {
        /// Provided cell width.
        width: u32,
        /// Provided cell height.
        height: u32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCellSize { width, height } => {
                write!(f, "cell size must be positive (received {width}x{height})")
            }
        }
    }
}

impl Error for RenderingError {}
