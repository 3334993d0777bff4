//! Builds rendering scenes from world queries.

use marble_maze_core::TileKind;
use marble_maze_rendering::{Color, PlayfieldPresentation, RenderingError, Scene, SpriteInstance};
use marble_maze_world::{query, World};

/// Color filling the playfield.
pub const PLAYFIELD_COLOR: Color = Color::from_rgb_u8(0x2b, 0x23, 0x1c);

/// Color clearing the window around the playfield.
pub const CLEAR_COLOR: Color = Color::from_rgb_u8(0x10, 0x0c, 0x08);

/// Banner shown once the last level has been finished.
pub const COMPLETED_BANNER: &str = "All levels complete!";

/// Playfield descriptor sized to the level currently loaded.
pub fn playfield(world: &World) -> Result<PlayfieldPresentation, RenderingError> {
    let summary = query::level(world);
    let (columns, rows, cell_size) = summary
        .map(|summary| (summary.columns, summary.rows, summary.cell_size))
        .unwrap_or_default();
    PlayfieldPresentation::new(columns, rows, cell_size, PLAYFIELD_COLOR)
}

/// Sprites for every visible entity.
#[must_use]
pub fn sprites(world: &World) -> Vec<SpriteInstance> {
    let cell_size = query::level(world)
        .map(|summary| summary.cell_size)
        .unwrap_or_default();
    query::entity_view(world)
        .iter()
        .filter(|entity| entity.kind != TileKind::Space)
        .map(|entity| SpriteInstance::from_snapshot(entity, cell_size))
        .collect()
}

/// Builds a fresh scene for the world.
pub fn build(world: &World, completed: bool) -> Result<Scene, RenderingError> {
    Ok(Scene::new(
        playfield(world)?,
        sprites(world),
        query::game_state(world).score,
        banner(completed),
    ))
}

/// Refreshes `scene` in place; the playfield follows level changes.
pub fn refresh(scene: &mut Scene, world: &World, completed: bool) -> Result<(), RenderingError> {
    scene.playfield = playfield(world)?;
    scene.set_sprites(sprites(world));
    scene.score = query::game_state(world).score;
    scene.banner = banner(completed);
    Ok(())
}

fn banner(completed: bool) -> Option<String> {
    completed.then(|| COMPLETED_BANNER.to_owned())
}
