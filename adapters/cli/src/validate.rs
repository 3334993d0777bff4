//! Checks every level of a campaign without opening a window.

use std::fmt;

use marble_maze_core::{Command, LevelIndex, LevelLayout, TileKind};
use marble_maze_system_level_loader::{LevelLoader, LevelSource};
use marble_maze_world::{apply, rejection, World};

use crate::session::SessionError;

/// Contents of a level that passed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelStats {
    /// Grid columns.
    pub columns: u32,
    /// Grid rows.
    pub rows: u32,
    /// Stars to collect.
    pub stars: usize,
    /// Vortex hazards.
    pub vortices: usize,
    /// Teleport pads.
    pub teleports: usize,
    /// Finish tiles.
    pub finishes: usize,
}

impl LevelStats {
    fn from_layout(layout: &LevelLayout) -> Self {
        Self {
            columns: layout.columns,
            rows: layout.rows,
            stars: layout.count(TileKind::Star),
            vortices: layout.count(TileKind::Vortex),
            teleports: layout.count(TileKind::Teleport),
            finishes: layout.count(TileKind::Finish),
        }
    }
}

impl fmt::Display for LevelStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} grid, {} stars, {} vortices, {} teleports, {} finish tiles",
            self.columns, self.rows, self.stars, self.vortices, self.teleports, self.finishes
        )
    }
}

/// Validation outcome of a single level.
#[derive(Debug)]
pub struct LevelReport {
    /// Level that was checked.
    pub level: LevelIndex,
    /// Statistics, or the reason the level cannot be played.
    pub outcome: Result<LevelStats, SessionError>,
}

impl LevelReport {
    /// Reports whether the level can be played.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Loads every consecutive level starting at `first` and materialises it in a scratch world.
pub fn validate_levels<S: LevelSource>(
    loader: &LevelLoader<S>,
    first: LevelIndex,
) -> Vec<LevelReport> {
    let mut reports = Vec::new();
    let mut level = first;
    while loader.has_level(level) {
        let outcome = check(loader, level);
        if let Err(error) = &outcome {
            log::warn!("level {level} failed validation: {error}");
        }
        reports.push(LevelReport { level, outcome });
        level = level.next();
    }
    reports
}

fn check<S: LevelSource>(
    loader: &LevelLoader<S>,
    level: LevelIndex,
) -> Result<LevelStats, SessionError> {
    let layout = loader.load(level)?;
    let stats = LevelStats::from_layout(&layout);
    let mut world = World::new();
    let mut events = Vec::new();
    apply(&mut world, Command::LoadLevel { layout }, &mut events);
    if let Some(reason) = rejection(&events) {
        return Err(SessionError::LevelRejected { level, reason });
    }
    Ok(stats)
}
