#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure level loading system that turns level text into tile placements.
//!
//! Level text is a newline separated grid of single-character tile symbols.
//! The last physical line is the bottom row of the playfield, so rows are
//! reversed before world positions are computed. Loading either produces a
//! complete [`LevelLayout`] or fails; partial layouts are never returned.

use std::{collections::BTreeMap, fs, io, path::PathBuf};

use marble_maze_core::{
    CellSize, GridPosition, LevelError, LevelIndex, LevelLayout, Placement, TileKind,
};

/// Resolves level identifiers to raw level text.
pub trait LevelSource {
    /// Reads the text of the provided level.
    fn read(&self, level: LevelIndex) -> Result<String, LevelError>;

    /// Reports whether a resource exists for the provided level.
    fn contains(&self, level: LevelIndex) -> bool;
}

/// Level source reading `level{index}.txt` files from a directory.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Creates a source rooted at the provided directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the file backing the provided level.
    #[must_use]
    pub fn path_for(&self, level: LevelIndex) -> PathBuf {
        self.root.join(format!("level{level}.txt"))
    }
}

impl LevelSource for DirectorySource {
    fn read(&self, level: LevelIndex) -> Result<String, LevelError> {
        let path = self.path_for(level);
        fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                LevelError::ResourceNotFound { level }
            } else {
                LevelError::ResourceUnreadable { level, source }
            }
        })
    }

    fn contains(&self, level: LevelIndex) -> bool {
        self.path_for(level).is_file()
    }
}

/// Level source backed by in-memory text.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    levels: BTreeMap<LevelIndex, String>,
}

impl MemorySource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the text of a level.
    #[must_use]
    pub fn with_level(mut self, level: LevelIndex, text: impl Into<String>) -> Self {
        let _ = self.levels.insert(level, text.into());
        self
    }
}

impl LevelSource for MemorySource {
    fn read(&self, level: LevelIndex) -> Result<String, LevelError> {
        self.levels
            .get(&level)
            .cloned()
            .ok_or(LevelError::ResourceNotFound { level })
    }

    fn contains(&self, level: LevelIndex) -> bool {
        self.levels.contains_key(&level)
    }
}

/// Loads levels from a [`LevelSource`] using a fixed cell size.
#[derive(Clone, Debug)]
pub struct LevelLoader<S> {
    source: S,
    cell_size: CellSize,
}

impl<S: LevelSource> LevelLoader<S> {
    /// Creates a loader using the default 64×64 cell size.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_cell_size(source, CellSize::DEFAULT)
    }

    /// Creates a loader using the provided cell size.
    #[must_use]
    pub fn with_cell_size(source: S, cell_size: CellSize) -> Self {
        Self { source, cell_size }
    }

    /// Cell size used to convert grid to world coordinates.
    #[must_use]
    pub const fn cell_size(&self) -> CellSize {
        self.cell_size
    }

    /// Reports whether the underlying source provides the level.
    #[must_use]
    pub fn has_level(&self, level: LevelIndex) -> bool {
        self.source.contains(level)
    }

    /// Reads, parses and validates the provided level.
    pub fn load(&self, level: LevelIndex) -> Result<LevelLayout, LevelError> {
        let text = self.source.read(level)?;
        let layout = parse_layout(level, &text, self.cell_size)?;
        log::debug!(
            "parsed level {level}: {}x{} grid, {} placements",
            layout.columns,
            layout.rows,
            layout.placements.len()
        );
        Ok(layout)
    }
}

/// Parses level text into a validated layout.
///
/// Empty lines are dropped before the remaining rows are reversed so that the
/// last line of the text becomes row 0.
pub fn parse_layout(
    level: LevelIndex,
    text: &str,
    cell_size: CellSize,
) -> Result<LevelLayout, LevelError> {
    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .collect();

    let mut placements = Vec::new();
    let mut columns = 0_u32;
    for (row, (line_index, line)) in lines.iter().rev().enumerate() {
        let mut width = 0_u32;
        for (column, symbol) in line.chars().enumerate() {
            width = width.saturating_add(1);
            let kind = TileKind::classify(symbol).map_err(|source| LevelError::UnknownTileSymbol {
                level,
                line: line_index + 1,
                column: column + 1,
                source,
            })?;
            let Some(masks) = kind.masks() else {
                continue;
            };
            let grid = GridPosition::new(to_u32(row), to_u32(column));
            placements.push(Placement {
                kind,
                grid,
                position: cell_size.center_of(grid),
                masks,
            });
        }
        columns = columns.max(width);
    }

    let layout = LevelLayout {
        level,
        cell_size,
        rows: to_u32(lines.len()),
        columns,
        placements,
    };
    validate(&layout)?;
    Ok(layout)
}

fn validate(layout: &LevelLayout) -> Result<(), LevelError> {
    let players = layout.count(TileKind::Player);
    if players != 1 {
        return Err(LevelError::PlayerStartCount {
            level: layout.level,
            count: players,
        });
    }

    let teleports = layout.count(TileKind::Teleport);
    if teleports != 0 && teleports != 2 {
        return Err(LevelError::TeleportPairing {
            level: layout.level,
            count: teleports,
        });
    }

    Ok(())
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
