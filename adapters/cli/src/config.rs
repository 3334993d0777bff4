//! Game configuration loaded from an optional TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! stock game. Unknown keys are rejected to surface typos early.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use marble_maze_core::{CellSize, LevelIndex, GAME_TITLE};
use marble_maze_physics::PhysicsConfig;
use marble_maze_system_collision::ResponderConfig;
use marble_maze_system_controller::GravityConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::session::{BodyConfig, SessionConfig};

/// Failures raised while reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration file {path}")]
    Io {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The file is not valid configuration TOML.
    #[error("failed to parse configuration file {path}")]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: toml::de::Error,
    },
    /// A value is outside its allowed range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level game configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Directory holding `level{n}.txt` files.
    pub levels_dir: PathBuf,
    /// Level a new game starts on.
    pub first_level: u32,
    /// Grid geometry.
    pub grid: GridSettings,
    /// Input-to-gravity constants.
    pub gravity: GravitySettings,
    /// Physics tuning.
    pub physics: PhysicsSettings,
    /// Transition timings in milliseconds.
    pub timings: TimingSettings,
    /// Window options used by `play`.
    pub window: WindowSettings,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            levels_dir: PathBuf::from("levels"),
            first_level: LevelIndex::FIRST.get(),
            grid: GridSettings::default(),
            gravity: GravitySettings::default(),
            physics: PhysicsSettings::default(),
            timings: TimingSettings::default(),
            window: WindowSettings::default(),
        }
    }
}

/// Size of a single grid cell in world units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridSettings {
    /// Cell width.
    pub cell_width: u32,
    /// Cell height.
    pub cell_height: u32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            cell_width: CellSize::DEFAULT.width(),
            cell_height: CellSize::DEFAULT.height(),
        }
    }
}

/// Constants turning input into gravity.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GravitySettings {
    /// Divisor applied to the pointer offset.
    pub pointer_divisor: f32,
    /// Scale applied to tilt readings.
    pub tilt_scale: f32,
    /// Tilt, in g, emulated while an arrow key is held.
    pub key_tilt: f32,
}

impl Default for GravitySettings {
    fn default() -> Self {
        let defaults = GravityConfig::default();
        Self {
            pointer_divisor: defaults.pointer_divisor(),
            tilt_scale: defaults.tilt_scale(),
            key_tilt: 0.2,
        }
    }
}

/// Physics tuning.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsSettings {
    /// Radius of the marble.
    pub player_radius: f32,
    /// Radius of circular tiles.
    pub tile_radius: f32,
    /// Linear damping of the marble.
    pub linear_damping: f32,
    /// Bounciness of every collider.
    pub restitution: f32,
    /// World units per metre.
    pub points_per_metre: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        let bodies = BodyConfig::default();
        let physics = PhysicsConfig::default();
        Self {
            player_radius: bodies.player_radius,
            tile_radius: bodies.tile_radius,
            linear_damping: bodies.linear_damping,
            restitution: physics.restitution,
            points_per_metre: physics.points_per_metre,
        }
    }
}

/// Transition timings in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingSettings {
    /// Marble sliding into a vortex.
    pub death_move_ms: u64,
    /// Marble shrinking inside a vortex.
    pub death_shrink_ms: u64,
    /// Marble sliding onto a teleport pad.
    pub teleport_move_ms: u64,
    /// Each of the two teleport fades.
    pub teleport_fade_ms: u64,
    /// Marble sliding onto the finish.
    pub finish_move_ms: u64,
    /// Marble shrinking on the finish.
    pub finish_shrink_ms: u64,
    /// Pause between loading a level and spawning the marble.
    pub respawn_delay_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        let defaults = ResponderConfig::default();
        let millis = |duration: Duration| duration.as_millis() as u64;
        Self {
            death_move_ms: millis(defaults.death_move()),
            death_shrink_ms: millis(defaults.death_shrink()),
            teleport_move_ms: millis(defaults.teleport_move()),
            teleport_fade_ms: millis(defaults.teleport_fade()),
            finish_move_ms: millis(defaults.finish_move()),
            finish_shrink_ms: millis(defaults.finish_shrink()),
            respawn_delay_ms: millis(defaults.respawn_delay()),
        }
    }
}

/// Window options used by `play`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSettings {
    /// Window title.
    pub title: String,
    /// Synchronise presentation with the display refresh rate.
    pub vsync: bool,
    /// Log frame timings once per second.
    pub show_fps: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: GAME_TITLE.to_owned(),
            vsync: true,
            show_fps: false,
        }
    }
}

impl GameConfig {
    /// Reads the configuration from `path`, or returns the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|error| match error {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.first_level == 0 {
            return Err(ConfigError::Invalid("first_level starts at 1".to_owned()));
        }
        if self.grid.cell_width == 0 || self.grid.cell_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "cell size must be positive (received {}x{})",
                self.grid.cell_width, self.grid.cell_height
            )));
        }
        if self.gravity.pointer_divisor == 0.0 {
            return Err(ConfigError::Invalid(
                "gravity.pointer_divisor must not be zero".to_owned(),
            ));
        }
        if self.physics.player_radius <= 0.0 || self.physics.tile_radius <= 0.0 {
            return Err(ConfigError::Invalid("radii must be positive".to_owned()));
        }
        Ok(())
    }

    /// Level a new game starts on.
    #[must_use]
    pub fn first_level(&self) -> LevelIndex {
        LevelIndex::new(self.first_level)
    }

    /// Grid cell size.
    #[must_use]
    pub fn cell_size(&self) -> CellSize {
        CellSize::new(self.grid.cell_width, self.grid.cell_height)
    }

    /// Tuning for the physics backend.
    #[must_use]
    pub fn physics_config(&self) -> PhysicsConfig {
        PhysicsConfig {
            points_per_metre: self.physics.points_per_metre,
            restitution: self.physics.restitution,
        }
    }

    /// Tuning for the systems driven by a session.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        let timings = &self.timings;
        SessionConfig {
            responder: ResponderConfig::new(
                Duration::from_millis(timings.death_move_ms),
                Duration::from_millis(timings.death_shrink_ms),
                Duration::from_millis(timings.teleport_move_ms),
                Duration::from_millis(timings.teleport_fade_ms),
                Duration::from_millis(timings.finish_move_ms),
                Duration::from_millis(timings.finish_shrink_ms),
                Duration::from_millis(timings.respawn_delay_ms),
            ),
            gravity: GravityConfig::new(self.gravity.pointer_divisor, self.gravity.tilt_scale),
            bodies: BodyConfig {
                player_radius: self.physics.player_radius,
                tile_radius: self.physics.tile_radius,
                linear_damping: self.physics.linear_damping,
            },
        }
    }
}
