#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that boots the Marble Maze experience.

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use marble_maze_cli::{
    input::control_input,
    scene::{self, CLEAR_COLOR},
    simulate::{self, TiltScript},
    validate::validate_levels,
    GameConfig, Session, SessionEvent,
};
use marble_maze_physics::ArcadePhysics;
use marble_maze_rendering::{Presentation, RenderingBackend};
use marble_maze_rendering_macroquad::MacroquadBackend;
use marble_maze_system_controller::PointerTracker;
use marble_maze_system_level_loader::{DirectorySource, LevelLoader};

#[derive(Debug, Parser)]
#[command(name = "marble-maze", version, about = "Tilt the board, roll the marble")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding `level{n}.txt` files; overrides the configuration.
    #[arg(long, global = true)]
    levels_dir: Option<PathBuf>,
    /// Level to start on; overrides the configuration.
    #[arg(long, global = true)]
    first_level: Option<u32>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Open a window and play (default). Arrow keys tilt, dragging steers.
    Play,
    /// Run the game headlessly with a scripted tilt and print a summary.
    Simulate {
        /// Simulated seconds.
        #[arg(long, default_value_t = 30.0)]
        seconds: f32,
        /// Simulated frames per second.
        #[arg(long, default_value_t = 60)]
        fps: u32,
        /// Tilt steps such as "0.2,0@2 0,-0.2@2"; loops until the run ends.
        #[arg(long)]
        script: Option<TiltScript>,
    },
    /// Load every level and report problems.
    Validate,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = GameConfig::load(cli.config.as_deref())?;
    if let Some(levels_dir) = cli.levels_dir {
        config.levels_dir = levels_dir;
    }
    if let Some(first_level) = cli.first_level {
        if first_level == 0 {
            bail!("--first-level starts at 1");
        }
        config.first_level = first_level;
    }

    match cli.command.unwrap_or(Commands::Play) {
        Commands::Play => play(&config),
        Commands::Simulate {
            seconds,
            fps,
            script,
        } => run_simulation(&config, seconds, fps, script.unwrap_or_default()),
        Commands::Validate => run_validation(&config),
    }
}

fn loader(config: &GameConfig) -> LevelLoader<DirectorySource> {
    LevelLoader::with_cell_size(DirectorySource::new(&config.levels_dir), config.cell_size())
}

fn start_session(config: &GameConfig) -> Result<Session<DirectorySource, ArcadePhysics>> {
    Session::start(
        loader(config),
        ArcadePhysics::new(config.physics_config()),
        config.session_config(),
        config.first_level(),
    )
    .with_context(|| {
        format!(
            "failed to start level {} from {}",
            config.first_level,
            config.levels_dir.display()
        )
    })
}

fn play(config: &GameConfig) -> Result<()> {
    let mut session = start_session(config)?;
    let scene = scene::build(session.world(), false).context("failed to build the first scene")?;
    let presentation = Presentation::new(config.window.title.clone(), CLEAR_COLOR, scene);
    let backend = MacroquadBackend::new()
        .with_vsync(config.window.vsync)
        .with_show_fps(config.window.show_fps)
        .with_tilt_strength(config.gravity.key_tilt);

    let mut tracker = PointerTracker::new();
    let mut stopped = false;
    backend.run(presentation, move |dt, frame_input, scene| {
        if stopped {
            return;
        }
        let input = control_input(&mut tracker, frame_input);
        match session.frame(dt, input) {
            Ok(events) => {
                for event in &events {
                    if let SessionEvent::CampaignCompleted { score, .. } = event {
                        log::info!("campaign completed with score {score}");
                    }
                }
            }
            Err(error) => {
                log::error!("game stopped: {error:#}");
                stopped = true;
                scene.banner = Some(format!("Error: {error}"));
                return;
            }
        }
        if let Err(error) = scene::refresh(scene, session.world(), session.is_completed()) {
            log::error!("failed to refresh the scene: {error}");
            stopped = true;
        }
    })
}

fn run_simulation(config: &GameConfig, seconds: f32, fps: u32, script: TiltScript) -> Result<()> {
    if fps == 0 {
        bail!("--fps must be positive");
    }
    if !(seconds.is_finite() && seconds >= 0.0) {
        bail!("--seconds must be a non-negative number");
    }

    let mut session = start_session(config)?;
    let frame = Duration::from_secs_f64(1.0 / f64::from(fps));
    let frames = (f64::from(seconds) * f64::from(fps)).round() as u64;
    let summary = simulate::run(&mut session, &script, frame, frames, |events| {
        for event in events {
            log::debug!("{event:?}");
        }
    })
    .context("simulation stopped")?;

    println!("{summary}");
    Ok(())
}

fn run_validation(config: &GameConfig) -> Result<()> {
    let loader = loader(config);
    let reports = validate_levels(&loader, config.first_level());
    if reports.is_empty() {
        bail!(
            "no level {} found in {}",
            config.first_level,
            config.levels_dir.display()
        );
    }

    let mut failures = 0_usize;
    for report in &reports {
        match &report.outcome {
            Ok(stats) => println!("level {}: ok ({stats})", report.level),
            Err(error) => {
                failures += 1;
                println!("level {}: {error}", report.level);
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} levels failed validation", reports.len());
    }
    println!("{} levels ok", reports.len());
    Ok(())
}
