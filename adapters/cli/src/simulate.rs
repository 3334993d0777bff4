//! Headless runs driven by a scripted tilt sequence.

use std::{fmt, str::FromStr, time::Duration};

use glam::Vec2;
use marble_maze_core::{Event, LevelIndex, TileKind};
use marble_maze_physics::PhysicsWorld;
use marble_maze_system_controller::ControlInput;
use marble_maze_system_level_loader::LevelSource;
use thiserror::Error;

use crate::session::{Session, SessionError, SessionEvent};

/// Single step of a tilt script: hold `tilt` for `duration`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TiltStep {
    /// Acceleration reported by the emulated device, in g.
    pub tilt: Vec2,
    /// How long the reading is held.
    pub duration: Duration,
}

/// Tilt readings replayed in a loop during a headless run.
#[derive(Clone, Debug, PartialEq)]
pub struct TiltScript {
    steps: Vec<TiltStep>,
}

/// Raised when a tilt script cannot be parsed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// The script contains no steps.
    #[error("tilt script is empty")]
    Empty,
    /// A step is not of the form `x,y@seconds`.
    #[error("malformed tilt step {0:?}; expected x,y@seconds")]
    Malformed(String),
    /// A step lasts zero or a negative amount of time.
    #[error("tilt step {0:?} must last longer than zero seconds")]
    EmptyStep(String),
}

impl TiltScript {
    /// Creates a script from explicit steps.
    pub fn new(steps: Vec<TiltStep>) -> Result<Self, ScriptError> {
        if steps.is_empty() {
            return Err(ScriptError::Empty);
        }
        Ok(Self { steps })
    }

    /// Steps in playback order.
    #[must_use]
    pub fn steps(&self) -> &[TiltStep] {
        &self.steps
    }

    /// Length of one pass through the script.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.steps.iter().map(|step| step.duration).sum()
    }

    /// Tilt reading active at `elapsed`, looping over the script.
    #[must_use]
    pub fn tilt_at(&self, elapsed: Duration) -> Vec2 {
        let period = self.period().as_secs_f64();
        let mut offset = if period > 0.0 {
            elapsed.as_secs_f64() % period
        } else {
            0.0
        };
        for step in &self.steps {
            let length = step.duration.as_secs_f64();
            if offset < length {
                return step.tilt;
            }
            offset -= length;
        }
        self.steps.last().map(|step| step.tilt).unwrap_or(Vec2::ZERO)
    }
}

impl Default for TiltScript {
    /// Tips the board towards each edge in turn.
    fn default() -> Self {
        let step = |x: f32, y: f32| TiltStep {
            tilt: Vec2::new(x, y),
            duration: Duration::from_secs(2),
        };
        Self {
            steps: vec![
                step(0.2, 0.0),
                step(0.0, -0.2),
                step(-0.2, 0.0),
                step(0.0, 0.2),
            ],
        }
    }
}

impl FromStr for TiltScript {
    type Err = ScriptError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let steps = text
            .split_whitespace()
            .map(parse_step)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(steps)
    }
}

fn parse_step(text: &str) -> Result<TiltStep, ScriptError> {
    let malformed = || ScriptError::Malformed(text.to_owned());
    let (reading, seconds) = text.split_once('@').ok_or_else(malformed)?;
    let (x, y) = reading.split_once(',').ok_or_else(malformed)?;
    let x: f32 = x.trim().parse().map_err(|_| malformed())?;
    let y: f32 = y.trim().parse().map_err(|_| malformed())?;
    let seconds: f64 = seconds.trim().parse().map_err(|_| malformed())?;
    if !(seconds.is_finite() && seconds > 0.0) {
        return Err(ScriptError::EmptyStep(text.to_owned()));
    }
    Ok(TiltStep {
        tilt: Vec2::new(x, y),
        duration: Duration::from_secs_f64(seconds),
    })
}

/// Totals gathered over a headless run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames simulated.
    pub frames: u64,
    /// Final score.
    pub score: i64,
    /// Stars collected.
    pub stars: u32,
    /// Marbles lost to vortices.
    pub deaths: u32,
    /// Teleports taken.
    pub teleports: u32,
    /// Levels loaded after the first one.
    pub levels_advanced: u32,
    /// Whether the last level was finished.
    pub completed: bool,
    /// Level being played when the run ended.
    pub level: Option<LevelIndex>,
}

impl RunSummary {
    /// Folds a frame's events into the totals.
    pub fn record(&mut self, events: &[SessionEvent]) {
        for event in events {
            match event {
                SessionEvent::World(Event::EntityRemoved {
                    kind: TileKind::Star,
                    ..
                }) => self.stars += 1,
                SessionEvent::World(Event::ScoreChanged { score }) => {
                    if *score < self.score {
                        self.deaths += 1;
                    }
                    self.score = *score;
                }
                SessionEvent::World(Event::TeleportsChanged { open: false }) => {
                    self.teleports += 1;
                }
                SessionEvent::World(Event::LevelLoaded { .. }) => self.levels_advanced += 1,
                SessionEvent::CampaignCompleted { .. } => self.completed = true,
                SessionEvent::World(_) => {}
            }
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "frames simulated: {}", self.frames)?;
        writeln!(f, "score:            {}", self.score)?;
        writeln!(f, "stars collected:  {}", self.stars)?;
        writeln!(f, "vortex deaths:    {}", self.deaths)?;
        writeln!(f, "teleports taken:  {}", self.teleports)?;
        writeln!(f, "levels advanced:  {}", self.levels_advanced)?;
        match self.level {
            Some(level) => writeln!(f, "final level:      {level}")?,
            None => writeln!(f, "final level:      none")?,
        }
        write!(
            f,
            "campaign:         {}",
            if self.completed {
                "completed"
            } else {
                "in progress"
            }
        )
    }
}

/// Runs `session` for `frames` fixed frames, replaying `script`.
///
/// Stops early once the campaign is completed.
pub fn run<S, P>(
    session: &mut Session<S, P>,
    script: &TiltScript,
    frame: Duration,
    frames: u64,
    mut observe: impl FnMut(&[SessionEvent]),
) -> Result<RunSummary, SessionError>
where
    S: LevelSource,
    P: PhysicsWorld,
{
    let mut summary = RunSummary {
        score: session.state().score,
        ..RunSummary::default()
    };
    let mut elapsed = Duration::ZERO;
    for _ in 0..frames {
        let input = ControlInput::tilt(script.tilt_at(elapsed));
        let events = session.frame(frame, input)?;
        summary.frames += 1;
        summary.record(&events);
        observe(&events);
        elapsed += frame;
        if session.is_completed() {
            break;
        }
    }
    summary.completed = session.is_completed();
    summary.level = marble_maze_world::query::level(session.world()).map(|level| level.level);
    log::debug!("headless run finished after {} frames", summary.frames);
    Ok(summary)
}
