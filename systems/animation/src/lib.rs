#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Executes deferred [`Action`] descriptors over simulated time.
//!
//! The animator owns a private copy of every animated entity's transform and
//! reports changes through [`AnimationOutput`] values; it never touches the
//! world directly. Jobs are processed in the order they were scheduled so
//! that the outputs of a frame are deterministic.

use std::{collections::VecDeque, f32::consts::PI, time::Duration};

use marble_maze_core::{Action, Completion, EntityId, TileKind, Transform};

/// Change reported by [`Animator::advance`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnimationOutput {
    /// The transform of an animated entity changed.
    Transform {
        /// Entity being animated.
        entity: EntityId,
        /// Transform after this frame.
        transform: Transform,
    },
    /// An animation reached a [`Action::Remove`] step.
    Removed {
        /// Entity to remove.
        entity: EntityId,
    },
    /// A scheduled animation or delay finished.
    Completed {
        /// Continuation to resolve.
        completion: Completion,
    },
}

/// Looping action played by tiles that animate while idle.
#[must_use]
pub fn idle_action(kind: TileKind) -> Option<Action> {
    match kind {
        TileKind::Vortex => Some(Action::RepeatForever(Box::new(Action::RotateBy {
            radians: PI,
            duration: Duration::from_secs(1),
        }))),
        _ => None,
    }
}

/// Runs entity animations and plain delays.
#[derive(Debug, Default)]
pub struct Animator {
    jobs: Vec<Job>,
}

impl Animator {
    /// Creates an idle animator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts running `action` on `entity`, beginning from `transform`.
    ///
    /// `then` is reported once the action finishes or removes the entity.
    /// Actions that repeat forever only end when the entity is cancelled.
    pub fn schedule(
        &mut self,
        entity: EntityId,
        transform: Transform,
        action: Action,
        then: Vec<Completion>,
    ) {
        self.jobs.push(Job::Animate(Track {
            entity,
            transform,
            pending: VecDeque::from([action]),
            current: None,
            then,
        }));
    }

    /// Reports `then` once `duration` of simulated time has passed.
    pub fn delay(&mut self, duration: Duration, then: Vec<Completion>) {
        self.jobs.push(Job::Delay(Timer {
            remaining: duration,
            then,
        }));
    }

    /// Drops every animation running on `entity` without reporting completions.
    pub fn cancel_entity(&mut self, entity: EntityId) {
        self.jobs.retain(|job| match job {
            Job::Animate(track) => track.entity != entity,
            Job::Delay(_) => true,
        });
    }

    /// Drops every job without reporting completions.
    pub fn clear(&mut self) {
        self.jobs.clear();
    }

    /// Reports whether any animation is running on `entity`.
    #[must_use]
    pub fn is_animating(&self, entity: EntityId) -> bool {
        self.jobs
            .iter()
            .any(|job| matches!(job, Job::Animate(track) if track.entity == entity))
    }

    /// Reports whether no job is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Advances every job by `dt`, appending outputs in scheduling order.
    pub fn advance(&mut self, dt: Duration, out: &mut Vec<AnimationOutput>) {
        let jobs = std::mem::take(&mut self.jobs);
        for mut job in jobs {
            let finished = match &mut job {
                Job::Animate(track) => track.advance(dt, out),
                Job::Delay(timer) => timer.advance(dt),
            };
            if finished {
                out.extend(
                    job.into_completions()
                        .into_iter()
                        .map(|completion| AnimationOutput::Completed { completion }),
                );
            } else {
                self.jobs.push(job);
            }
        }
    }
}

#[derive(Debug)]
enum Job {
    Animate(Track),
    Delay(Timer),
}

impl Job {
    fn into_completions(self) -> Vec<Completion> {
        match self {
            Self::Animate(track) => track.then,
            Self::Delay(timer) => timer.then,
        }
    }
}

#[derive(Debug)]
struct Timer {
    remaining: Duration,
    then: Vec<Completion>,
}

impl Timer {
    fn advance(&mut self, dt: Duration) -> bool {
        self.remaining = self.remaining.saturating_sub(dt);
        self.remaining.is_zero()
    }
}

enum Progress {
    Running,
    Finished,
    Removed,
}

#[derive(Debug)]
struct Track {
    entity: EntityId,
    transform: Transform,
    pending: VecDeque<Action>,
    current: Option<Step>,
    then: Vec<Completion>,
}

impl Track {
    fn advance(&mut self, dt: Duration, out: &mut Vec<AnimationOutput>) -> bool {
        let before = self.transform;
        let mut budget = dt;

        let progress = loop {
            if self.current.is_none() {
                let Some(action) = self.pending.pop_front() else {
                    break Progress::Finished;
                };
                if let Some(progress) = self.start(action) {
                    break progress;
                }
                continue;
            }

            let Some(step) = self.current.as_mut() else {
                continue;
            };
            let needed = step.duration.saturating_sub(step.elapsed);
            if budget >= needed {
                budget -= needed;
                step.elapsed = step.duration;
                self.transform = step.sample();
                self.current = None;
            } else {
                step.elapsed += budget;
                self.transform = step.sample();
                break Progress::Running;
            }
        };

        if self.transform != before {
            out.push(AnimationOutput::Transform {
                entity: self.entity,
                transform: self.transform,
            });
        }

        match progress {
            Progress::Running => false,
            Progress::Finished => true,
            Progress::Removed => {
                out.push(AnimationOutput::Removed {
                    entity: self.entity,
                });
                true
            }
        }
    }

    // Expands composite actions into the queue; returns a progress only when
    // the track ends.
    fn start(&mut self, action: Action) -> Option<Progress> {
        match action {
            Action::Remove => {
                self.pending.clear();
                Some(Progress::Removed)
            }
            Action::Sequence(actions) => {
                for child in actions.into_iter().rev() {
                    self.pending.push_front(child);
                }
                None
            }
            Action::RepeatForever(inner) => {
                if inner.duration() == Some(Duration::ZERO) {
                    log::warn!(
                        "dropping zero-length repeating action on entity {}",
                        self.entity
                    );
                    return None;
                }
                self.pending.push_front(Action::RepeatForever(inner.clone()));
                self.pending.push_front(*inner);
                None
            }
            primitive => {
                let duration = primitive.duration().unwrap_or_default();
                self.current = Some(Step {
                    action: primitive,
                    start: self.transform,
                    duration,
                    elapsed: Duration::ZERO,
                });
                None
            }
        }
    }
}

#[derive(Debug)]
struct Step {
    action: Action,
    start: Transform,
    duration: Duration,
    elapsed: Duration,
}

impl Step {
    fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    fn sample(&self) -> Transform {
        let t = self.progress();
        let mut transform = self.start;
        match &self.action {
            Action::MoveTo { target, .. } => {
                transform.position = self.start.position.lerp(*target, t);
            }
            Action::ScaleTo { scale, .. } => {
                transform.scale = lerp(self.start.scale, *scale, t);
            }
            Action::FadeTo { alpha, .. } => {
                transform.alpha = lerp(self.start.alpha, *alpha, t);
            }
            Action::RotateBy { radians, .. } => {
                transform.rotation = self.start.rotation + radians * t;
            }
            Action::Wait { .. }
            | Action::Remove
            | Action::Sequence(_)
            | Action::RepeatForever(_) => {}
        }
        transform
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}
