//! Balls: the mobile units sampled out of sacks.
//!
//! A ball's whole life is precomputed as a timeline of timed phases, so
//! evaluating it at a point in time is pure — two evaluations at the
//! same time yield the same sample.

use factory_core::model::color::Color;
use factory_core::trajectory::{Easing, Point, Trajectory};
use serde::{Deserialize, Serialize};

const SPAWN_GROW_SECONDS: f32 = 0.2;

/// Component-relative sub-state of a ball.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BallState {
    /// Waiting inside its originating sack right after spawn.
    InSack { component: String, at: Point },
    /// Travelling a trajectory between two components.
    InTransit {
        from: String,
        to: String,
        trajectory: Trajectory,
        easing: Easing,
        duration: f32,
    },
    /// Paused inside a component with an entry/exit animation.
    Buffered {
        component: String,
        at: Point,
        duration: f32,
    },
    /// Terminal visual transition before removal.
    Fading {
        component: String,
        at: Point,
        duration: f32,
    },
    /// Removed from the simulation; excluded from rendering.
    Consumed,
}

impl BallState {
    /// The component this state is anchored to; transit anchors to its
    /// destination.
    pub fn component(&self) -> Option<&str> {
        match self {
            BallState::InSack { component, .. }
            | BallState::Buffered { component, .. }
            | BallState::Fading { component, .. } => Some(component),
            BallState::InTransit { to, .. } => Some(to),
            BallState::Consumed => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedPhase {
    pub start: f32,
    pub state: BallState,
}

/// What the renderer needs for one ball at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSample {
    pub position: Point,
    pub opacity: f32,
    pub scale: f32,
    pub rotation: f32,
}

/// One ball's precomputed life: spawn, hops, buffering, fade-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallTimeline {
    id: usize,
    color: Color,
    sack_name: String,
    phases: Vec<TimedPhase>,
}

impl BallTimeline {
    pub fn new(id: usize, color: Color, sack_name: impl Into<String>, phases: Vec<TimedPhase>) -> Self {
        debug_assert!(
            phases.windows(2).all(|pair| pair[0].start <= pair[1].start),
            "phases must be time-ordered"
        );
        Self {
            id,
            color,
            sack_name: sack_name.into(),
            phases,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn sack_name(&self) -> &str {
        &self.sack_name
    }

    pub fn spawn_time(&self) -> f32 {
        self.phases.first().map(|p| p.start).unwrap_or(0.0)
    }

    pub fn phases(&self) -> &[TimedPhase] {
        &self.phases
    }

    /// Last phase whose start is at or before `time`, plus elapsed time
    /// within it. `None` before spawn.
    pub fn phase_at(&self, time: f32) -> Option<(&TimedPhase, f32)> {
        if self.phases.is_empty() || time < self.phases[0].start {
            return None;
        }
        let index = self
            .phases
            .iter()
            .rposition(|p| p.start <= time)
            .expect("checked above");
        Some((&self.phases[index], time - self.phases[index].start))
    }

    /// The ball's current component, if it still has one.
    pub fn component_at(&self, time: f32) -> Option<&str> {
        self.phase_at(time).and_then(|(phase, _)| phase.state.component())
    }

    /// Renderable sample at `time`; `None` before spawn and after
    /// consumption.
    pub fn sample_at(&self, time: f32) -> Option<BallSample> {
        let (phase, elapsed) = self.phase_at(time)?;
        match &phase.state {
            BallState::InSack { at, .. } => Some(BallSample {
                position: *at,
                opacity: 1.0,
                scale: (elapsed / SPAWN_GROW_SECONDS).clamp(0.0, 1.0),
                rotation: 0.0,
            }),
            BallState::InTransit {
                trajectory,
                easing,
                duration,
                ..
            } => {
                let progress = if *duration > 0.0 {
                    (elapsed / duration).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                Some(BallSample {
                    position: trajectory.eased_position_at(progress, *easing),
                    opacity: 1.0,
                    scale: 1.0,
                    rotation: easing.apply(progress) * trajectory.total_length() * 0.05,
                })
            }
            BallState::Buffered { at, duration, .. } => {
                let phase_angle = (elapsed / duration).clamp(0.0, 1.0) * std::f32::consts::PI;
                Some(BallSample {
                    position: Point::new(at.x, at.y + 2.0 * phase_angle.sin()),
                    opacity: 1.0,
                    scale: 1.0,
                    rotation: 0.0,
                })
            }
            BallState::Fading { at, duration, .. } => {
                let t = (elapsed / duration).clamp(0.0, 1.0);
                Some(BallSample {
                    position: *at,
                    opacity: 1.0 - t,
                    scale: 1.0 - 0.5 * t,
                    rotation: 0.0,
                })
            }
            BallState::Consumed => None,
        }
    }
}
