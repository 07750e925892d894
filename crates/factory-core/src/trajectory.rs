//! Piecewise-linear paths with duration and easing.

use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Progress remapping applied before a trajectory is evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => {
                let inv = 1.0 - t;
                1.0 - inv * inv * inv
            }
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let inv = -2.0 * t + 2.0;
                    1.0 - inv * inv * inv / 2.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Segment {
    start_progress: f32,
    end_progress: f32,
    length: f32,
}

/// An ordered waypoint path with a precomputed cumulative-length table.
/// Evaluating at a progress value in `[0, 1]` locates the containing
/// segment and lerps within it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    waypoints: Vec<Point>,
    segments: Vec<Segment>,
    total_length: f32,
}

impl Trajectory {
    pub fn new(waypoints: Vec<Point>) -> Result<Self, TrajectoryError> {
        if waypoints.len() < 2 {
            return Err(TrajectoryError::TooFewWaypoints {
                count: waypoints.len(),
            });
        }

        let lengths: Vec<f32> = waypoints
            .windows(2)
            .map(|pair| pair[0].distance(pair[1]))
            .collect();
        let total_length: f32 = lengths.iter().sum();

        let mut segments = Vec::with_capacity(lengths.len());
        let mut covered = 0.0f32;
        for length in lengths {
            let start_progress = if total_length > 0.0 {
                covered / total_length
            } else {
                0.0
            };
            covered += length;
            let end_progress = if total_length > 0.0 {
                covered / total_length
            } else {
                0.0
            };
            segments.push(Segment {
                start_progress,
                end_progress,
                length,
            });
        }

        Ok(Self {
            waypoints,
            segments,
            total_length,
        })
    }

    pub fn waypoints(&self) -> &[Point] {
        &self.waypoints
    }

    pub fn total_length(&self) -> f32 {
        self.total_length
    }

    pub fn start(&self) -> Point {
        self.waypoints[0]
    }

    pub fn end(&self) -> Point {
        self.waypoints[self.waypoints.len() - 1]
    }

    /// Travel time at a constant `speed`, in the scheduler's time unit.
    pub fn duration(&self, speed: f32) -> f32 {
        debug_assert!(speed > 0.0, "duration requires a positive speed");
        self.total_length / speed
    }

    pub fn position_at(&self, progress: f32) -> Point {
        let progress = progress.clamp(0.0, 1.0);
        if self.total_length == 0.0 {
            return self.waypoints[0];
        }

        let index = self
            .segments
            .iter()
            .position(|seg| progress <= seg.end_progress)
            .unwrap_or(self.segments.len() - 1);
        let segment = &self.segments[index];

        // Zero-length segments resolve their local progress to 0.
        let local = if segment.length == 0.0 {
            0.0
        } else {
            (progress - segment.start_progress) / (segment.end_progress - segment.start_progress)
        };

        let from = self.waypoints[index];
        let to = self.waypoints[index + 1];
        Point::new(
            from.x + (to.x - from.x) * local,
            from.y + (to.y - from.y) * local,
        )
    }

    pub fn eased_position_at(&self, progress: f32, easing: Easing) -> Point {
        self.position_at(easing.apply(progress))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryError {
    TooFewWaypoints { count: usize },
}

impl fmt::Display for TrajectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrajectoryError::TooFewWaypoints { count } => {
                write!(f, "a trajectory needs at least 2 waypoints, got {count}")
            }
        }
    }
}

impl std::error::Error for TrajectoryError {}
