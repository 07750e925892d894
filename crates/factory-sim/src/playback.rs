//! Playback: replays a script's instruction stream and sampling schedule
//! as a timed sequence of component and ball state changes.
//!
//! Everything is precomputed at build time into timelines; evaluating a
//! snapshot is a pure function of the timelines and the requested time,
//! so a host clock can tick, pause, or seek freely.

use crate::ball::{BallState, BallTimeline, TimedPhase};
use crate::component::{Component, ComponentCatalog, Direction};
use crate::snapshot::{BallView, ComponentView, RenderSnapshot};
use factory_core::model::instruction::AnimationInstruction;
use factory_core::model::level::ComponentPlacement;
use factory_core::rng::Lcg;
use factory_core::script::ScriptOutput;
use factory_core::trajectory::{Easing, Trajectory};
use tracing::debug;

/// Ball travel speed in layout units per second.
const BALL_SPEED: f32 = 120.0;
const SACK_DWELL_SECONDS: f32 = 0.4;
const BUFFER_SECONDS: f32 = 1.2;
const FADE_SECONDS: f32 = 0.6;
const DEFINE_SECONDS: f32 = 1.0;
const SWAP_SECONDS: f32 = 0.6;
const SELECT_SECONDS: f32 = 0.8;

/// One intro animation span covering a single script instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct IntroPhase {
    pub start: f32,
    pub duration: f32,
    pub instruction: AnimationInstruction,
}

/// A fully built, replayable simulation.
#[derive(Debug, Clone)]
pub struct Playback {
    catalog: ComponentCatalog,
    components: Vec<Component>,
    intro: Vec<IntroPhase>,
    intro_duration: f32,
    balls: Vec<BallTimeline>,
    duration: f32,
}

impl Playback {
    /// Builds playback over the builtin component catalog. Sack
    /// components are matched to exported sacks by placement id, so a
    /// layout must place one component per scheduled sack name.
    pub fn build(output: &ScriptOutput, layout: &[ComponentPlacement], seed: u64) -> Self {
        Self::build_with_catalog(output, layout, ComponentCatalog::builtin(), seed)
    }

    pub fn build_with_catalog(
        output: &ScriptOutput,
        layout: &[ComponentPlacement],
        catalog: ComponentCatalog,
        seed: u64,
    ) -> Self {
        let components: Vec<Component> = layout
            .iter()
            .map(|placement| Component::from_placement(placement, &catalog))
            .collect();

        let mut intro = Vec::new();
        let mut cursor = 0.0f32;
        for instruction in &output.instructions {
            let duration = match instruction {
                AnimationInstruction::Define { .. } => DEFINE_SECONDS,
                AnimationInstruction::Permute { swaps, .. } => {
                    SWAP_SECONDS * swaps.len().max(1) as f32
                }
                AnimationInstruction::Select { .. } => SELECT_SECONDS,
            };
            intro.push(IntroPhase {
                start: cursor,
                duration,
                instruction: instruction.clone(),
            });
            cursor += duration;
        }
        let intro_duration = cursor;

        let mut rng = Lcg::new(seed);
        let mut balls = Vec::with_capacity(output.schedule.len());
        let mut duration = intro_duration;
        for (ball_id, entry) in output.schedule.iter().enumerate() {
            let template = output
                .template_by_id(&entry.template_id)
                .unwrap_or_else(|| panic!("schedule references unknown template '{}'", entry.template_id));
            let ball = build_ball(
                ball_id,
                &entry.sack_name,
                template.distribution(),
                intro_duration + entry.time as f32,
                &components,
                &catalog,
                &mut rng,
            );
            duration = duration.max(ball.phases().last().map(|p| p.start).unwrap_or(0.0));
            balls.push(ball);
        }

        debug!(
            components = components.len(),
            balls = balls.len(),
            intro_duration = f64::from(intro_duration),
            duration = f64::from(duration),
            "playback timeline built"
        );

        Self {
            catalog,
            components,
            intro,
            intro_duration,
            balls,
            duration,
        }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn balls(&self) -> &[BallTimeline] {
        &self.balls
    }

    pub fn intro(&self) -> &[IntroPhase] {
        &self.intro
    }

    pub fn intro_duration(&self) -> f32 {
        self.intro_duration
    }

    /// Time at which the last ball reaches its terminal state.
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Pure per-tick evaluation: same time in, same snapshot out.
    pub fn snapshot_at(&self, time: f32) -> RenderSnapshot {
        let components = self
            .components
            .iter()
            .map(|component| self.component_view(component, time))
            .collect();

        let balls = self
            .balls
            .iter()
            .filter_map(|ball| {
                let sample = ball.sample_at(time)?;
                let color_visible = ball
                    .component_at(time)
                    .and_then(|id| self.component(id))
                    .map(|component| !component.plex())
                    .unwrap_or(true);
                Some(BallView {
                    id: ball.id(),
                    sack_name: ball.sack_name().to_string(),
                    color: ball.color(),
                    color_visible,
                    position: sample.position,
                    opacity: sample.opacity,
                    scale: sample.scale,
                    rotation: sample.rotation,
                })
            })
            .collect();

        RenderSnapshot {
            time,
            components,
            balls,
        }
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id() == id)
    }

    fn component_view(&self, component: &Component, time: f32) -> ComponentView {
        let spec = self.catalog.spec(component.kind());
        let engaged = self.balls.iter().any(|ball| {
            ball.component_at(time) == Some(component.id())
                && matches!(
                    ball.phase_at(time),
                    Some((
                        TimedPhase {
                            state: BallState::InSack { .. } | BallState::Buffered { .. },
                            ..
                        },
                        _
                    ))
                )
        });
        let state = if engaged {
            spec.active_state()
        } else {
            spec.idle_state()
        };

        let direction = component
            .outputs()
            .first()
            .and_then(|id| self.component(id))
            .map(|next| {
                let delta_x = next.position().x - component.position().x;
                let delta_y = next.position().y - component.position().y;
                Direction::from_offset(delta_x, delta_y)
            })
            .unwrap_or(Direction::Right);

        let motion_offset = state.motion.offset_at(time);
        let mut position = component.position();
        position.x += motion_offset.x;
        position.y += motion_offset.y;

        ComponentView {
            id: component.id().to_string(),
            kind: component.kind().to_string(),
            position,
            state: state.name.clone(),
            asset: spec.asset_for(&state.name, direction),
            plex: component.plex(),
            opacity: state.visual.opacity,
            scale: state.visual.scale,
        }
    }
}

/// Walks the component graph from the originating sack and lays the
/// ball's full life down as timed phases.
fn build_ball(
    ball_id: usize,
    sack_name: &str,
    distribution: &factory_core::model::distribution::Distribution,
    spawn_time: f32,
    components: &[Component],
    catalog: &ComponentCatalog,
    rng: &mut Lcg,
) -> BallTimeline {
    let sack = components
        .iter()
        .find(|c| c.id() == sack_name)
        .unwrap_or_else(|| panic!("no component placed for sack '{sack_name}'"));

    let (colors, weights) = distribution.weights();
    let color = *rng
        .weighted_choice(&colors, &weights)
        .unwrap_or_else(|err| panic!("sack '{sack_name}' cannot be sampled: {err}"));

    let mut phases = vec![TimedPhase {
        start: spawn_time,
        state: BallState::InSack {
            component: sack.id().to_string(),
            at: sack.position(),
        },
    }];
    let mut cursor = spawn_time + SACK_DWELL_SECONDS;

    let mut current = sack;
    let mut first_hop = true;
    while let Some(next_id) = current.outputs().first() {
        let next = components
            .iter()
            .find(|c| c.id() == next_id.as_str())
            .unwrap_or_else(|| panic!("component '{}' outputs to unknown '{next_id}'", current.id()));

        let from_port = current.port_position(catalog, catalog.spec(current.kind()).output_port().id.as_str());
        let to_port = next.port_position(catalog, catalog.spec(next.kind()).input_port().id.as_str());
        let trajectory = Trajectory::new(vec![from_port, to_port])
            .expect("two waypoints always form a trajectory");
        let hop_duration = trajectory.duration(BALL_SPEED);
        let easing = if first_hop {
            Easing::EaseInCubic
        } else {
            Easing::EaseInOutCubic
        };
        first_hop = false;

        phases.push(TimedPhase {
            start: cursor,
            state: BallState::InTransit {
                from: current.id().to_string(),
                to: next.id().to_string(),
                trajectory,
                easing,
                duration: hop_duration,
            },
        });
        cursor += hop_duration;

        if catalog.spec(next.kind()).has_state("buffered") {
            phases.push(TimedPhase {
                start: cursor,
                state: BallState::Buffered {
                    component: next.id().to_string(),
                    at: next.position(),
                    duration: BUFFER_SECONDS,
                },
            });
            cursor += BUFFER_SECONDS;
        }

        current = next;
    }

    phases.push(TimedPhase {
        start: cursor,
        state: BallState::Fading {
            component: current.id().to_string(),
            at: current.position(),
            duration: FADE_SECONDS,
        },
    });
    cursor += FADE_SECONDS;
    phases.push(TimedPhase {
        start: cursor,
        state: BallState::Consumed,
    });

    tracing::trace!(
        ball_id,
        sack = sack_name,
        %color,
        spawn_time = f64::from(spawn_time),
        "ball spawned"
    );
    BallTimeline::new(ball_id, color, sack_name, phases)
}

#[cfg(test)]
mod tests {
    use super::Playback;
    use factory_core::model::level::ComponentPlacement;
    use factory_core::script::{ScriptEngine, ScriptOutput};

    const SCRIPT: &str = r#"
let bag = list()
bag.define([{red: 70, blue: 30}, {red: 30, blue: 70}])
bag.permute()
export left = bag.select(0) for betting
export right = bag.select(1)
schedule([(left, 0.5), (right, 1.5), (left, 2.5)])
buckets(4)
"#;

    fn placement(id: &str, kind: &str, x: f32, y: f32, outputs: &[&str]) -> ComponentPlacement {
        ComponentPlacement {
            id: id.to_string(),
            kind: kind.to_string(),
            position: (x, y),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            plex: false,
        }
    }

    fn sample_layout() -> Vec<ComponentPlacement> {
        vec![
            placement("left", "sack", 60.0, 40.0, &["mix"]),
            placement("right", "sack", 180.0, 40.0, &["mix"]),
            placement("mix", "mixer", 120.0, 140.0, &["belt"]),
            placement("belt", "conveyor", 120.0, 220.0, &["out"]),
            placement("out", "bin", 240.0, 220.0, &[]),
        ]
    }

    fn sample_output() -> ScriptOutput {
        let output = ScriptEngine::new(7).execute(SCRIPT);
        assert!(output.is_clean(), "errors: {:?}", output.errors);
        output
    }

    #[test]
    fn intro_covers_every_instruction() {
        let output = sample_output();
        let playback = Playback::build(&output, &sample_layout(), 7);
        assert_eq!(playback.intro().len(), output.instructions.len());
        let last = playback.intro().last().unwrap();
        assert!((last.start + last.duration - playback.intro_duration()).abs() < 1e-4);
    }

    #[test]
    fn one_ball_per_schedule_entry() {
        let output = sample_output();
        let playback = Playback::build(&output, &sample_layout(), 7);
        assert_eq!(playback.balls().len(), 3);
        // Schedule times are offset past the intro.
        assert!(
            playback.balls()[0].spawn_time() >= playback.intro_duration()
        );
    }

    #[test]
    fn balls_pause_in_the_mixer() {
        use crate::ball::BallState;
        let output = sample_output();
        let playback = Playback::build(&output, &sample_layout(), 7);
        let ball = &playback.balls()[0];
        assert!(ball.phases().iter().any(|p| matches!(
            &p.state,
            BallState::Buffered { component, .. } if component == "mix"
        )));
    }

    #[test]
    fn snapshots_are_idempotent_per_tick() {
        let output = sample_output();
        let playback = Playback::build(&output, &sample_layout(), 7);
        let t = playback.intro_duration() + 1.0;
        assert_eq!(playback.snapshot_at(t), playback.snapshot_at(t));
    }

    #[test]
    fn same_seed_builds_identical_timelines() {
        let output = sample_output();
        let a = Playback::build(&output, &sample_layout(), 99);
        let b = Playback::build(&output, &sample_layout(), 99);
        for (x, y) in a.balls().iter().zip(b.balls()) {
            assert_eq!(x.color(), y.color());
            assert_eq!(x.phases(), y.phases());
        }
    }

    #[test]
    fn all_balls_end_consumed_after_duration() {
        let output = sample_output();
        let playback = Playback::build(&output, &sample_layout(), 7);
        let end = playback.duration() + 0.1;
        let snapshot = playback.snapshot_at(end);
        assert!(snapshot.balls.is_empty());
    }

    #[test]
    fn plex_components_hide_ball_colors() {
        let output = sample_output();
        let mut layout = sample_layout();
        layout[2].plex = true; // the mixer
        let playback = Playback::build(&output, &layout, 7);
        let ball = &playback.balls()[0];
        // Find a time the first ball is buffered in the mixer.
        let buffered_start = ball
            .phases()
            .iter()
            .find(|p| matches!(&p.state, crate::ball::BallState::Buffered { .. }))
            .map(|p| p.start)
            .unwrap();
        let snapshot = playback.snapshot_at(buffered_start + 0.1);
        let view = snapshot.balls.iter().find(|b| b.id == ball.id()).unwrap();
        assert!(!view.color_visible);
    }

    #[test]
    fn engaged_components_show_their_active_state() {
        let output = sample_output();
        let playback = Playback::build(&output, &sample_layout(), 7);
        let spawn = playback.balls()[0].spawn_time();
        let snapshot = playback.snapshot_at(spawn + 0.1);
        let sack = snapshot
            .components
            .iter()
            .find(|c| c.id == playback.balls()[0].sack_name())
            .unwrap();
        assert_eq!(sack.state, "dispensing");
    }

    #[test]
    #[should_panic(expected = "no component placed for sack")]
    fn missing_sack_placement_fails_loudly() {
        let output = sample_output();
        let layout = vec![placement("only", "bin", 0.0, 0.0, &[])];
        Playback::build(&output, &layout, 7);
    }
}
