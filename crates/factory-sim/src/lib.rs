#![deny(warnings)]
pub mod ball;
pub mod component;
pub mod playback;
pub mod snapshot;

pub use ball::{BallSample, BallState, BallTimeline, TimedPhase};
pub use component::{
    Component, ComponentCatalog, ComponentSpec, Direction, Motion, PortDirection, PortSpec,
    StateSpec, TransitionSpec, VisualSpec, resolve_asset,
};
pub use playback::{IntroPhase, Playback};
pub use snapshot::{BallView, ComponentView, RenderSnapshot};
