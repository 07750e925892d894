//! Component catalog: the typed nodes a level's network is built from.
//!
//! Each component type is declared once as a descriptor (states,
//! transitions, ports, visuals) and instantiated per placement. Unknown
//! type tags and port ids are level-authoring bugs, not user input, and
//! fail loudly.

use factory_core::model::level::ComponentPlacement;
use factory_core::trajectory::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

/// Coarse direction of a connected neighbor, used to pick directional
/// art frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Dominant axis of the offset toward a neighbor.
    pub fn from_offset(dx: f32, dy: f32) -> Self {
        if dx.abs() >= dy.abs() {
            if dx >= 0.0 { Direction::Right } else { Direction::Left }
        } else if dy >= 0.0 {
            Direction::Down
        } else {
            Direction::Up
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
    pub id: String,
    pub direction: PortDirection,
    pub offset: Point,
}

/// Position offset of a transient state as a function of elapsed time
/// since state entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Motion {
    Hold,
    Bob { amplitude: f32, period: f32 },
    Slide { from: Point, duration: f32 },
}

impl Motion {
    pub fn offset_at(&self, elapsed: f32) -> Point {
        match self {
            Motion::Hold => Point::new(0.0, 0.0),
            Motion::Bob { amplitude, period } => {
                let phase = elapsed / period * std::f32::consts::TAU;
                Point::new(0.0, amplitude * phase.sin())
            }
            Motion::Slide { from, duration } => {
                let t = (elapsed / duration).clamp(0.0, 1.0);
                Point::new(from.x * (1.0 - t), from.y * (1.0 - t))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualSpec {
    pub frame: String,
    pub opacity: f32,
    pub scale: f32,
}

impl VisualSpec {
    fn plain(frame: &str) -> Self {
        Self {
            frame: frame.to_string(),
            opacity: 1.0,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSpec {
    pub name: String,
    pub visual: VisualSpec,
    pub motion: Motion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub from: String,
    pub to: String,
}

/// Declared-once description of a component type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub kind: String,
    pub states: Vec<StateSpec>,
    pub transitions: Vec<TransitionSpec>,
    pub ports: Vec<PortSpec>,
    /// Asset path template with `{kind}`, `{state}` and `{dir}` tokens.
    pub asset_template: String,
}

impl ComponentSpec {
    pub fn state(&self, name: &str) -> &StateSpec {
        self.states
            .iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("unknown state '{name}' on component '{}'", self.kind))
    }

    pub fn port(&self, id: &str) -> &PortSpec {
        self.ports
            .iter()
            .find(|p| p.id == id)
            .unwrap_or_else(|| panic!("unknown port '{id}' on component '{}'", self.kind))
    }

    pub fn input_port(&self) -> &PortSpec {
        self.ports
            .iter()
            .find(|p| p.direction == PortDirection::Input)
            .unwrap_or_else(|| panic!("component '{}' has no input port", self.kind))
    }

    pub fn output_port(&self) -> &PortSpec {
        self.ports
            .iter()
            .find(|p| p.direction == PortDirection::Output)
            .unwrap_or_else(|| panic!("component '{}' has no output port", self.kind))
    }

    /// Resting state: the first declared state.
    pub fn idle_state(&self) -> &StateSpec {
        &self.states[0]
    }

    /// State shown while a ball is engaged with the component; falls
    /// back to the resting state for single-state components.
    pub fn active_state(&self) -> &StateSpec {
        self.states.get(1).unwrap_or(&self.states[0])
    }

    pub fn can_transition(&self, from: &str, to: &str) -> bool {
        from == to
            || self
                .transitions
                .iter()
                .any(|t| t.from == from && t.to == to)
    }

    pub fn asset_for(&self, state: &str, direction: Direction) -> String {
        resolve_asset(
            &self.asset_template,
            &[
                ("kind", self.kind.as_str()),
                ("state", state),
                ("dir", direction.as_str()),
            ],
        )
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.states.iter().any(|s| s.name == name)
    }
}

/// Substitutes `{token}` placeholders in an asset path template. The
/// final string is all the core produces; loading is external.
pub fn resolve_asset(template: &str, vars: &[(&str, &str)]) -> String {
    let mut resolved = template.to_string();
    for (key, value) in vars {
        resolved = resolved.replace(&format!("{{{key}}}"), value);
    }
    resolved
}

/// Registry of component descriptors keyed by type tag.
#[derive(Debug, Clone, Default)]
pub struct ComponentCatalog {
    specs: HashMap<String, ComponentSpec>,
}

impl ComponentCatalog {
    /// The fixed set the shipped levels use. Levels may register more.
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        catalog.register(sack_spec());
        catalog.register(conveyor_spec());
        catalog.register(mixer_spec());
        catalog.register(bin_spec());
        catalog
    }

    pub fn register(&mut self, spec: ComponentSpec) {
        self.specs.insert(spec.kind.clone(), spec);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.specs.contains_key(kind)
    }

    pub fn spec(&self, kind: &str) -> &ComponentSpec {
        self.specs
            .get(kind)
            .unwrap_or_else(|| panic!("unknown component type '{kind}'"))
    }
}

fn sack_spec() -> ComponentSpec {
    ComponentSpec {
        kind: "sack".to_string(),
        states: vec![
            StateSpec {
                name: "idle".to_string(),
                visual: VisualSpec::plain("idle"),
                motion: Motion::Hold,
            },
            StateSpec {
                name: "dispensing".to_string(),
                visual: VisualSpec::plain("dispensing"),
                motion: Motion::Bob {
                    amplitude: 2.0,
                    period: 0.4,
                },
            },
        ],
        transitions: vec![
            TransitionSpec {
                from: "idle".to_string(),
                to: "dispensing".to_string(),
            },
            TransitionSpec {
                from: "dispensing".to_string(),
                to: "idle".to_string(),
            },
        ],
        ports: vec![PortSpec {
            id: "out".to_string(),
            direction: PortDirection::Output,
            offset: Point::new(0.0, 24.0),
        }],
        asset_template: "assets/{kind}/{state}.png".to_string(),
    }
}

fn conveyor_spec() -> ComponentSpec {
    ComponentSpec {
        kind: "conveyor".to_string(),
        states: vec![StateSpec {
            name: "running".to_string(),
            visual: VisualSpec::plain("running"),
            motion: Motion::Hold,
        }],
        transitions: Vec::new(),
        ports: vec![
            PortSpec {
                id: "in".to_string(),
                direction: PortDirection::Input,
                offset: Point::new(-40.0, 0.0),
            },
            PortSpec {
                id: "out".to_string(),
                direction: PortDirection::Output,
                offset: Point::new(40.0, 0.0),
            },
        ],
        asset_template: "assets/{kind}/{state}_{dir}.png".to_string(),
    }
}

fn mixer_spec() -> ComponentSpec {
    ComponentSpec {
        kind: "mixer".to_string(),
        states: vec![
            StateSpec {
                name: "idle".to_string(),
                visual: VisualSpec::plain("idle"),
                motion: Motion::Hold,
            },
            StateSpec {
                name: "buffered".to_string(),
                visual: VisualSpec::plain("mixing"),
                motion: Motion::Bob {
                    amplitude: 3.0,
                    period: 0.6,
                },
            },
            StateSpec {
                name: "releasing".to_string(),
                visual: VisualSpec::plain("releasing"),
                motion: Motion::Slide {
                    from: Point::new(0.0, -6.0),
                    duration: 0.3,
                },
            },
        ],
        transitions: vec![
            TransitionSpec {
                from: "idle".to_string(),
                to: "buffered".to_string(),
            },
            TransitionSpec {
                from: "buffered".to_string(),
                to: "releasing".to_string(),
            },
            TransitionSpec {
                from: "releasing".to_string(),
                to: "idle".to_string(),
            },
        ],
        ports: vec![
            PortSpec {
                id: "in".to_string(),
                direction: PortDirection::Input,
                offset: Point::new(0.0, -28.0),
            },
            PortSpec {
                id: "out".to_string(),
                direction: PortDirection::Output,
                offset: Point::new(0.0, 28.0),
            },
        ],
        asset_template: "assets/{kind}/{state}.png".to_string(),
    }
}

fn bin_spec() -> ComponentSpec {
    ComponentSpec {
        kind: "bin".to_string(),
        states: vec![StateSpec {
            name: "open".to_string(),
            visual: VisualSpec::plain("open"),
            motion: Motion::Hold,
        }],
        transitions: Vec::new(),
        ports: vec![PortSpec {
            id: "in".to_string(),
            direction: PortDirection::Input,
            offset: Point::new(0.0, -20.0),
        }],
        asset_template: "assets/{kind}/{state}.png".to_string(),
    }
}

/// One placed component instance in a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    id: String,
    kind: String,
    position: Point,
    plex: bool,
    outputs: Vec<String>,
}

impl Component {
    /// Builds an instance from a placement, failing loudly when the
    /// placement names a type the catalog does not carry.
    pub fn from_placement(placement: &ComponentPlacement, catalog: &ComponentCatalog) -> Self {
        let spec = catalog.spec(&placement.kind);
        Self {
            id: placement.id.clone(),
            kind: spec.kind.clone(),
            position: Point::new(placement.position.0, placement.position.1),
            plex: placement.plex,
            outputs: placement.outputs.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn position(&self) -> Point {
        self.position
    }

    /// Whether this component masks ball colors (the "plex" overlay).
    pub fn plex(&self) -> bool {
        self.plex
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn port_position(&self, catalog: &ComponentCatalog, port_id: &str) -> Point {
        let offset = catalog.spec(&self.kind).port(port_id).offset;
        Point::new(self.position.x + offset.x, self.position.y + offset.y)
    }
}
