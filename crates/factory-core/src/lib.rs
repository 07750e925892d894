#![deny(warnings)]
pub mod betting;
pub mod hypothesis;
pub mod model;
pub mod rng;
pub mod script;
pub mod trajectory;

pub struct EngineInfo;

impl EngineInfo {
    pub const fn name() -> &'static str {
        "bayes-factory"
    }

    pub const fn codename() -> &'static str {
        "Factory Floor"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
