use crate::model::template::TemplateId;
use serde::{Deserialize, Serialize};

/// One resolved sampling event: the named sack to draw from and the
/// simulation time the draw fires at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub sack_name: String,
    pub template_id: TemplateId,
    pub time: f64,
}

/// Ordered sampling schedule produced by `schedule()` after name
/// resolution. Entries keep script order, not time order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingSchedule {
    entries: Vec<ScheduleEntry>,
}

impl SamplingSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ScheduleEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScheduleEntry> {
        self.entries.iter()
    }
}
