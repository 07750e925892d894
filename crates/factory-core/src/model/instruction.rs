use crate::model::distribution::Distribution;
use crate::model::list::ListId;
use crate::model::template::TemplateId;
use serde::{Deserialize, Serialize};

/// One tagged animation phase recorded while the script runs. Per list the
/// stream obeys `Define` then at most interleaved `Permute`/`Select`s, and
/// the playback layer is driven purely off this stream.
///
/// `Permute` carries the applied swap sequence rather than a final order:
/// replaying the swaps is both the animation and the way playback learns
/// which concrete index a permuted position maps to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum AnimationInstruction {
    Define {
        list_id: ListId,
        distributions: Vec<Distribution>,
    },
    Permute {
        list_id: ListId,
        swaps: Vec<(usize, usize)>,
    },
    Select {
        list_id: ListId,
        index: usize,
        template_id: TemplateId,
    },
}

impl AnimationInstruction {
    pub fn list_id(&self) -> &ListId {
        match self {
            AnimationInstruction::Define { list_id, .. }
            | AnimationInstruction::Permute { list_id, .. }
            | AnimationInstruction::Select { list_id, .. } => list_id,
        }
    }
}

/// Replays a swap sequence over an identity order of `len` slots.
pub fn apply_swaps(len: usize, swaps: &[(usize, usize)]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    for &(a, b) in swaps {
        order.swap(a, b);
    }
    order
}
