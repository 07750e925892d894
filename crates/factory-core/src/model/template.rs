use crate::model::distribution::Distribution;
use crate::model::list::ListId;
use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn from_index(index: usize) -> Self {
        Self(format!("template-{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, exported sack: one selected distribution bound to a
/// story-facing identifier, later referenced by the sampling schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    id: TemplateId,
    name: String,
    distribution: Distribution,
    list_id: ListId,
    index: usize,
    for_betting: bool,
}

impl Template {
    pub fn new(
        id: TemplateId,
        name: impl Into<String>,
        distribution: Distribution,
        list_id: ListId,
        index: usize,
        for_betting: bool,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            distribution,
            list_id,
            index,
            for_betting,
        }
    }

    pub fn id(&self) -> &TemplateId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    pub fn list_id(&self) -> &ListId {
        &self.list_id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn for_betting(&self) -> bool {
        self.for_betting
    }
}

#[cfg(test)]
mod tests {
    use super::{Template, TemplateId};
    use crate::model::color::Color;
    use crate::model::distribution::Distribution;
    use crate::model::list::ListId;

    #[test]
    fn template_copies_its_distribution() {
        let mut dist = Distribution::from_counts([(Color::Red, 70)]);
        let template = Template::new(
            TemplateId::from_index(1),
            "left",
            dist.clone(),
            ListId::from_index(1),
            0,
            true,
        );
        dist.set_count(Color::Red, 1);
        assert_eq!(template.distribution().count(Color::Red), 70);
        assert!(template.for_betting());
        assert_eq!(template.name(), "left");
    }
}
