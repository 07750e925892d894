use crate::model::color::Color;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    counts: BTreeMap<Color, u32>,
}

impl Distribution {
    pub fn new() -> Self {
        Self {
            counts: BTreeMap::new(),
        }
    }

    pub fn from_counts(counts: impl IntoIterator<Item = (Color, u32)>) -> Self {
        Self {
            counts: counts.into_iter().collect(),
        }
    }

    pub fn set_count(&mut self, color: Color, count: u32) {
        self.counts.insert(color, count);
    }

    pub fn count(&self, color: Color) -> u32 {
        self.counts.get(&color).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn proportion(&self, color: Color) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            f64::from(self.count(color)) / f64::from(total)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Color, u32)> + '_ {
        self.counts.iter().map(|(color, count)| (*color, *count))
    }

    /// Parallel color/weight vectors for weighted draws out of this sack.
    pub fn weights(&self) -> (Vec<Color>, Vec<f64>) {
        let colors: Vec<Color> = self.counts.keys().copied().collect();
        let weights: Vec<f64> = self.counts.values().map(|c| f64::from(*c)).collect();
        (colors, weights)
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (color, count)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{color}: {count}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::Distribution;
    use crate::model::color::Color;

    #[test]
    fn counts_and_totals() {
        let dist = Distribution::from_counts([(Color::Red, 70), (Color::Blue, 30)]);
        assert_eq!(dist.count(Color::Red), 70);
        assert_eq!(dist.count(Color::Green), 0);
        assert_eq!(dist.total(), 100);
    }

    #[test]
    fn proportions_are_normalized() {
        let dist = Distribution::from_counts([(Color::Red, 30), (Color::Blue, 70)]);
        assert!((dist.proportion(Color::Blue) - 0.7).abs() < 1e-12);
        assert_eq!(dist.proportion(Color::Purple), 0.0);
    }

    #[test]
    fn empty_distribution_has_zero_proportions() {
        let dist = Distribution::new();
        assert!(dist.is_empty());
        assert_eq!(dist.proportion(Color::Red), 0.0);
    }

    #[test]
    fn display_is_deterministic() {
        let dist = Distribution::from_counts([(Color::Blue, 30), (Color::Red, 70)]);
        assert_eq!(dist.to_string(), "{red: 70, blue: 30}");
    }
}
