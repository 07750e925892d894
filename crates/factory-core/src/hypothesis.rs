//! Combinatorial hypothesis-space generation.
//!
//! A hypothesis is one fully-resolved assignment of source distributions
//! to the named sacks a script exported. For a list of `n` distributions
//! with `k` selections the space holds every ordered injection of source
//! indices into the selected positions (`n!/(n-k)!` of them), and the
//! full space is the Cartesian product across independent lists. This is
//! exact enumeration, never sampling: the scoring subsystem judges a
//! learner's belief against the whole space of what could have been true.

use crate::model::distribution::Distribution;
use crate::model::list::ListId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-list input to generation, extracted by the script engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HypothesisData {
    pub lists: Vec<ListHypothesisData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListHypothesisData {
    pub list_id: ListId,
    pub size: usize,
    pub distributions: Vec<Distribution>,
    pub slots: Vec<SackSlot>,
}

/// One selected position of a list: the exported sack occupying it and
/// the source index the selection actually resolved to (the ground
/// truth).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SackSlot {
    pub template_name: String,
    pub source_index: usize,
    pub for_betting: bool,
}

/// One candidate assignment of distributions to all named sacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    assignment: BTreeMap<String, Distribution>,
    sources: BTreeMap<String, usize>,
    prior: f64,
}

impl Hypothesis {
    pub fn distribution_for(&self, sack: &str) -> Option<&Distribution> {
        self.assignment.get(sack)
    }

    pub fn source_for(&self, sack: &str) -> Option<usize> {
        self.sources.get(sack).copied()
    }

    pub fn prior(&self) -> f64 {
        self.prior
    }

    pub fn sacks(&self) -> impl Iterator<Item = &str> {
        self.assignment.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HypothesisSpace {
    hypotheses: Vec<Hypothesis>,
}

impl HypothesisSpace {
    /// Enumerates the full space with uniform priors.
    pub fn generate(data: &HypothesisData) -> Self {
        let per_list: Vec<Vec<Vec<usize>>> = data
            .lists
            .iter()
            .map(|list| injections(list.size, list.slots.len()))
            .collect();

        let total: usize = per_list.iter().map(Vec::len).product();
        let prior = 1.0 / total as f64;

        let mut hypotheses = Vec::with_capacity(total);
        let mut cursor = vec![0usize; per_list.len()];
        for _ in 0..total {
            let mut assignment = BTreeMap::new();
            let mut sources = BTreeMap::new();
            for (list_index, list) in data.lists.iter().enumerate() {
                let injection = &per_list[list_index][cursor[list_index]];
                for (slot, &source) in list.slots.iter().zip(injection) {
                    assignment.insert(
                        slot.template_name.clone(),
                        list.distributions[source].clone(),
                    );
                    sources.insert(slot.template_name.clone(), source);
                }
            }
            hypotheses.push(Hypothesis {
                assignment,
                sources,
                prior,
            });

            // Odometer step across the per-list injection tables.
            for (digit, table) in cursor.iter_mut().zip(&per_list) {
                *digit += 1;
                if *digit < table.len() {
                    break;
                }
                *digit = 0;
            }
        }

        Self { hypotheses }
    }

    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    pub fn hypotheses(&self) -> &[Hypothesis] {
        &self.hypotheses
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hypothesis> {
        self.hypotheses.iter()
    }

    /// Index of the hypothesis matching the realized selections.
    pub fn ground_truth_index(&self, data: &HypothesisData) -> Option<usize> {
        self.hypotheses.iter().position(|h| {
            data.lists.iter().all(|list| {
                list.slots
                    .iter()
                    .all(|slot| h.source_for(&slot.template_name) == Some(slot.source_index))
            })
        })
    }

    /// Ground-truth probability vector: 1 at `index`, 0 elsewhere.
    pub fn truth_distribution(&self, index: usize) -> Vec<f64> {
        let mut truth = vec![0.0; self.hypotheses.len()];
        if let Some(entry) = truth.get_mut(index) {
            *entry = 1.0;
        }
        truth
    }
}

/// All ordered injections of `k` slots into `n` sources.
fn injections(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut results = Vec::new();
    let mut current = Vec::with_capacity(k);
    let mut used = vec![false; n];
    extend(n, k, &mut current, &mut used, &mut results);
    results
}

fn extend(
    n: usize,
    k: usize,
    current: &mut Vec<usize>,
    used: &mut Vec<bool>,
    results: &mut Vec<Vec<usize>>,
) {
    if current.len() == k {
        results.push(current.clone());
        return;
    }
    for source in 0..n {
        if used[source] {
            continue;
        }
        used[source] = true;
        current.push(source);
        extend(n, k, current, used, results);
        current.pop();
        used[source] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::{HypothesisData, HypothesisSpace, ListHypothesisData, SackSlot, injections};
    use crate::model::color::Color;
    use crate::model::distribution::Distribution;
    use crate::model::list::ListId;

    fn list_data(list_index: usize, n: usize, truth: &[usize]) -> ListHypothesisData {
        ListHypothesisData {
            list_id: ListId::from_index(list_index),
            size: n,
            distributions: (0..n)
                .map(|i| Distribution::from_counts([(Color::Red, i as u32 + 1)]))
                .collect(),
            slots: truth
                .iter()
                .enumerate()
                .map(|(slot, &source_index)| SackSlot {
                    template_name: format!("sack-{list_index}-{slot}"),
                    source_index,
                    for_betting: true,
                })
                .collect(),
        }
    }

    #[test]
    fn injection_count_is_falling_factorial() {
        assert_eq!(injections(4, 2).len(), 12); // 4!/2!
        assert_eq!(injections(3, 3).len(), 6); // 3!
        assert_eq!(injections(5, 1).len(), 5);
        assert_eq!(injections(3, 0).len(), 1); // the empty injection
    }

    #[test]
    fn injections_never_repeat_a_source() {
        for injection in injections(4, 3) {
            let mut sorted = injection.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), injection.len());
        }
    }

    #[test]
    fn space_size_multiplies_across_lists() {
        let data = HypothesisData {
            lists: vec![list_data(1, 3, &[0, 1]), list_data(2, 2, &[0])],
        };
        let space = HypothesisSpace::generate(&data);
        assert_eq!(space.len(), 6 * 2);
    }

    #[test]
    fn priors_are_uniform_and_sum_to_one() {
        let data = HypothesisData {
            lists: vec![list_data(1, 4, &[2, 0])],
        };
        let space = HypothesisSpace::generate(&data);
        assert_eq!(space.len(), 12);
        let sum: f64 = space.iter().map(|h| h.prior()).sum();
        assert!((sum - 1.0).abs() < 1e-9);
        for h in space.iter() {
            assert!((h.prior() - 1.0 / 12.0).abs() < 1e-12);
        }
    }

    #[test]
    fn ground_truth_is_found_and_unique() {
        let data = HypothesisData {
            lists: vec![list_data(1, 3, &[1, 2])],
        };
        let space = HypothesisSpace::generate(&data);
        let index = space.ground_truth_index(&data).unwrap();
        let truth = &space.hypotheses()[index];
        assert_eq!(truth.source_for("sack-1-0"), Some(1));
        assert_eq!(truth.source_for("sack-1-1"), Some(2));

        let matches = space
            .iter()
            .filter(|h| {
                h.source_for("sack-1-0") == Some(1) && h.source_for("sack-1-1") == Some(2)
            })
            .count();
        assert_eq!(matches, 1);
    }

    #[test]
    fn truth_distribution_is_one_hot() {
        let data = HypothesisData {
            lists: vec![list_data(1, 2, &[0])],
        };
        let space = HypothesisSpace::generate(&data);
        let truth = space.truth_distribution(1);
        assert_eq!(truth, vec![0.0, 1.0]);
    }

    #[test]
    fn empty_data_yields_the_single_empty_hypothesis() {
        let space = HypothesisSpace::generate(&HypothesisData::default());
        assert_eq!(space.len(), 1);
        assert_eq!(space.hypotheses()[0].prior(), 1.0);
    }
}
