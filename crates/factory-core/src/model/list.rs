use crate::model::distribution::Distribution;
use core::fmt;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListId(String);

impl ListId {
    pub fn from_index(index: usize) -> Self {
        Self(format!("list-{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One `select(position)` made against a list, with the concrete source
/// index the permuted position resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub position: usize,
    pub source_index: usize,
}

/// An ordered, permutable sequence of distributions. Created by `define`;
/// `permute` reshuffles the index order, `select` reads through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SackList {
    id: ListId,
    distributions: Vec<Distribution>,
    current_order: Vec<usize>,
    selections: Vec<Selection>,
}

impl SackList {
    pub fn new(id: ListId, distributions: Vec<Distribution>) -> Self {
        let current_order = (0..distributions.len()).collect();
        Self {
            id,
            distributions,
            current_order,
            selections: Vec::new(),
        }
    }

    pub fn id(&self) -> &ListId {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.distributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distributions.is_empty()
    }

    pub fn distributions(&self) -> &[Distribution] {
        &self.distributions
    }

    pub fn current_order(&self) -> &[usize] {
        &self.current_order
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    /// Fisher–Yates over the index order. Returns the swap sequence in the
    /// order it was applied; replaying it over an identity order rebuilds
    /// the resulting permutation.
    pub fn permute<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<(usize, usize)> {
        let mut swaps = Vec::new();
        for i in (1..self.current_order.len()).rev() {
            let j = rng.gen_range(0..=i);
            if i != j {
                self.current_order.swap(i, j);
                swaps.push((i, j));
            }
        }
        swaps
    }

    /// Reads the distribution at permuted position `position` and records
    /// the selection. The returned value is a copy.
    pub fn select(&mut self, position: usize) -> Result<Distribution, ListError> {
        let source_index = self.source_index(position).ok_or(ListError::OutOfBounds {
            index: position,
            len: self.distributions.len(),
        })?;
        self.selections.push(Selection {
            position,
            source_index,
        });
        Ok(self.distributions[source_index].clone())
    }

    pub fn source_index(&self, position: usize) -> Option<usize> {
        self.current_order.get(position).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
    OutOfBounds { index: usize, len: usize },
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListError::OutOfBounds { index, len } => {
                write!(f, "select({index}) is out of bounds for a list of {len}")
            }
        }
    }
}

impl std::error::Error for ListError {}
