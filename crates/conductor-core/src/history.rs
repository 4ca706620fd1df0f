//! Bounded record of classifier predictions.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default number of predictions kept before a purge.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;
/// Default number of most recent predictions kept by a purge.
pub const DEFAULT_HISTORY_KEEP: usize = 100;

/// Truncation policy: once the history grows past `capacity`, only the most
/// recent `keep` entries survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryBounds {
    pub capacity: usize,
    pub keep: usize,
}

impl HistoryBounds {
    pub fn new(capacity: usize, keep: usize) -> Result<Self> {
        let bounds = Self { capacity, keep };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidConfig(
                "history capacity must be at least 1".to_string(),
            ));
        }
        if self.keep > self.capacity {
            return Err(Error::InvalidConfig(format!(
                "history keep ({}) exceeds capacity ({})",
                self.keep, self.capacity
            )));
        }
        Ok(())
    }
}

impl Default for HistoryBounds {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
            keep: DEFAULT_HISTORY_KEEP,
        }
    }
}

/// Append-only, bounded sequence of gesture labels.
#[derive(Debug, Clone, Default)]
pub struct PredictionHistory {
    labels: Vec<i32>,
    bounds: HistoryBounds,
    total: u64,
}

impl PredictionHistory {
    pub fn new(bounds: HistoryBounds) -> Result<Self> {
        bounds.validate()?;
        Ok(Self {
            labels: Vec::new(),
            bounds,
            total: 0,
        })
    }

    /// Append one prediction, purging down to the tail when over capacity.
    ///
    /// Returns `true` when a purge happened.
    pub fn push(&mut self, label: i32) -> bool {
        self.labels.push(label);
        self.total += 1;

        if self.labels.len() > self.bounds.capacity {
            let cut = self.labels.len() - self.bounds.keep;
            self.labels.drain(..cut);
            tracing::debug!(
                "Prediction history purged to {} entries",
                self.labels.len()
            );
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[i32] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn last(&self) -> Option<i32> {
        self.labels.last().copied()
    }

    /// Predictions ingested since creation, including purged ones.
    pub fn total_ingested(&self) -> u64 {
        self.total
    }

    pub fn bounds(&self) -> HistoryBounds {
        self.bounds
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }
}
