//! Causal inference over operation failures.
//!
//! Tracks per-`agent:operation` outcome frequencies and links failures that
//! occur close together in time, yielding failure-probability and
//! cascade-risk estimates. The node table is bounded; the least recently
//! updated node is evicted when the cap is reached.

#![warn(missing_docs, clippy::pedantic)]

mod graph;

pub use graph::{CausalGraph, CausalNodeSnapshot, OpKey};

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias for causal-graph operations.
pub type CausalResult<T> = Result<T, CausalError>;

/// Errors surfaced by the causal graph.
#[derive(Debug, Error)]
pub enum CausalError {
    /// Configuration failed validation.
    #[error("invalid causal configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Configuration for [`CausalGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalConfig {
    /// Maximum nodes retained before least-recently-updated eviction.
    pub max_nodes: NonZeroUsize,
    /// Two failures within this window are considered linked.
    pub linkage_window: Duration,
}

impl Default for CausalConfig {
    fn default() -> Self {
        Self {
            max_nodes: NonZeroUsize::new(1024).expect("non-zero"),
            linkage_window: Duration::from_secs(60),
        }
    }
}

impl CausalConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CausalError::InvalidConfig`] when the linkage window is
    /// zero.
    pub fn validate(&self) -> CausalResult<()> {
        if self.linkage_window.is_zero() {
            return Err(CausalError::InvalidConfig(
                "linkage window must be greater than zero",
            ));
        }
        Ok(())
    }
}
